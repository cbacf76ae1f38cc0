//! Property tests for folder scopes and no-go zones.

use notegate_config::{AccessConfig, AgentConfig, ScopeEntry};
use notegate_core::{AccessScopeGuard, ScopePattern};
use notegate_protocol::AccessLevel;
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 _-]{0,8}"
}

proptest! {
    #[test]
    fn folder_pattern_matches_exactly_its_subtree(
        folder in segment(),
        child in "[A-Za-z0-9_./-]{1,20}",
        other in "[A-Za-z0-9_/-]{1,20}",
    ) {
        let pattern = ScopePattern::compile(&folder).expect("pattern");
        let inside = format!("{folder}/{child}");
        prop_assert!(pattern.matches(&folder));
        prop_assert!(pattern.matches(&inside));

        if other != folder && !other.starts_with(&format!("{folder}/")) {
            prop_assert!(!pattern.matches(&other));
        }
    }

    #[test]
    fn unrestricted_agents_see_everything_but_no_go(
        zone in segment(),
        path in "[A-Za-z0-9_-]{1,10}(/[A-Za-z0-9_-]{1,10}){0,3}",
        write in any::<bool>(),
    ) {
        let guard = AccessScopeGuard::new(&AccessConfig {
            no_go_zones: vec![zone.clone()],
            ..AccessConfig::default()
        });
        let agent = AgentConfig::new("free");
        let level = if write { AccessLevel::ReadWrite } else { AccessLevel::Read };

        let decision = guard.check_access(&agent, Some(&path), level);
        let under_zone = path == zone || path.starts_with(&format!("{zone}/"));
        let in_namespace = path == ".notegate" || path.starts_with(".notegate/");
        if under_zone {
            prop_assert!(!decision.allowed);
        } else if !in_namespace {
            prop_assert!(decision.allowed);
        }

        let nested = format!("{zone}/{path}");
        prop_assert!(!guard.check_access(&agent, Some(&nested), level).allowed);
    }

    #[test]
    fn read_entries_never_grant_write(folder in segment(), leaf in "[a-z]{1,8}\\.md") {
        let guard = AccessScopeGuard::new(&AccessConfig::default());
        let agent = AgentConfig::new("reader").with_scope(vec![ScopeEntry::read(folder.clone())]);
        let path = format!("{folder}/{leaf}");

        prop_assert!(guard.check_access(&agent, Some(&path), AccessLevel::Read).allowed);
        prop_assert!(!guard.check_access(&agent, Some(&path), AccessLevel::ReadWrite).allowed);
    }
}

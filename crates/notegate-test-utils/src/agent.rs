use notegate_config::{AgentConfig, Capabilities, Capability, ScopeEntry};

/// Unrestricted agent holding exactly `capabilities`.
pub fn agent(name: &str, capabilities: &[Capability]) -> AgentConfig {
    let capabilities = capabilities
        .iter()
        .fold(Capabilities::default(), |acc, capability| acc.with(*capability));
    AgentConfig::new(name).with_capabilities(capabilities)
}

/// Agent with every ordinary capability and the given scope.
pub fn scoped_agent(name: &str, scope: Vec<ScopeEntry>) -> AgentConfig {
    AgentConfig::new(name)
        .with_capabilities(Capabilities::standard())
        .with_scope(scope)
}

/// Route `log` output through env_logger for the current test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

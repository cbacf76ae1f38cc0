//! Test helpers shared across notegate crates.

pub mod agent;
pub mod approvals;
pub mod tools;

pub use agent::{agent, init_logging, scoped_agent};
pub use approvals::ScriptedApprovalSurface;
pub use tools::{DummyTool, FailingTool, ListingTool, PanickingTool};

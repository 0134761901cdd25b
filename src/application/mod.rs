//! Application layer: wires the services together and runs the agent.

pub mod agent;

pub use agent::ModerationAgent;

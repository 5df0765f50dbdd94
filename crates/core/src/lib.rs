//! # Tether Core
//!
//! Domain types, traits, and error definitions for the Tether agent harness.
//! Every other crate depends inward on this one.
//!
//! ## Design Philosophy
//!
//! Subsystems are defined as traits here and implemented elsewhere:
//! - [`Provider`] is the model client the agent loop talks to
//! - [`Tool`] is a capability the model can invoke by name
//!
//! Tests swap both for scripted stand-ins.

pub mod context;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use context::ExecutionContext;
pub use error::{AgentError, ProviderError, ToolError};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{Tool, ToolDescriptor, ToolRegistry};

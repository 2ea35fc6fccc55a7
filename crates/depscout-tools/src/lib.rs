// ABOUTME: Sandboxed file tools and the tool-call dispatcher
// ABOUTME: Provides ToolDispatcher, the FileTool registry and the Workspace-backed providers

pub mod dispatcher;
pub mod error;
pub mod providers;
pub mod registry;
pub mod sandbox;
pub mod workspace;

pub use dispatcher::*;
pub use error::{Result, ToolError};
pub use providers::*;
pub use registry::*;
pub use workspace::*;

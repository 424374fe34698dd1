#![deny(missing_docs)]
//! Tool interface, registry, and remote-tool manager contract for the
//! wick agent core.
//!
//! Defines [`ToolDyn`] for object-safe tool abstraction and
//! [`ToolRegistry`] for managing local tool collections. A tool not
//! owned by the local registry may still be claimed by a
//! [`RemoteToolManager`] — concrete remote-tool transport is an
//! external collaborator; only the contract lives here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Errors from tool operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found in any registry or manager.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The input provided to the tool was invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The permission class a tool requires. The autonomy controller gates
/// tool execution on this, not on the tool's name.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionClass {
    /// Purely internal bookkeeping; never denied.
    Internal,
    /// Reads host state without side effects.
    Read,
    /// Mutates host state.
    Write,
    /// Requires explicit human approval before execution.
    Approve,
    /// Performs network I/O.
    Network,
    /// Touches the browser surface (DOM, extension RPC, peripherals).
    Browser,
}

/// A tool's static description, as surfaced to the provider and to
/// `allSpecs()`/`allToolSpecs()` callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// The tool's unique name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON-Schema-shaped parameter schema.
    pub parameters: serde_json::Value,
    /// The permission class required to execute this tool.
    pub permission_class: PermissionClass,
}

/// Object-safe trait for tool implementations.
///
/// Any tool source (browser capability, local function, remote
/// endpoint) implements this trait. Tools are stored as
/// `Arc<dyn ToolDyn>` in [`ToolRegistry`].
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// The permission class required to execute this tool.
    fn permission_class(&self) -> PermissionClass;

    /// Execute the tool with the given input.
    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>>;

    /// This tool's static spec, as surfaced to the provider.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema(),
            permission_class: self.permission_class(),
        }
    }
}

/// Registry of locally-owned tools available to a turn.
///
/// Holds tools as `Arc<dyn ToolDyn>` keyed by name. Registering a tool
/// under a name already present overwrites the earlier registration.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Whether a tool with this name is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(name)
    }

    /// All registered tool names.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Specs for every registered tool.
    pub fn all_specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, params: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.call(params).await
    }

    /// Iterate over all registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolDyn>> {
        self.tools.values()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Contract for a manager that owns tools not registered locally
/// (MCP servers, HTTP endpoints, extension-hosted capabilities).
/// Concrete transport is an external collaborator; the agent core only
/// needs to know whether a name is claimed and how to invoke it.
#[async_trait]
pub trait RemoteToolManager: Send + Sync {
    /// Returns true if some remote client claims this tool name.
    fn find_client(&self, name: &str) -> bool;

    /// Execute a tool claimed by a remote client.
    async fn execute_tool(&self, name: &str, params: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// Specs for every tool any remote client claims.
    async fn all_tool_specs(&self) -> Vec<ToolSpec>;
}

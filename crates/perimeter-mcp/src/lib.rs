//! Perimeter MCP Server
//!
//! An MCP server that exposes the boundary gate as tools. An assistant host
//! asks `check_command` for a verdict before it runs a shell command, and can
//! ask `reload_policy` to pick up an edited policy file without restarting.

use std::path::PathBuf;
use std::sync::Arc;

use perimeter::config::{ConfigError, home_dir, load_policy};
use perimeter::{BoundaryPolicy, CommandGate, InvocationRequest, PolicyHandle, Verdict};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::*,
    schemars::{self, JsonSchema},
    service::{RequestContext, RoleServer},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters for the `check_command` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckParams {
    /// The shell command the assistant intends to run.
    pub command: String,

    /// Absolute working directory the command would run in.
    pub cwd: String,
}

/// Parameters for the `reload_policy` tool (none).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReloadParams {}

/// Errors reloading the policy.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The server was started without a policy file.
    #[error("no policy file configured")]
    NoSource,
    /// The policy file couldn't be loaded; the active policy is unchanged.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// MCP Server that rules on shell commands via a boundary policy
#[derive(Clone, Debug)]
pub struct PerimeterServer {
    policy: PolicyHandle,
    source: Option<PathBuf>,
}

impl PerimeterServer {
    /// Create a server around an already-built policy.
    ///
    /// # Arguments
    /// * `policy` - The policy to enforce
    /// * `source` - Policy file to re-read on `reload_policy`, if any
    pub fn new(policy: BoundaryPolicy, source: Option<PathBuf>) -> Self {
        Self {
            policy: PolicyHandle::new(policy),
            source,
        }
    }

    /// Create a server from a policy file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let home = home_dir();
        let policy = load_policy(&path, home.as_deref())?;
        Ok(Self::new(policy, Some(path)))
    }

    /// The shared policy handle.
    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    /// Evaluate a `check_command` request.
    pub fn check(&self, params: &CheckParams) -> Verdict {
        let request = InvocationRequest::shell(params.command.as_str(), params.cwd.as_str());
        self.policy.evaluate(&request)
    }

    /// Re-read the policy file and swap it in.
    pub fn reload(&self) -> Result<Arc<BoundaryPolicy>, ReloadError> {
        let path = self.source.as_deref().ok_or(ReloadError::NoSource)?;
        let home = home_dir();
        let policy = load_policy(path, home.as_deref())?;
        self.policy.replace(policy);
        Ok(self.policy.snapshot())
    }

    fn check_command_tool(&self) -> Tool {
        Self::tool(
            "check_command",
            "Check Shell Command",
            "Ask whether a shell command may run in a working directory. Returns a JSON \
            verdict with `kind` (allow, warn or deny) and, unless allowed silently, a \
            `reason`. Never run a command whose verdict is deny; show the reason of a \
            warn verdict to the user.",
            serde_json::to_value(schemars::schema_for!(CheckParams)).unwrap_or_default(),
        )
    }

    fn reload_policy_tool(&self) -> Tool {
        Self::tool(
            "reload_policy",
            "Reload Boundary Policy",
            "Re-read the boundary policy file. If the file is invalid the current policy \
            stays in force.",
            serde_json::to_value(schemars::schema_for!(ReloadParams)).unwrap_or_default(),
        )
    }

    fn tool(
        name: &'static str,
        title: &'static str,
        description: &'static str,
        schema_json: serde_json::Value,
    ) -> Tool {
        let input_schema = match schema_json {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: name.into(),
            title: Some(title.into()),
            description: Some(description.into()),
            input_schema,
            output_schema: None,
            annotations: None,
            icons: None,
            meta: None,
        }
    }

    fn call_check(&self, arguments: Option<&JsonObject>) -> Result<CallToolResult, McpError> {
        let params: CheckParams = match arguments {
            Some(args) => serde_json::from_value(serde_json::Value::Object(args.clone()))
                .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))?,
            None => {
                return Err(McpError::invalid_params(
                    "Missing 'command' and 'cwd' parameters",
                    None,
                ));
            }
        };

        let verdict = self.check(&params);
        let body = serde_json::to_string(&verdict)
            .map_err(|e| McpError::internal_error(format!("Encoding error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(body)]))
    }

    fn call_reload(&self) -> CallToolResult {
        match self.reload() {
            Ok(policy) => CallToolResult::success(vec![Content::text(format!(
                "policy reloaded: mode {}, {} root(s), {} pattern(s)",
                policy.mode(),
                policy.roots().len(),
                policy.patterns().len()
            ))]),
            Err(e) => {
                tracing::warn!(error = %e, "policy reload failed");
                CallToolResult::error(vec![Content::text(format!("reload failed: {}", e))])
            }
        }
    }
}

impl ServerHandler for PerimeterServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Perimeter rules on shell commands before they run. Call 'check_command' with \
                the command and its absolute working directory; do not run commands that get a \
                'deny' verdict."
                    .into(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: vec![self.check_command_tool(), self.reload_policy_tool()],
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        match request.name.as_ref() {
            "check_command" => self.call_check(request.arguments.as_ref()),
            "reload_policy" => Ok(self.call_reload()),
            _ => Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            )),
        }
    }
}

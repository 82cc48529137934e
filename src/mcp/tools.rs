//! MCP Tools Implementation
//!
//! Bridges the open-data API tool groups into the MCP tool registry.

use crate::apis::{ApiContext, ToolError, ToolGroup, ToolOutput};
use crate::mcp::errors::{McpError, McpResult};
use crate::mcp::protocol::{CallToolParams, CallToolResult};
use crate::mcp::server::{McpServer, ToolHandler};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Executes every tool of one API group against a shared context
pub struct ApiToolHandler {
    context: Arc<ApiContext>,
    group: ToolGroup,
}

impl ApiToolHandler {
    #[inline]
    pub fn new(context: Arc<ApiContext>, group: ToolGroup) -> Self {
        Self { context, group }
    }

    /// Run the tool and map its outcome onto the protocol.
    ///
    /// Argument problems become JSON-RPC errors; upstream and validation
    /// failures become a result flagged with `isError` so the model can read
    /// the message.
    async fn call(&self, params: CallToolParams) -> McpResult<CallToolResult> {
        let CallToolParams { name, arguments } = params;
        debug!("Calling tool {} ({:?})", name, self.group);

        let arguments = arguments.unwrap_or_default();
        match self.group.dispatch(&self.context, &name, arguments).await {
            Ok(ToolOutput::Text(text)) => Ok(CallToolResult::text(text)),
            Ok(ToolOutput::Json(value)) => Ok(CallToolResult::json(value)),
            Err(ToolError::InvalidArguments(message)) => Err(McpError::InvalidToolParameters {
                tool: name,
                message,
            }),
            Err(ToolError::UnknownTool(name)) => Err(McpError::ToolNotFound { name }),
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl ToolHandler for ApiToolHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        Ok(self.call(params).await?)
    }
}

/// Register every API tool with the server
#[inline]
pub async fn register_api_tools(server: &McpServer, context: Arc<ApiContext>) {
    for group in ToolGroup::ALL {
        for tool in group.tools() {
            server
                .register_tool(tool, ApiToolHandler::new(Arc::clone(&context), group))
                .await;
        }
    }

    info!("Registered {} tools", server.tool_count().await);
}

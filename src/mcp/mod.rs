//! MCP (Model Context Protocol) Server Implementation
//!
//! This module provides an MCP server following the JSON-RPC 2.0
//! specification over newline-delimited stdio, exposing the open-data API
//! tools.


pub mod errors;
pub mod protocol;
pub mod server;
pub mod tools;

pub use errors::{ErrorHandler, McpError, McpResult};
pub use protocol::{CallToolParams, CallToolResult, Tool, ToolContent};
pub use server::{ConnectionState, McpServer, MessageHandler, ToolHandler};

//! MCP Server for the PDF sentence index
//!
//! Provides AI-native access to semantic sentence search over the corpus.

mod server;

pub use server::run_mcp_server;

pub mod mcp_api;
pub mod openai;
pub mod prompt;
pub mod sse;

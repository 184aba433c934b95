// mcpdesk-api: Async Rust client for the MCP admin console API (request gateway + streaming chat)

pub mod error;
pub mod gateway;
pub mod hooks;
pub mod models;
pub mod normalize;
pub mod sse;
pub mod stream;
pub mod transport;

mod chat;
mod markets;
mod tools;

pub use error::{Error, ErrorKind};
pub use gateway::{CallOptions, Gateway, GatewayOptions, Payload, ResponseKind};
pub use hooks::{Notifier, RequestHook, RequestHooks, TracingNotifier};
pub use mcp_test::ProbedTools;
pub use stream::{
    CancelHandle, ChatStream, SessionState, StreamController, StreamEvent, StreamHandler,
};
pub use transport::{TlsMode, TransportConfig};

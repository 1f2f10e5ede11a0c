//! HTTP API: server, request/response types, shared state, log streaming.

pub mod logs;
pub mod server;
pub mod state;
pub mod types;

pub use logs::*;
pub use server::{router, start_server};
pub use state::AppState;
pub use types::*;

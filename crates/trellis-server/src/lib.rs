//! Trellis Server - JSON-RPC over WebSocket
//!
//! A thin glue layer: every method decodes its params, calls one core
//! operation and encodes the result. The server owns the shared state
//! (parser, version history, oracle client); analyses themselves are
//! pure and recomputed per request.

use std::sync::Arc;

mod handlers;
mod oracle;
mod protocol;
mod server;

pub use oracle::{clean_json, Oracle, OracleError};
pub use protocol::{Request, Response, RpcError};
pub use server::{ServerConfig, TrellisServer};

use trellis_core::NotationParser;
use trellis_history::HistoryStore;

/// State shared by every connection.
pub struct AppState {
    pub parser: NotationParser,
    pub history: HistoryStore,
    pub oracle: Oracle,
}

/// Handlers clone this cheaply per request.
pub type SharedState = Arc<AppState>;

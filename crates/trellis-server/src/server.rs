//! WebSocket server: accepts connections and routes messages.

use crate::handlers::{
    handle_build, handle_cluster_analysis, handle_cone, handle_consistency, handle_density_map,
    handle_density_metrics, handle_history_clear, handle_history_compare, handle_history_delete,
    handle_history_evolution, handle_history_list, handle_history_restore, handle_history_save,
    handle_layered, handle_node_get, handle_parse, handle_path_analysis, handle_paths,
    handle_questions, handle_search, handle_suggestions, handle_summary, handle_temporal,
    handle_territories, handle_timeline,
};
use crate::protocol::{Request, Response};
use crate::SharedState;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 7641)),
        }
    }
}

/// The Trellis WebSocket server.
pub struct TrellisServer {
    config: ServerConfig,
    state: SharedState,
}

impl TrellisServer {
    /// Creates a server over the shared state.
    pub fn new(state: SharedState, config: ServerConfig) -> Self {
        Self { config, state }
    }

    /// Runs the accept loop forever.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Trellis server listening on {}", self.config.addr);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, state).await {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Serves one WebSocket connection until it closes.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: SharedState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    info!("WebSocket connection established with {}", addr);

    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!("Message error from {}: {}", addr, e);
                break;
            }
        };

        if msg.is_close() {
            debug!("Client {} disconnected", addr);
            break;
        }

        if msg.is_ping() {
            write.send(Message::Pong(msg.into_data())).await?;
            continue;
        }

        if msg.is_text() {
            let text = msg.to_text().unwrap_or("");
            let response = process_message(text, state.clone()).await;
            let json = serde_json::to_string(&response)?;
            write.send(Message::Text(json)).await?;
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

/// Decodes one JSON-RPC message and routes it to its handler.
async fn process_message(text: &str, state: SharedState) -> Response {
    let request: Request = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => return Response::parse_error(),
    };

    let id = request.id.clone();
    let method = request.method.as_str();
    debug!("Processing method: {}", method);

    macro_rules! with_params {
        ($handler:ident) => {
            match serde_json::from_value(request.params) {
                Ok(params) => $handler(state, id, params).await,
                Err(e) => Response::invalid_params(id, e.to_string()),
            }
        };
    }

    match method {
        "notes.parse" => with_params!(handle_parse),

        "graph.build" => with_params!(handle_build),
        "graph.cone" => with_params!(handle_cone),
        "graph.search" => with_params!(handle_search),
        "graph.paths" => with_params!(handle_paths),
        "graph.node" => with_params!(handle_node_get),
        "graph.layered" => with_params!(handle_layered),

        "analysis.temporal" => with_params!(handle_temporal),
        "analysis.consistency" => with_params!(handle_consistency),
        "analysis.questions" => with_params!(handle_questions),
        "analysis.summary" => with_params!(handle_summary),
        "analysis.path" => with_params!(handle_path_analysis),
        "analysis.clusters" => with_params!(handle_cluster_analysis),

        "density.map" => with_params!(handle_density_map),
        "density.territories" => with_params!(handle_territories),
        "density.suggestions" => with_params!(handle_suggestions),
        "density.metrics" => with_params!(handle_density_metrics),

        "timeline.events" => with_params!(handle_timeline),

        "history.save" => with_params!(handle_history_save),
        "history.list" => handle_history_list(state, id).await,
        "history.restore" => with_params!(handle_history_restore),
        "history.compare" => with_params!(handle_history_compare),
        "history.delete" => with_params!(handle_history_delete),
        "history.clear" => handle_history_clear(state, id).await,
        "history.evolution" => handle_history_evolution(state, id).await,

        _ => Response::method_not_found(id, method),
    }
}

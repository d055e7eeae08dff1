// Copyright 2025 Apirelay (https://github.com/apirelay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! MCP serve loop: pump one transport through the handler until the client
//! disconnects.

use crate::mcp::handlers::McpHandler;
use crate::mcp::protocol::{JsonRpcError, JsonRpcId, JsonRpcResponse};
use crate::mcp::transport::{McpTransport, TransportError};
use std::sync::Arc;
use tracing::{error, info};

pub struct McpServer {
    handler: Arc<McpHandler>,
}

impl McpServer {
    pub fn new(handler: Arc<McpHandler>) -> Self {
        Self { handler }
    }

    pub async fn serve<T: McpTransport>(&self, transport: &mut T) -> Result<(), TransportError> {
        info!("MCP server ready");
        loop {
            let request = match transport.recv().await {
                Ok(request) => request,
                Err(e) if e.is_disconnect() => {
                    info!("MCP client disconnected");
                    return Ok(());
                }
                Err(TransportError::Json(e)) => {
                    // Malformed frame: answer with a parse error, keep serving.
                    let response = JsonRpcResponse::error(
                        JsonRpcId::Null,
                        JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
                    );
                    transport.send(response).await?;
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "transport error");
                    return Err(e);
                }
            };

            let response = self.handler.handle_request(request).await;
            transport.send(response).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{JsonRpcRequest, JSONRPC_VERSION};
    use crate::mcp::transport::BufferTransport;
    use crate::tools::registry::ToolRegistry;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn serve_answers_until_disconnect() {
        let handler = Arc::new(McpHandler::new(Arc::new(ToolRegistry::new())));
        let server = McpServer::new(handler);

        let (req_tx, req_rx) = mpsc::channel(4);
        let (resp_tx, mut resp_rx) = mpsc::channel(4);
        let mut transport = BufferTransport::new(req_rx, resp_tx);

        let task = tokio::spawn(async move { server.serve(&mut transport).await });

        req_tx
            .send(JsonRpcRequest {
                jsonrpc: JSONRPC_VERSION.to_string(),
                method: "ping".to_string(),
                params: None,
                id: JsonRpcId::Number(1),
            })
            .await
            .unwrap();
        assert!(resp_rx.recv().await.unwrap().result.is_some());

        drop(req_tx);
        task.await.unwrap().unwrap();
    }
}

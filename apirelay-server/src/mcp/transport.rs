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

//! MCP transport abstraction.
//!
//! The server speaks to a single local client over stdio with
//! length-prefixed framing (4-byte big-endian length). `BufferTransport`
//! backs tests and in-process use.

use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use bytes::BytesMut;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Channel closed")]
    ChannelClosed,
    #[error("Invalid frame length: {0}")]
    InvalidFrameLength(usize),
}

impl TransportError {
    /// EOF on stdin means the client went away; the serve loop treats it as
    /// a clean shutdown rather than an error.
    pub fn is_disconnect(&self) -> bool {
        match self {
            TransportError::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            TransportError::ChannelClosed => true,
            _ => false,
        }
    }
}

/// Transport abstraction for MCP JSON-RPC messages.
#[async_trait::async_trait]
pub trait McpTransport: Send {
    /// Receive a JSON-RPC request.
    async fn recv(&mut self) -> Result<JsonRpcRequest, TransportError>;
    /// Send a JSON-RPC response.
    async fn send(&mut self, response: JsonRpcResponse) -> Result<(), TransportError>;
}

/// Stdio transport with length-prefixed framing (4-byte big-endian length).
pub struct StdioTransport {
    reader: BufReader<tokio::io::Stdin>,
    writer: BufWriter<tokio::io::Stdout>,
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            writer: BufWriter::new(tokio::io::stdout()),
        }
    }

    async fn read_frame(&mut self) -> Result<BytesMut, TransportError> {
        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf) as usize;
        if len == 0 {
            return Err(TransportError::InvalidFrameLength(len));
        }
        let mut buf = BytesMut::with_capacity(4 + len);
        buf.extend_from_slice(&len_buf);
        buf.resize(4 + len, 0);
        self.reader.read_exact(&mut buf[4..]).await?;
        Ok(buf)
    }

    async fn write_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let len = payload.len();
        if len == 0 {
            return Err(TransportError::InvalidFrameLength(len));
        }
        let len_buf = (len as u32).to_be_bytes();
        self.writer.write_all(&len_buf).await?;
        self.writer.write_all(payload).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl McpTransport for StdioTransport {
    async fn recv(&mut self) -> Result<JsonRpcRequest, TransportError> {
        let frame = self.read_frame().await?;
        decode_length_prefixed_request(frame)
    }

    async fn send(&mut self, response: JsonRpcResponse) -> Result<(), TransportError> {
        let payload = serde_json::to_vec(&response)?;
        self.write_frame(&payload).await
    }
}

/// Channel-backed transport for tests and in-process use.
pub struct BufferTransport {
    input: mpsc::Receiver<JsonRpcRequest>,
    output: mpsc::Sender<JsonRpcResponse>,
}

impl BufferTransport {
    pub fn new(
        input: mpsc::Receiver<JsonRpcRequest>,
        output: mpsc::Sender<JsonRpcResponse>,
    ) -> Self {
        Self { input, output }
    }
}

#[async_trait::async_trait]
impl McpTransport for BufferTransport {
    async fn recv(&mut self) -> Result<JsonRpcRequest, TransportError> {
        self.input.recv().await.ok_or(TransportError::ChannelClosed)
    }

    async fn send(&mut self, response: JsonRpcResponse) -> Result<(), TransportError> {
        self.output
            .send(response)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// Decode a complete length-prefixed frame into a request.
///
/// `StdioTransport::recv` delegates here once a full frame is buffered.
pub fn decode_length_prefixed_request(mut buf: BytesMut) -> Result<JsonRpcRequest, TransportError> {
    if buf.len() < 4 {
        return Err(TransportError::InvalidFrameLength(buf.len()));
    }
    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if buf.len() < 4 + len {
        return Err(TransportError::InvalidFrameLength(buf.len()));
    }
    let payload = buf.split_off(4).split_to(len);
    let request = serde_json::from_slice(&payload)?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::JsonRpcId;
    use bytes::BufMut;

    #[test]
    fn decode_round_trip() {
        let payload = br#"{"jsonrpc":"2.0","method":"ping","id":1}"#;
        let mut buf = BytesMut::new();
        buf.put_u32(payload.len() as u32);
        buf.put_slice(payload);

        let request = decode_length_prefixed_request(buf).unwrap();
        assert_eq!(request.method, "ping");
        assert_eq!(request.id, JsonRpcId::Number(1));
    }

    #[test]
    fn decode_rejects_short_buffers() {
        let buf = BytesMut::from(&[0u8, 0][..]);
        assert!(matches!(
            decode_length_prefixed_request(buf),
            Err(TransportError::InvalidFrameLength(_))
        ));
    }

    #[tokio::test]
    async fn buffer_transport_moves_messages() {
        let (req_tx, req_rx) = mpsc::channel(4);
        let (resp_tx, mut resp_rx) = mpsc::channel(4);
        let mut transport = BufferTransport::new(req_rx, resp_tx);

        req_tx
            .send(JsonRpcRequest {
                jsonrpc: "2.0".into(),
                method: "ping".into(),
                params: None,
                id: JsonRpcId::Number(1),
            })
            .await
            .unwrap();

        let request = transport.recv().await.unwrap();
        assert_eq!(request.method, "ping");

        transport
            .send(JsonRpcResponse::success(
                JsonRpcId::Number(1),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert!(resp_rx.recv().await.unwrap().result.is_some());

        drop(req_tx);
        assert!(transport.recv().await.unwrap_err().is_disconnect());
    }
}

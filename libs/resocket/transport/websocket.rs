use crate::traits::*;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Close code reported when the server sends a close frame without a status
const NO_STATUS_RECEIVED: u16 = 1005;

/// WebSocket transport backed by tokio-tungstenite
///
/// `open` builds the upgrade request synchronously, so a malformed URL or
/// protocol token is a construction failure. Dialing, the handshake and all
/// frame I/O happen on a spawned task.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn open(&self, target: &ConnectTarget) -> Result<TransportHandle> {
        let request = build_request(target)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SocketError::Runtime(e.to_string()))?;

        let (handle, link) = TransportHandle::pair();
        runtime.spawn(run_transport(request, link));
        Ok(handle)
    }
}

/// Build the HTTP upgrade request, negotiating sub-protocols if requested
fn build_request(target: &ConnectTarget) -> Result<Request> {
    let mut request = target
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| SocketError::InvalidTarget(format!("{}: {}", target.url, e)))?;

    if !target.protocols.is_empty() {
        let value = target.protocols.join(", ");
        let header = value.parse::<http::header::HeaderValue>().map_err(|_| {
            SocketError::InvalidTarget(format!("Invalid protocol tokens: {}", value))
        })?;
        request
            .headers_mut()
            .insert(http::header::SEC_WEBSOCKET_PROTOCOL, header);
    }

    Ok(request)
}

/// Dial, then pump frames between the socket and the manager
async fn run_transport(request: Request, mut link: TransportLink) {
    let url = request.uri().to_string();
    let connect = connect_async(request);
    tokio::pin!(connect);

    let ws_stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((stream, _)) => break stream,
                Err(e) => {
                    debug!("Failed to connect to {}: {}", url, e);
                    link.emit(TransportEvent::Error(SocketError::WebSocket(e.to_string())));
                    link.emit(TransportEvent::Closed(CloseInfo::abnormal(e.to_string())));
                    return;
                }
            },
            cmd = link.commands.recv() => match cmd {
                Some(TransportCommand::Send(_)) => {
                    debug!("Dropping payload sent before {} opened", url);
                }
                Some(TransportCommand::Close) | None => {
                    debug!("Connection to {} abandoned before open", url);
                    return;
                }
            },
        }
    };

    if !link.emit(TransportEvent::Opened) {
        return;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if !link.emit(TransportEvent::Message(Payload::Text(text))) {
                        let _ = write.close().await;
                        return;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    if !link.emit(TransportEvent::Message(Payload::Binary(data))) {
                        let _ = write.close().await;
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let info = frame
                        .map(|cf| CloseInfo::new(cf.code.into(), cf.reason.to_string()))
                        .unwrap_or_else(|| CloseInfo::new(NO_STATUS_RECEIVED, ""));
                    debug!("Server closed {}: {:?}", url, info);
                    let _ = write.close().await;
                    link.emit(TransportEvent::Closed(info));
                    return;
                }
                Some(Ok(_)) => {
                    // Ping/Pong are answered by tungstenite; raw frames are not surfaced
                }
                Some(Err(e)) => {
                    warn!("WebSocket error on {}: {}", url, e);
                    link.emit(TransportEvent::Error(SocketError::WebSocket(e.to_string())));
                    link.emit(TransportEvent::Closed(CloseInfo::abnormal(e.to_string())));
                    return;
                }
                None => {
                    link.emit(TransportEvent::Closed(CloseInfo::abnormal("stream ended")));
                    return;
                }
            },

            cmd = link.commands.recv() => match cmd {
                Some(TransportCommand::Send(payload)) => {
                    if let Err(e) = write.send(to_message(payload)).await {
                        link.emit(TransportEvent::Error(SocketError::WebSocket(format!(
                            "Failed to send: {}", e
                        ))));
                    }
                }
                Some(TransportCommand::Close) | None => {
                    debug!("Closing connection to {}", url);
                    let _ = write.close().await;
                    link.emit(TransportEvent::Closed(CloseInfo::new(
                        CloseInfo::NORMAL,
                        "closed by client",
                    )));
                    return;
                }
            },
        }
    }
}

/// Convert Payload to tungstenite Message
fn to_message(payload: Payload) -> Message {
    match payload.into_wire() {
        Payload::Binary(data) => Message::Binary(data),
        Payload::Text(text) => Message::Text(text),
        Payload::Json(value) => Message::Text(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_plain() {
        let request = build_request(&ConnectTarget::new("ws://localhost:9001/feed")).unwrap();
        assert_eq!(request.uri().path(), "/feed");
        assert!(request
            .headers()
            .get(http::header::SEC_WEBSOCKET_PROTOCOL)
            .is_none());
    }

    #[test]
    fn test_build_request_with_protocols() {
        let target = ConnectTarget::new("wss://example.com/ws")
            .with_protocols(vec!["v1.json".to_string(), "v1.binary".to_string()]);
        let request = build_request(&target).unwrap();
        assert_eq!(
            request.headers()[http::header::SEC_WEBSOCKET_PROTOCOL],
            "v1.json, v1.binary"
        );
    }

    #[test]
    fn test_build_request_rejects_bad_url() {
        let err = build_request(&ConnectTarget::new("not a url")).unwrap_err();
        assert!(matches!(err, SocketError::InvalidTarget(_)));
    }

    #[test]
    fn test_build_request_rejects_bad_protocol() {
        let target =
            ConnectTarget::new("ws://localhost").with_protocols(vec!["bad\nvalue".to_string()]);
        assert!(build_request(&target).is_err());
    }

    #[test]
    fn test_open_without_runtime_is_construction_failure() {
        let err = WsConnector::new()
            .open(&ConnectTarget::new("ws://localhost:1"))
            .unwrap_err();
        assert!(matches!(err, SocketError::Runtime(_)));
    }

    #[test]
    fn test_json_payload_becomes_text_frame() {
        let msg = to_message(Payload::Json(serde_json::json!({"a": 1})));
        assert_eq!(msg, Message::Text(r#"{"a":1}"#.to_string()));
    }
}

//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers, making HTTP requests,
//! and driving gateway connections.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use typing_common::AppConfig;
use typing_gateway::{serve, GatewayState};

/// Typing timeout used by test servers
pub const TEST_TYPING_TIMEOUT_MS: u64 = 300;

/// Heartbeat interval used by test servers
pub const TEST_HEARTBEAT_INTERVAL_MS: u64 = 1_000;

/// How long a test waits for a single frame
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()?).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let state = GatewayState::from_config(config);
        let handle = tokio::spawn(async move {
            serve(listener, state).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the gateway WebSocket URL
    pub fn gateway_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.delete(&url).send().await?)
    }

    /// Open a gateway connection and consume its Hello
    pub async fn connect(&self) -> Result<GatewayClient> {
        let mut client = self.connect_raw().await?;
        let hello = client.recv().await?;
        if hello["op"] != 10 {
            bail!("Expected Hello, got {hello}");
        }
        Ok(client)
    }

    /// Open a gateway connection without reading anything
    pub async fn connect_raw(&self) -> Result<GatewayClient> {
        let (stream, _) = connect_async(self.gateway_url())
            .await
            .context("WebSocket handshake failed")?;
        Ok(GatewayClient { stream })
    }

    /// Open a gateway connection and identify as `participant_id`
    pub async fn connect_identified(
        &self,
        participant_id: i64,
        display_name: Option<&str>,
    ) -> Result<GatewayClient> {
        let mut client = self.connect().await?;
        client.identify(participant_id, display_name).await?;
        client.recv_event("READY").await?;
        Ok(client)
    }
}

/// Create a test configuration with short timers
pub fn test_config() -> Result<AppConfig> {
    config_with_typing_timeout(TEST_TYPING_TIMEOUT_MS)
}

/// Create a test configuration with a custom typing timeout
pub fn config_with_typing_timeout(typing_timeout_ms: u64) -> Result<AppConfig> {
    let typing_timeout = typing_timeout_ms.to_string();
    let heartbeat_interval = TEST_HEARTBEAT_INTERVAL_MS.to_string();

    AppConfig::from_lookup(|name| match name {
        "GATEWAY_PORT" => Some("0".to_string()),
        "TYPING_TIMEOUT_MS" => Some(typing_timeout.clone()),
        "HEARTBEAT_INTERVAL_MS" => Some(heartbeat_interval.clone()),
        _ => None,
    })
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))
}

/// Client side of a gateway connection
pub struct GatewayClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl GatewayClient {
    /// Send a raw text frame
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Send a JSON frame
    pub async fn send(&mut self, frame: Value) -> Result<()> {
        self.send_text(frame.to_string()).await
    }

    pub async fn identify(&mut self, participant_id: i64, display_name: Option<&str>) -> Result<()> {
        let mut d = json!({ "participant_id": participant_id.to_string() });
        if let Some(name) = display_name {
            d["display_name"] = json!(name);
        }
        self.send(json!({ "op": 2, "d": d })).await
    }

    pub async fn heartbeat(&mut self, seq: Option<u64>) -> Result<()> {
        self.send(json!({ "op": 1, "d": seq })).await
    }

    pub async fn typing_start(&mut self, conversation_id: &str) -> Result<()> {
        self.send(json!({ "op": 3, "d": { "conversation_id": conversation_id } }))
            .await
    }

    pub async fn typing_stop(&mut self, conversation_id: &str) -> Result<()> {
        self.send(json!({ "op": 4, "d": { "conversation_id": conversation_id } }))
            .await
    }

    pub async fn subscribe(&mut self, conversation_id: &str) -> Result<()> {
        self.send(json!({ "op": 5, "d": { "conversation_id": conversation_id } }))
            .await
    }

    pub async fn unsubscribe(&mut self, conversation_id: &str) -> Result<()> {
        self.send(json!({ "op": 6, "d": { "conversation_id": conversation_id } }))
            .await
    }

    /// Receive the next JSON frame, skipping control frames
    pub async fn recv(&mut self) -> Result<Value> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for a frame")?;

            match next {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(other)) => bail!("Unexpected frame: {other:?}"),
                Some(Err(e)) => return Err(e.into()),
                None => bail!("Connection closed"),
            }
        }
    }

    /// Receive frames until a Dispatch of `event` arrives and return its data
    pub async fn recv_event(&mut self, event: &str) -> Result<Value> {
        loop {
            let frame = self.recv().await?;
            if frame["op"] == 0 && frame["t"] == event {
                return Ok(frame["d"].clone());
            }
        }
    }

    /// Receive TYPING_UPDATE frames until one matches `predicate`
    pub async fn recv_typing_update_where(
        &mut self,
        predicate: impl Fn(&[Value]) -> bool,
    ) -> Result<Vec<Value>> {
        loop {
            let data = self.recv_event("TYPING_UPDATE").await?;
            let typing = data["typing"]
                .as_array()
                .cloned()
                .context("TYPING_UPDATE without a typing list")?;
            if predicate(&typing) {
                return Ok(typing);
            }
        }
    }

    /// Read until the server closes the connection and return its close code
    pub async fn expect_close(&mut self) -> Result<Option<u16>> {
        loop {
            let next = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for close")?;

            match next {
                Some(Ok(Message::Close(frame))) => {
                    return Ok(frame.map(|frame| u16::from(frame.code)));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(None),
            }
        }
    }

    /// Close the connection from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Participant ids of a typing list, in order
pub fn participant_ids(typing: &[Value]) -> Vec<String> {
    typing
        .iter()
        .filter_map(|indicator| indicator["participant_id"].as_str().map(str::to_string))
        .collect()
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(())
}

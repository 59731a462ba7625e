//! Realtime Subscription Channel
//!
//! AppSync realtime protocol over a browser WebSocket (`graphql-ws`
//! subprotocol). `ChannelProtocol` is the DOM-free state machine; the socket
//! binding below only executes the effects it emits.

use base64::Engine;
use leptos::logging::{log, warn};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::graphql::{graphql_error, GraphQlErrorEntry, GraphQlRequest, GraphQlResponse, OnCreateRestaurantData};
use crate::error::ApiError;
use crate::models::Restaurant;

pub const SUBPROTOCOL: &str = "graphql-ws";

/// Keep-alive window used until the server announces its own
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u32 = 300_000;

// ========================
// Wire Messages
// ========================

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage<'a> {
    ConnectionInit,
    Start { id: &'a str, payload: &'a StartPayload },
    Stop { id: &'a str },
}

#[derive(Debug, Clone, Serialize)]
struct StartPayload {
    /// JSON-encoded `{ query, variables }`
    data: String,
    extensions: Extensions,
}

#[derive(Debug, Clone, Serialize)]
struct Extensions {
    authorization: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    ConnectionAck {
        #[serde(default)]
        payload: Option<AckPayload>,
    },
    Ka,
    StartAck {
        id: String,
    },
    Data {
        id: String,
        payload: GraphQlResponse<OnCreateRestaurantData>,
    },
    Error {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        payload: Option<ErrorPayload>,
    },
    ConnectionError {
        #[serde(default)]
        payload: Option<ErrorPayload>,
    },
    Complete {
        id: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct AckPayload {
    #[serde(rename = "connectionTimeoutMs")]
    connection_timeout_ms: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// Handshake URL: authorization travels base64-encoded in the query string
pub fn connect_url(endpoint: &str, authorization: &Map<String, Value>) -> String {
    let header = base64::engine::general_purpose::STANDARD.encode(Value::Object(authorization.clone()).to_string());
    let payload = base64::engine::general_purpose::STANDARD.encode("{}");
    format!("{}?header={}&payload={}", endpoint, encode(&header), encode(&payload))
}

// ========================
// Protocol State Machine
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    AwaitingAck,
    Starting,
    Active,
    Closed,
}

/// Work for the socket binding to carry out
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEffect {
    Send(String),
    Deliver(Restaurant),
    /// (Re)start the keep-alive watchdog
    ArmWatchdog(u32),
    Close,
}

pub struct ChannelProtocol {
    id: String,
    start: StartPayload,
    state: ChannelState,
    timeout_ms: u32,
}

impl ChannelProtocol {
    pub fn new(id: impl Into<String>, request: &GraphQlRequest, authorization: Map<String, Value>) -> Result<Self, ApiError> {
        Ok(Self {
            id: id.into(),
            start: StartPayload {
                data: serde_json::to_string(request)?,
                extensions: Extensions { authorization },
            },
            state: ChannelState::Connecting,
            timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    fn send(message: &ClientMessage<'_>) -> Vec<ChannelEffect> {
        match serde_json::to_string(message) {
            Ok(text) => vec![ChannelEffect::Send(text)],
            Err(e) => {
                warn!("[Realtime] Failed to encode message: {}", e);
                Vec::new()
            }
        }
    }

    fn close(&mut self) -> Vec<ChannelEffect> {
        self.state = ChannelState::Closed;
        vec![ChannelEffect::Close]
    }

    pub fn on_open(&mut self) -> Vec<ChannelEffect> {
        if self.state != ChannelState::Connecting {
            return Vec::new();
        }
        self.state = ChannelState::AwaitingAck;
        Self::send(&ClientMessage::ConnectionInit)
    }

    pub fn on_frame(&mut self, text: &str) -> Vec<ChannelEffect> {
        if self.state == ChannelState::Closed {
            return Vec::new();
        }
        let message = match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("[Realtime] Unreadable frame ({}): {}", e, text);
                return Vec::new();
            }
        };

        match message {
            ServerMessage::ConnectionAck { payload } => {
                if self.state != ChannelState::AwaitingAck {
                    return Vec::new();
                }
                if let Some(ms) = payload.and_then(|p| p.connection_timeout_ms) {
                    self.timeout_ms = ms;
                }
                self.state = ChannelState::Starting;
                let mut effects = vec![ChannelEffect::ArmWatchdog(self.timeout_ms)];
                effects.extend(Self::send(&ClientMessage::Start {
                    id: &self.id,
                    payload: &self.start,
                }));
                effects
            }
            ServerMessage::Ka => vec![ChannelEffect::ArmWatchdog(self.timeout_ms)],
            ServerMessage::StartAck { id } if id == self.id => {
                log!("[Realtime] Subscription {} started", self.id);
                self.state = ChannelState::Active;
                Vec::new()
            }
            ServerMessage::Data { id, payload } if id == self.id => {
                match payload.into_result("onCreateRestaurant") {
                    Ok(OnCreateRestaurantData { on_create_restaurant: Some(restaurant) }) => {
                        vec![ChannelEffect::Deliver(restaurant)]
                    }
                    Ok(_) => Vec::new(),
                    Err(e) => {
                        warn!("[Realtime] Event carried errors: {}", e);
                        Vec::new()
                    }
                }
            }
            ServerMessage::Error { id, payload } if id.as_deref().map_or(true, |id| id == self.id) => {
                let errors = payload.unwrap_or_default().errors;
                warn!("[Realtime] Subscription failed: {}", graphql_error(&errors));
                self.close()
            }
            ServerMessage::ConnectionError { payload } => {
                let errors = payload.unwrap_or_default().errors;
                warn!("[Realtime] Connection rejected: {}", graphql_error(&errors));
                self.close()
            }
            ServerMessage::Complete { id } if id == self.id => {
                log!("[Realtime] Subscription {} completed by server", self.id);
                self.close()
            }
            _ => Vec::new(),
        }
    }

    /// No keep-alive inside the window: the channel is gone
    pub fn on_watchdog_expired(&mut self) -> Vec<ChannelEffect> {
        if self.state == ChannelState::Closed {
            return Vec::new();
        }
        warn!("[Realtime] No keep-alive within {}ms, dropping channel", self.timeout_ms);
        self.close()
    }

    pub fn on_closed(&mut self) {
        if self.state != ChannelState::Closed {
            warn!("[Realtime] Socket closed, no further events will arrive");
            self.state = ChannelState::Closed;
        }
    }

    /// Client-side cancellation
    pub fn stop(&mut self) -> Vec<ChannelEffect> {
        match self.state {
            ChannelState::Starting | ChannelState::Active => {
                let mut effects = Self::send(&ClientMessage::Stop { id: &self.id });
                effects.extend(self.close());
                effects
            }
            ChannelState::Connecting | ChannelState::AwaitingAck => self.close(),
            ChannelState::Closed => Vec::new(),
        }
    }
}

// ========================
// Browser Socket Binding
// ========================

#[cfg(target_arch = "wasm32")]
pub use socket::open_channel;

#[cfg(target_arch = "wasm32")]
mod socket {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    use gloo_timers::callback::Timeout;
    use leptos::logging::{log, warn};
    use wasm_bindgen::prelude::*;
    use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

    use super::{ChannelEffect, ChannelProtocol, ChannelState, SUBPROTOCOL};
    use crate::api::SubscriptionHandle;
    use crate::error::ApiError;
    use crate::models::Restaurant;

    struct Inner {
        socket: WebSocket,
        protocol: RefCell<ChannelProtocol>,
        watchdog: RefCell<Option<Timeout>>,
        on_created: Rc<dyn Fn(Restaurant)>,
    }

    fn apply(inner: &Rc<Inner>, effects: Vec<ChannelEffect>) {
        for effect in effects {
            match effect {
                ChannelEffect::Send(text) => {
                    if let Err(e) = inner.socket.send_with_str(&text) {
                        warn!("[Realtime] Send failed: {:?}", e);
                    }
                }
                ChannelEffect::Deliver(restaurant) => (inner.on_created)(restaurant),
                ChannelEffect::ArmWatchdog(ms) => {
                    let weak = Rc::downgrade(inner);
                    let timeout = Timeout::new(ms, move || with_inner(&weak, |p| p.on_watchdog_expired()));
                    // Replacing the previous timeout cancels it
                    inner.watchdog.borrow_mut().replace(timeout);
                }
                ChannelEffect::Close => {
                    inner.watchdog.borrow_mut().take();
                    let _ = inner.socket.close();
                }
            }
        }
    }

    fn with_inner(weak: &Weak<Inner>, step: impl FnOnce(&mut ChannelProtocol) -> Vec<ChannelEffect>) {
        if let Some(inner) = weak.upgrade() {
            let effects = step(&mut inner.protocol.borrow_mut());
            apply(&inner, effects);
        }
    }

    /// Open socket plus the callbacks it needs kept alive
    struct RealtimeChannel {
        inner: Rc<Inner>,
        _on_open: Closure<dyn FnMut(Event)>,
        _on_message: Closure<dyn FnMut(MessageEvent)>,
        _on_close: Closure<dyn FnMut(CloseEvent)>,
    }

    impl SubscriptionHandle for RealtimeChannel {
        fn is_open(&self) -> bool {
            self.inner.protocol.borrow().state() != ChannelState::Closed
        }

        fn unsubscribe(self: Box<Self>) {
            log!("[Realtime] Unsubscribed {}", self.inner.protocol.borrow().id());
        }
    }

    /// However the channel is released, the server sees `stop` and the
    /// socket stops calling back
    impl Drop for RealtimeChannel {
        fn drop(&mut self) {
            let effects = self.inner.protocol.borrow_mut().stop();
            apply(&self.inner, effects);
            self.inner.socket.set_onopen(None);
            self.inner.socket.set_onmessage(None);
            self.inner.socket.set_onclose(None);
        }
    }

    pub fn open_channel(
        url: &str,
        protocol: ChannelProtocol,
        on_created: Rc<dyn Fn(Restaurant)>,
    ) -> Result<Box<dyn SubscriptionHandle>, ApiError> {
        Ok(Box::new(connect(url, protocol, on_created)?))
    }

    fn connect(
        url: &str,
        protocol: ChannelProtocol,
        on_created: Rc<dyn Fn(Restaurant)>,
    ) -> Result<RealtimeChannel, ApiError> {
        let socket = WebSocket::new_with_str(url, SUBPROTOCOL)
            .map_err(|e| ApiError::Channel(format!("{:?}", e)))?;

        let inner = Rc::new(Inner {
            socket,
            protocol: RefCell::new(protocol),
            watchdog: RefCell::new(None),
            on_created,
        });

        let weak = Rc::downgrade(&inner);
        let on_open = Closure::<dyn FnMut(Event)>::new(move |_: Event| with_inner(&weak, |p| p.on_open()));

        let weak = Rc::downgrade(&inner);
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            if let Some(text) = event.data().as_string() {
                with_inner(&weak, |p| p.on_frame(&text));
            }
        });

        let weak = Rc::downgrade(&inner);
        let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.watchdog.borrow_mut().take();
                inner.protocol.borrow_mut().on_closed();
                log!("[Realtime] Socket closed (code {})", event.code());
            }
        });

        inner.socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        inner.socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        inner.socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(RealtimeChannel {
            inner,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorization() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("host".to_string(), Value::from("abc.appsync-api.us-east-1.amazonaws.com"));
        map.insert("x-api-key".to_string(), Value::from("da2-key"));
        map
    }

    fn protocol() -> ChannelProtocol {
        ChannelProtocol::new("sub-1", &GraphQlRequest::on_create_restaurant(), authorization()).unwrap()
    }

    fn started() -> ChannelProtocol {
        let mut protocol = protocol();
        protocol.on_open();
        protocol.on_frame(r#"{"type":"connection_ack","payload":{"connectionTimeoutMs":1000}}"#);
        protocol.on_frame(r#"{"type":"start_ack","id":"sub-1"}"#);
        protocol
    }

    fn sent(effect: &ChannelEffect) -> Value {
        match effect {
            ChannelEffect::Send(text) => serde_json::from_str(text).unwrap(),
            other => panic!("expected a send, got {:?}", other),
        }
    }

    #[test]
    fn test_connect_url_encodes_header() {
        let url = connect_url("wss://abc.appsync-realtime-api.us-east-1.amazonaws.com/graphql", &authorization());
        let (base, query) = url.split_once('?').unwrap();
        assert_eq!(base, "wss://abc.appsync-realtime-api.us-east-1.amazonaws.com/graphql");
        assert!(query.ends_with("&payload=e30%3D"));

        let header = query.trim_start_matches("header=").split('&').next().unwrap();
        let header = percent_encoding::percent_decode_str(header).decode_utf8().unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(header.as_bytes()).unwrap();
        let json: Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(json["x-api-key"], "da2-key");
    }

    #[test]
    fn test_handshake_sends_init_then_start() {
        let mut protocol = protocol();

        let effects = protocol.on_open();
        assert_eq!(effects.len(), 1);
        assert_eq!(sent(&effects[0])["type"], "connection_init");
        assert_eq!(protocol.state(), ChannelState::AwaitingAck);

        let effects = protocol.on_frame(r#"{"type":"connection_ack","payload":{"connectionTimeoutMs":1000}}"#);
        assert_eq!(effects[0], ChannelEffect::ArmWatchdog(1000));
        let start = sent(&effects[1]);
        assert_eq!(start["type"], "start");
        assert_eq!(start["id"], "sub-1");
        assert_eq!(start["payload"]["extensions"]["authorization"]["x-api-key"], "da2-key");
        let data: Value = serde_json::from_str(start["payload"]["data"].as_str().unwrap()).unwrap();
        assert!(data["query"].as_str().unwrap().contains("onCreateRestaurant"));
        assert_eq!(protocol.state(), ChannelState::Starting);

        protocol.on_frame(r#"{"type":"start_ack","id":"sub-1"}"#);
        assert_eq!(protocol.state(), ChannelState::Active);
    }

    #[test]
    fn test_data_frame_delivers_restaurant() {
        let mut protocol = started();
        let effects = protocol.on_frame(
            r#"{"type":"data","id":"sub-1","payload":{"data":{"onCreateRestaurant":
                {"id":"9","name":"Joe's","description":"Pizza","city":"NYC","__typename":"Restaurant"}}}}"#,
        );
        assert_eq!(effects, vec![ChannelEffect::Deliver(Restaurant::new("Joe's", "Pizza", "NYC"))]);
    }

    #[test]
    fn test_frames_for_other_ids_are_ignored() {
        let mut protocol = started();
        let effects = protocol.on_frame(
            r#"{"type":"data","id":"sub-2","payload":{"data":{"onCreateRestaurant":
                {"name":"x","description":"y","city":"z"}}}}"#,
        );
        assert!(effects.is_empty());
        assert!(protocol.on_frame(r#"{"type":"complete","id":"sub-2"}"#).is_empty());
        assert_eq!(protocol.state(), ChannelState::Active);
    }

    #[test]
    fn test_keep_alive_rearms_watchdog() {
        let mut protocol = started();
        assert_eq!(protocol.on_frame(r#"{"type":"ka"}"#), vec![ChannelEffect::ArmWatchdog(1000)]);
    }

    #[test]
    fn test_watchdog_expiry_closes_silently() {
        let mut protocol = started();
        assert_eq!(protocol.on_watchdog_expired(), vec![ChannelEffect::Close]);
        assert_eq!(protocol.state(), ChannelState::Closed);
        assert!(protocol.on_frame(r#"{"type":"ka"}"#).is_empty());
        assert!(protocol.stop().is_empty());
    }

    #[test]
    fn test_stop_after_start_sends_stop() {
        let mut protocol = started();
        let effects = protocol.stop();
        assert_eq!(effects.len(), 2);
        let stop = sent(&effects[0]);
        assert_eq!(stop["type"], "stop");
        assert_eq!(stop["id"], "sub-1");
        assert_eq!(effects[1], ChannelEffect::Close);
        assert!(protocol.stop().is_empty());
    }

    #[test]
    fn test_stop_before_ack_only_closes() {
        let mut protocol = protocol();
        protocol.on_open();
        assert_eq!(protocol.stop(), vec![ChannelEffect::Close]);
    }

    #[test]
    fn test_start_error_closes_channel() {
        let mut protocol = started();
        let effects = protocol.on_frame(
            r#"{"type":"error","id":"sub-1","payload":{"errors":[{"errorType":"UnauthorizedException","message":"denied"}]}}"#,
        );
        assert_eq!(effects, vec![ChannelEffect::Close]);
        assert_eq!(protocol.state(), ChannelState::Closed);
    }

    #[test]
    fn test_unknown_frames_are_ignored() {
        let mut protocol = started();
        assert!(protocol.on_frame(r#"{"type":"something_new"}"#).is_empty());
        assert!(protocol.on_frame("not json").is_empty());
        assert_eq!(protocol.state(), ChannelState::Active);
    }
}

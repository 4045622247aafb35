//! LiveReload wire messages and the per-connection handshake state machine.
//!
//! Messages are JSON objects tagged by a `command` field. Unknown commands
//! fail deserialization, which the connection task treats as a protocol
//! violation: the connection is closed, quietly, since unsolicited probes on
//! the LiveReload port are common.
//!
//! Protocol documentation: <http://livereload.com/api/protocol/>

use serde::{Deserialize, Serialize};

/// The lightweight probe protocol: echoed, left open, never broadcast to.
pub const PROTOCOL_CONNECTION_CHECK: &str = "http://livereload.com/protocols/connection-check-1";
/// The full reload protocol: echoed, registered for broadcasts.
pub const PROTOCOL_OFFICIAL_7: &str = "http://livereload.com/protocols/official-7";

/// One LiveReload message, tagged by command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum LiveReloadMessage {
    /// Protocol negotiation, both directions.
    Hello {
        #[serde(default)]
        protocols: Option<Vec<String>>,
    },
    /// Client-side page URL report (sent on connect and on navigation).
    Info {
        #[serde(default)]
        url: Option<String>,
    },
    /// Server-to-client reload command.
    Reload {
        path: String,
        #[serde(rename = "liveCSS")]
        live_css: bool,
        #[serde(rename = "liveImg")]
        live_img: bool,
    },
}

impl LiveReloadMessage {
    /// The `hello` reply echoing the negotiated protocol.
    pub fn hello_reply(protocol: &str) -> Self {
        LiveReloadMessage::Hello {
            protocols: Some(vec![protocol.to_string()]),
        }
    }

    /// The reload command for a changed path. CSS and image live-reload are
    /// always permitted; the client decides what to do with the flags.
    pub fn reload(path: &str) -> Self {
        LiveReloadMessage::Reload {
            path: path.to_string(),
            live_css: true,
            live_img: true,
        }
    }
}

/// Handshake phase of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    NegotiatingProtocol,
    Active,
    Closed,
}

/// What the connection task should do after feeding a message to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send this reply and stay open, unregistered (connection-check).
    Reply(LiveReloadMessage),
    /// Send this reply and add the connection to the active registry.
    ReplyAndRegister(LiveReloadMessage),
    /// Record this page origin against the connection.
    RecordOrigin(String),
    /// Nothing to do.
    Ignore,
    /// Protocol violation or failed negotiation: close the connection.
    Close,
}

/// Pure per-connection state machine. The connection task owns the socket;
/// this type only decides transitions.
#[derive(Debug)]
pub struct ClientSession {
    phase: Phase,
}

impl ClientSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Connecting,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Record the socket closing (client- or server-initiated).
    pub fn on_close(&mut self) {
        self.phase = Phase::Closed;
    }

    /// Advance the state machine with one inbound message.
    pub fn on_message(&mut self, message: LiveReloadMessage) -> SessionAction {
        match message {
            LiveReloadMessage::Hello { protocols } => self.on_hello(protocols),
            LiveReloadMessage::Info { url } => self.on_info(url),
            // reload is a server-to-client command; inbound copies are noise
            LiveReloadMessage::Reload { .. } => SessionAction::Ignore,
        }
    }

    fn on_hello(&mut self, protocols: Option<Vec<String>>) -> SessionAction {
        if self.phase == Phase::Active {
            // renegotiation after registration is ignored
            return SessionAction::Ignore;
        }
        self.phase = Phase::NegotiatingProtocol;

        let Some(protocols) = protocols else {
            self.phase = Phase::Closed;
            return SessionAction::Close;
        };
        for protocol in &protocols {
            if protocol == PROTOCOL_CONNECTION_CHECK {
                return SessionAction::Reply(LiveReloadMessage::hello_reply(protocol));
            }
            if protocol == PROTOCOL_OFFICIAL_7 {
                self.phase = Phase::Active;
                return SessionAction::ReplyAndRegister(LiveReloadMessage::hello_reply(protocol));
            }
        }
        self.phase = Phase::Closed;
        SessionAction::Close
    }

    fn on_info(&mut self, url: Option<String>) -> SessionAction {
        match url.as_deref().and_then(origin_of) {
            Some(origin) => SessionAction::RecordOrigin(origin),
            None => {
                self.phase = Phase::Closed;
                SessionAction::Close
            }
        }
    }
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract `scheme://host[:port]` from a page URL.
pub fn origin_of(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    if authority_end == 0 {
        return None;
    }
    Some(format!("{}://{}", &url[..scheme_end], &rest[..authority_end]))
}

//! Wire envelope and topics
//!
//! Both directions use the same JSON envelope: `{"type": string, "payload": object}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Outbound heartbeat type
pub const PING: &str = "ping";
/// Inbound handshake acknowledgment type
pub const CONNECTION_ESTABLISHED: &str = "connection-established";

pub const JOB_DETAILS: &str = "job-details";
pub const JOB_DETAILS_LISTEN: &str = "job-details-listen";
pub const JOB_PROGRESS: &str = "job-progress";
pub const JOB_PROGRESS_LISTEN: &str = "job-progress-listen";

/// The `{type, payload}` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl WireMessage {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// The heartbeat: `{"type":"ping","payload":{}}`
    pub fn ping() -> Self {
        Self::new(PING, json!({}))
    }

    /// A listen request for `topic`/`id`
    pub fn listen(topic: &Topic, id: &str) -> Self {
        Self::new(topic.listen_type(), json!({ "id": id }))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// A parsed inbound frame as handed to the dispatch sink
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub kind: String,
    pub payload: Value,
}

impl Fact {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Handshake acknowledgment; sinks should tolerate seeing it
    pub fn is_connection_established(&self) -> bool {
        self.kind == CONNECTION_ESTABLISHED
    }
}

impl From<WireMessage> for Fact {
    fn from(msg: WireMessage) -> Self {
        Self {
            kind: msg.kind,
            payload: msg.payload,
        }
    }
}

/// A logical subscription channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Job detail updates (`job-details-listen`)
    JobDetails,
    /// Job progress updates (`job-progress-listen`)
    JobProgress,
    /// Any other listen type, used verbatim on the wire
    Custom(String),
}

impl Topic {
    /// Wire `type` of the listen message for this topic
    pub fn listen_type(&self) -> &str {
        match self {
            Topic::JobDetails => JOB_DETAILS_LISTEN,
            Topic::JobProgress => JOB_PROGRESS_LISTEN,
            Topic::Custom(kind) => kind,
        }
    }

    /// Composite registry key: `<listen type>:<id>`
    pub fn key(&self, id: &str) -> String {
        format!("{}:{}", self.listen_type(), id)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.listen_type())
    }
}

use crate::{ConnectionId, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Body of a message delivered on a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Point(Point),
    Polygon(Polygon),
    /// Anything a client relays straight to a `/topic` destination.
    Raw(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe {
        destination: String,
    },
    Unsubscribe {
        destination: String,
    },
    Send {
        destination: String,
        #[serde(default)]
        body: serde_json::Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Connected {
        connection_id: ConnectionId,
    },
    Message {
        destination: String,
        body: Payload,
    },
    Error {
        message: String,
    },
}

//! WebSocket JSON envelopes (`spec.md` §4.3, §6)
//!
//! Both directions share one convention: a minified UTF-8 JSON object with
//! a mandatory string `type` field. Follows the teacher's
//! `#[serde(tag = "type")]` tagged-enum dispatch idiom
//! (`tallow_protocol::wire::Message`), split into an `Inbound` enum (what a
//! client may send) and an `Outbound` enum (what the server may send) since
//! the two sets barely overlap and keeping them separate lets the router
//! return `Vec<Outbound>` actions without a match arm for client-only
//! variants.

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::room::RoomSummary;
use crate::shape::{ShapeData, StrokeDelta};

/// An envelope received from a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum Inbound {
    SetUsername {
        username: String,
    },
    GetRooms {},
    GetActiveUsers {},
    CreateRoom {
        room_name: String,
        #[serde(default)]
        is_public: bool,
        #[serde(default)]
        password: String,
        #[serde(default)]
        invited_users: Vec<String>,
    },
    JoinRoom {
        room_id: String,
        #[serde(default)]
        password: String,
    },
    LeaveRoom {},
    Draw {
        #[serde(flatten)]
        stroke: StrokeDelta,
    },
    AddShape {
        #[serde(flatten)]
        shape: ShapeData,
    },
    UpdateShape {
        #[serde(flatten)]
        shape: ShapeData,
    },
    DeleteShape {
        id: String,
    },
    Clear {},
    Cursor {
        x: f64,
        y: f64,
        username: String,
    },
    ChatMessage {
        message: String,
    },
    GetChatHistory {},
}

/// An envelope sent to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum Outbound {
    RoomList {
        rooms: Vec<RoomSummary>,
    },
    ActiveUsers {
        users: Vec<String>,
    },
    RoomCreated {
        room_id: String,
        room_name: String,
        is_public: bool,
    },
    RoomJoined {
        room_id: String,
        room_name: String,
    },
    NewPublicRoom {
        room_id: String,
        room_name: String,
        creator: String,
    },
    NewPrivateRoomInvite {
        room_id: String,
        room_name: String,
        creator: String,
        has_password: bool,
    },
    UserJoined {
        username: String,
    },
    UserLeft {
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participants: Option<usize>,
    },
    Draw {
        #[serde(flatten)]
        stroke: StrokeDelta,
    },
    /// Verbatim re-broadcast of a client's `addShape`.
    AddShape {
        #[serde(flatten)]
        shape: ShapeData,
    },
    /// Synthetic shape insertion from the image upload port (`spec.md`
    /// §4.8) — deliberately untyped `payload` since the image-upload
    /// envelope carries fields (`room`) that don't belong on `ShapeData`.
    ShapeAdded {
        payload: serde_json::Value,
    },
    UpdateShape {
        #[serde(flatten)]
        shape: ShapeData,
    },
    DeleteShape {
        id: String,
    },
    Clear {
        username: String,
    },
    Cursor {
        x: f64,
        y: f64,
        username: String,
    },
    ChatMessage {
        username: String,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    ChatHistory {
        messages: Vec<ChatMessage>,
    },
    Error {
        message: String,
    },
}

impl Outbound {
    /// Serialize to the minified JSON text frame the wire protocol sends.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Outbound envelopes are always serializable")
    }

    pub fn error(message: impl Into<String>) -> Self {
        Outbound::Error {
            message: message.into(),
        }
    }
}

impl Inbound {
    /// Parse a raw text-frame payload into a typed inbound envelope.
    ///
    /// Unknown `type` values and malformed JSON are both protocol errors;
    /// the router (`spec.md` §7) treats both as "ignore, connection
    /// continues" rather than tearing down the connection.
    pub fn parse(raw: &str) -> crate::Result<Inbound> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let type_name = value
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("<missing>")
            .to_string();
        serde_json::from_value(value)
            .map_err(|_| crate::ProtocolError::UnknownType(type_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_username_round_trips() {
        let raw = r#"{"type":"setUsername","username":"alice"}"#;
        let env = Inbound::parse(raw).unwrap();
        assert_eq!(
            env,
            Inbound::SetUsername {
                username: "alice".into()
            }
        );
    }

    #[test]
    fn unknown_type_is_protocol_error() {
        let raw = r#"{"type":"doSomethingWeird"}"#;
        assert!(Inbound::parse(raw).is_err());
    }

    #[test]
    fn draw_flattens_stroke_fields() {
        let raw = r#"{"type":"draw","x1":0,"y1":0,"x2":10,"y2":10,"color":"#000000","size":2}"#;
        let env = Inbound::parse(raw).unwrap();
        match env {
            Inbound::Draw { stroke } => assert_eq!(stroke.x2, 10.0),
            _ => panic!("expected draw"),
        }
    }

    #[test]
    fn outbound_error_serializes_with_type_tag() {
        let out = Outbound::error("Room not found");
        let json = out.to_json();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains("Room not found"));
    }

    #[test]
    fn room_list_round_trips() {
        let out = Outbound::RoomList {
            rooms: vec![RoomSummary {
                room_id: "r1".into(),
                room_name: "R".into(),
                creator: "alice".into(),
                participants: 1,
                max_participants: 50,
                is_public: true,
                has_password: false,
            }],
        };
        let json = out.to_json();
        let back: Outbound = serde_json::from_str(&json).unwrap();
        assert_eq!(out, back);
    }
}

//! JSON messages exchanged between the hub and its websocket clients.

use serde::{Deserialize, Serialize};

use crate::store::{Document, Snapshot};

/// Messages sent by a client to the hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Upsert {
        user_id: String,
        latitude: f64,
        longitude: f64,
    },
    GetSnapshot,
}

/// Messages pushed by the hub to its clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot { documents: Vec<Document> },
    Error { message: String },
}

impl From<Snapshot> for ServerMessage {
    fn from(snapshot: Snapshot) -> Self {
        ServerMessage::Snapshot {
            documents: snapshot.documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_format() {
        let upsert: ClientMessage = serde_json::from_value(json!({
            "type": "upsert",
            "user_id": "u1",
            "latitude": 37.0,
            "longitude": -122.0
        }))
        .unwrap();

        assert_eq!(
            upsert,
            ClientMessage::Upsert {
                user_id: "u1".into(),
                latitude: 37.0,
                longitude: -122.0
            }
        );

        let get: ClientMessage = serde_json::from_str(r#"{"type":"get_snapshot"}"#).unwrap();
        assert_eq!(get, ClientMessage::GetSnapshot);
    }

    #[test]
    fn test_server_snapshot_format() {
        let snapshot = Snapshot::new(vec![Document::new("u1", json!({"latitude": 1.0}))]);
        let message = ServerMessage::from(snapshot);

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "type": "snapshot",
                "documents": [{"id": "u1", "data": {"latitude": 1.0}}]
            })
        );
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"delete"}"#).is_err());
    }
}

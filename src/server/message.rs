//! Wire messages
//!
//! Viewers speak newline-delimited JSON. Each inbound line is a [`Request`];
//! each outbound line is a [`Reply`], either the answer to a request or an
//! unsolicited `changed` notification.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::hub::ChangeEvent;
use crate::registry::{Entry, EntryKey, ErrorKind, RegistryError};

/// An integer field that may arrive as a JSON number or as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    pub fn as_text(&self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

/// Inbound request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Insert {
        #[serde(rename = "classcode")]
        class_code: String,
        #[serde(rename = "classno")]
        class_no: Scalar,
    },
    Delete {
        #[serde(rename = "classcode")]
        class_code: String,
        #[serde(rename = "classno")]
        class_no: Scalar,
    },
    SetPriority {
        #[serde(rename = "classcode")]
        class_code: String,
        #[serde(rename = "classno")]
        class_no: Scalar,
        priority: Scalar,
    },
    Toggle {
        #[serde(rename = "classcode")]
        class_code: String,
        #[serde(rename = "classno")]
        class_no: Scalar,
        flag: String,
    },
    List {
        #[serde(rename = "classcodes")]
        class_codes: Vec<String>,
        #[serde(rename = "isComplete", default, skip_serializing_if = "Option::is_none")]
        is_complete: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<String>,
    },
}

impl Request {
    /// Decode a request line
    pub fn decode(line: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(line)?)
    }

    /// Parse the entry key of a keyed request
    pub fn key(&self) -> Option<Result<EntryKey, RegistryError>> {
        match self {
            Request::Insert {
                class_code,
                class_no,
            }
            | Request::Delete {
                class_code,
                class_no,
            }
            | Request::SetPriority {
                class_code,
                class_no,
                ..
            }
            | Request::Toggle {
                class_code,
                class_no,
                ..
            } => Some(EntryKey::parse(class_code, &class_no.as_text())),
            Request::List { .. } => None,
        }
    }
}

/// Successful mutation acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(flatten)]
    pub key: EntryKey,
    /// Human-readable summary, e.g. "1A5 is added"
    pub message: String,
    /// New flag value, for toggles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
}

/// Outbound line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// Mutation succeeded
    Ack(Ack),
    /// Result of a list request
    Entries { entries: Vec<Entry> },
    /// Request failed
    Error { kind: ErrorKind, message: String },
    /// An entry changed
    Changed(ChangeEvent),
}

impl Reply {
    /// Build an error reply
    pub fn error(err: &Error) -> Self {
        let kind = match err {
            Error::Registry(e) => e.kind(),
            Error::Codec(_) => ErrorKind::Validation,
            Error::HubClosed | Error::Io(_) => ErrorKind::Storage,
        };
        Reply::Error {
            kind,
            message: err.to_string(),
        }
    }

    /// Encode as a newline-terminated line
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

impl From<RegistryError> for Reply {
    fn from(err: RegistryError) -> Self {
        Reply::error(&Error::Registry(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{ChangeKind, Notification};

    #[test]
    fn test_decode_requests() {
        let req = Request::decode(br#"{"op":"insert","classcode":"1A","classno":5}"#).unwrap();
        assert_eq!(
            req,
            Request::Insert {
                class_code: "1A".into(),
                class_no: Scalar::Int(5)
            }
        );
        assert_eq!(req.key().unwrap().unwrap(), EntryKey::new("1A", 5));

        let req = Request::decode(
            br#"{"op":"set_priority","classcode":"1A","classno":"5","priority":"2"}"#,
        )
        .unwrap();
        assert_eq!(req.key().unwrap().unwrap(), EntryKey::new("1A", 5));

        let req = Request::decode(
            br#"{"op":"list","classcodes":["1A","1B"],"isComplete":"=true"}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            Request::List {
                class_codes: vec!["1A".into(), "1B".into()],
                is_complete: Some("=true".into()),
                priority: None,
            }
        );
        assert!(req.key().is_none());
    }

    #[test]
    fn test_bad_class_no_is_validation() {
        let req = Request::decode(br#"{"op":"delete","classcode":"1A","classno":"five"}"#)
            .unwrap();
        assert!(matches!(
            req.key().unwrap(),
            Err(RegistryError::Validation(_))
        ));

        let req = Request::decode(br#"{"op":"delete","classcode":"1A","classno":-3}"#).unwrap();
        assert!(req.key().unwrap().is_err());
    }

    #[test]
    fn test_unknown_op_is_codec_error() {
        let err = Request::decode(br#"{"op":"truncate"}"#).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
        assert!(matches!(
            Reply::error(&err),
            Reply::Error {
                kind: ErrorKind::Validation,
                ..
            }
        ));
    }

    #[test]
    fn test_error_reply_shape() {
        let reply = Reply::from(RegistryError::NotFound(EntryKey::new("1A", 5)));
        let value: serde_json::Value = serde_json::to_value(&reply).unwrap();

        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "not_found");
        assert_eq!(value["message"], "entry not found: 1A5");
    }

    #[test]
    fn test_ack_shape() {
        let reply = Reply::Ack(Ack {
            key: EntryKey::new("1A", 5),
            message: "1A5 toggled IsComplete".into(),
            value: Some(true),
        });
        let value: serde_json::Value = serde_json::to_value(&reply).unwrap();

        assert_eq!(value["type"], "ack");
        assert_eq!(value["classcode"], "1A");
        assert_eq!(value["classno"], 5);
        assert_eq!(value["value"], true);
    }

    #[test]
    fn test_changed_reply_matches_notification_line() {
        let event = ChangeEvent::new(EntryKey::new("2B", 3), ChangeKind::Removed);
        let notification = Notification::encode(&event).unwrap();

        let decoded: Reply = serde_json::from_slice(&notification.payload).unwrap();
        assert_eq!(decoded, Reply::Changed(event));
    }
}

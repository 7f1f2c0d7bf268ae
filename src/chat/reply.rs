//! Wire types for the reply service and the failure taxonomy

use serde::{Deserialize, Serialize};

/// Unique identifier for reply requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Body of `POST <endpoint>`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Set only when the message came from a book selection
    pub selected_text: Option<String>,
    pub api_key: String,
}

impl ChatRequest {
    pub fn typed(message: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            selected_text: None,
            api_key: api_key.into(),
        }
    }

    pub fn from_selection(text: impl Into<String>, api_key: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            message: text.clone(),
            selected_text: Some(text),
            api_key: api_key.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("server error: HTTP {status}")]
    Server { status: u16 },

    #[error("backend not found at {endpoint}")]
    NotFound { endpoint: String },

    #[error("HTTP error: status {status}")]
    Status { status: u16 },

    #[error("cannot connect to {endpoint}: {detail}")]
    Connect { endpoint: String, detail: String },

    #[error("no response within the request timeout")]
    Timeout,

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    #[error("{0}")]
    Other(String),
}

pub type ReplyOutcome = Result<String, ReplyError>;

impl ReplyError {
    /// Classify a non-2xx status
    pub fn from_status(status: u16, endpoint: &str) -> Self {
        match status {
            500 => ReplyError::Server { status },
            404 => ReplyError::NotFound {
                endpoint: endpoint.to_string(),
            },
            _ => ReplyError::Status { status },
        }
    }

    /// Transcript text shown to the reader for this failure
    pub fn user_message(&self) -> String {
        match self {
            ReplyError::Server { .. } => {
                "The server encountered an error. Please check the backend logs.".to_string()
            }
            ReplyError::NotFound { endpoint } => format!(
                "Backend server not found. Please make sure it is running at {endpoint}."
            ),
            ReplyError::Status { status } => {
                format!("The server returned HTTP {status}. Please try again.")
            }
            ReplyError::Connect { endpoint, .. } => {
                format!("Cannot connect to the backend server at {endpoint}.")
            }
            ReplyError::Timeout => {
                "The backend did not respond in time. Please try again.".to_string()
            }
            ReplyError::MalformedReply(_) => {
                "The server sent a reply I could not understand. Please try again.".to_string()
            }
            ReplyError::Other(_) => "Sorry, I encountered an error. Please try again.".to_string(),
        }
    }
}

/// Validate a 2xx body against the `{ "reply": string }` schema
pub fn parse_reply(body: &str) -> ReplyOutcome {
    let reply = serde_json::from_str::<ChatReply>(body)
        .map_err(|e| ReplyError::MalformedReply(e.to_string()))?;
    if reply.reply.trim().is_empty() {
        return Err(ReplyError::MalformedReply("empty reply".to_string()));
    }
    Ok(reply.reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_request_carries_selected_text() {
        let request = ChatRequest::from_selection("explain torque", "k");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "explain torque",
                "selected_text": "explain torque",
                "api_key": "k"
            })
        );
    }

    #[test]
    fn typed_request_sends_null_selection() {
        let json = serde_json::to_value(ChatRequest::typed("hello", "")).unwrap();
        assert_eq!(json["selected_text"], serde_json::Value::Null);
        assert_eq!(json["api_key"], "");
    }

    #[test]
    fn status_classification() {
        let endpoint = "http://localhost:8000/chat";
        assert_eq!(
            ReplyError::from_status(500, endpoint),
            ReplyError::Server { status: 500 }
        );
        assert!(matches!(
            ReplyError::from_status(404, endpoint),
            ReplyError::NotFound { .. }
        ));
        assert_eq!(
            ReplyError::from_status(403, endpoint),
            ReplyError::Status { status: 403 }
        );
    }

    #[test]
    fn user_messages_are_distinct_per_class() {
        let endpoint = "http://localhost:8000/chat";
        let messages = [
            ReplyError::from_status(500, endpoint).user_message(),
            ReplyError::from_status(404, endpoint).user_message(),
            ReplyError::from_status(502, endpoint).user_message(),
            ReplyError::Connect {
                endpoint: endpoint.into(),
                detail: "refused".into(),
            }
            .user_message(),
            ReplyError::Other("boom".into()).user_message(),
        ];
        assert!(messages[1].contains("not found"));
        assert!(messages[2].contains("502"));
        assert!(messages[3].starts_with("Cannot connect"));
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn reply_schema_is_checked() {
        assert_eq!(parse_reply(r#"{"reply":"hi there"}"#), Ok("hi there".to_string()));
        assert!(matches!(
            parse_reply(r#"{"answer":"hi"}"#),
            Err(ReplyError::MalformedReply(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"reply":42}"#),
            Err(ReplyError::MalformedReply(_))
        ));
        assert!(matches!(parse_reply("<html>"), Err(ReplyError::MalformedReply(_))));
        assert!(matches!(
            parse_reply(r#"{"reply":"  "}"#),
            Err(ReplyError::MalformedReply(_))
        ));
    }
}

//! Result envelopes for the planner-facing surface.
//!
//! Every tool call answers with a JSON object carrying a `status` of
//! `success` or `error`. Failures are ordinary payloads the planner can
//! read and react to, not protocol-level faults.

use serde::Serialize;

use crate::dom::DomNode;

/// Plain action outcome: a message either way.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ActionEnvelope {
    Success { message: String },
    Error { message: String },
}

impl ActionEnvelope {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
        }
    }

    pub fn error(err: impl std::fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}

/// Navigation outcome. Success carries the URL the browser actually landed
/// on, which may differ from the requested one after redirects.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NavigateEnvelope {
    Success { message: String, url: String },
    Error { message: String },
}

impl NavigateEnvelope {
    pub fn success(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
            url: url.into(),
        }
    }

    pub fn error(err: impl std::fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}

/// Current-URL query outcome.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UrlEnvelope {
    Success { current_url: String },
    Error { message: String },
}

impl UrlEnvelope {
    pub fn success(current_url: impl Into<String>) -> Self {
        Self::Success {
            current_url: current_url.into(),
        }
    }

    pub fn error(err: impl std::fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}

/// Snapshot outcome. The error arm keeps a `tree` field (always null) so
/// planners can read the same key on both arms.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SnapshotEnvelope {
    Success {
        message: String,
        tree: DomNode,
        mmid_counter: u64,
    },
    Error {
        message: String,
        tree: Option<DomNode>,
    },
}

impl SnapshotEnvelope {
    pub fn success(message: impl Into<String>, tree: DomNode, mmid_counter: u64) -> Self {
        Self::Success {
            message: message.into(),
            tree,
            mmid_counter,
        }
    }

    pub fn error(err: impl std::fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
            tree: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_success_shape() {
        let json = serde_json::to_value(ActionEnvelope::success("Enter key pressed")).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Enter key pressed");
    }

    #[test]
    fn action_error_shape() {
        let json = serde_json::to_value(ActionEnvelope::error("boom")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "boom");
    }

    #[test]
    fn navigate_success_carries_final_url() {
        let env = NavigateEnvelope::success(
            "Successfully navigated to https://example.com",
            "https://example.com/home",
        );
        let json = serde_json::to_value(env).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["url"], "https://example.com/home");
    }

    #[test]
    fn url_success_shape() {
        let json = serde_json::to_value(UrlEnvelope::success("https://example.com")).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["current_url"], "https://example.com");
    }

    #[test]
    fn snapshot_error_keeps_null_tree() {
        let json = serde_json::to_value(SnapshotEnvelope::error("no page")).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["tree"].is_null());
        assert_eq!(json["message"], "no page");
    }

    #[test]
    fn snapshot_success_shape() {
        let tree = DomNode {
            tag: "body".into(),
            mmid: None,
            attrs: Default::default(),
            text: String::new(),
            children: vec![],
        };
        let json =
            serde_json::to_value(SnapshotEnvelope::success("ok", tree, 7)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["mmid_counter"], 7);
        assert_eq!(json["tree"]["tag"], "body");
    }
}

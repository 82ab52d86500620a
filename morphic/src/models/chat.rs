//! Chat summary and page models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat as listed in the history sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    /// Unique identifier for the chat.
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// When the chat was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Owner of the chat, absent for local chats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Route that opens the chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Public share route, if the chat was shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_path: Option<String>,
}

impl ChatSummary {
    /// Create a new chat summary stamped with the current time.
    pub fn new(id: String, title: String) -> Self {
        let path = Some(format!("/search/{id}"));
        Self {
            id,
            title,
            created_at: Some(Utc::now()),
            user_id: None,
            path,
            share_path: None,
        }
    }
}

/// One page of chat history as returned by `GET /api/chats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPage {
    /// Chats in this page, most recent first.
    pub chats: Vec<ChatSummary>,
    /// Offset of the next page, `None` once history is exhausted.
    pub next_offset: Option<u64>,
}

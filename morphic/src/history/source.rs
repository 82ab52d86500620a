//! Remote source of paginated chat history.

use async_trait::async_trait;

use crate::error::HistoryError;
use crate::models::ChatPage;

/// A paginated chat history backend.
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// Fetch the page starting at `offset`.
    async fn fetch_page(&self, offset: u64) -> Result<ChatPage, HistoryError>;
}

/// `GET {base_url}/api/chats?offset=N`.
#[derive(Debug, Clone)]
pub struct HttpChatSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChatSource for HttpChatSource {
    async fn fetch_page(&self, offset: u64) -> Result<ChatPage, HistoryError> {
        let url = format!("{}/api/chats?offset={offset}", self.base_url);

        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(HistoryError::Status(resp.status().as_u16()));
        }

        Ok(resp.json().await?)
    }
}

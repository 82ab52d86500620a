//! In-memory chat store backing the history API.

use crate::models::{ChatPage, ChatSummary};

/// Default number of chats per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Chats ordered most recent first.
#[derive(Debug)]
pub struct ChatStore {
    chats: Vec<ChatSummary>,
    page_size: usize,
}

impl ChatStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            chats: Vec::new(),
            page_size: page_size.max(1),
        }
    }

    /// The page starting at `offset`. `next_offset` is `None` after the last chat.
    pub fn page(&self, offset: u64) -> ChatPage {
        let len = self.chats.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(len);
        let end = start.saturating_add(self.page_size).min(len);

        ChatPage {
            chats: self.chats[start..end].to_vec(),
            next_offset: (end < len).then_some(end as u64),
        }
    }

    /// Add a chat as the most recent one.
    pub fn insert(&mut self, chat: ChatSummary) {
        self.chats.insert(0, chat);
    }

    /// Remove a chat by id. Returns false if it did not exist.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.chats.len();
        self.chats.retain(|c| c.id != id);
        self.chats.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

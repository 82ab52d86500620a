//! Data models shared by the gate, the history reconciler and the server.

mod chat;
mod identity;

pub use chat::{ChatPage, ChatSummary};
pub use identity::UserId;

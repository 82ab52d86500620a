//! User identity as seen by the history reconciler.

/// Wire spelling of the anonymous identity.
pub const ANONYMOUS: &str = "anonymous";

/// The current user, resolved fresh on every load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserId {
    /// No backing session; history lives in the local cache.
    Anonymous,
    /// Authenticated user; history comes from the remote API.
    Authenticated(String),
}

impl UserId {
    /// Parse an identifier, mapping `"anonymous"` and blanks to [`UserId::Anonymous`].
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == ANONYMOUS {
            Self::Anonymous
        } else {
            Self::Authenticated(s.to_string())
        }
    }

    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Anonymous => ANONYMOUS,
            Self::Authenticated(id) => id,
        }
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Who saved readings are attributed to.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated user tokens
pub const TOKEN_LENGTH: usize = 8;

/// Longest accepted user name, in characters
pub const MAX_NAME_CHARS: usize = 50;

/// Random `[A-Za-z0-9]` token of `length` characters.
pub fn generate_token(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// User name as entered, plus the token used while it is blank.
///
/// The fallback token is drawn once per session so every save made without
/// a name is attributed to the same user.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    entered: String,
    session_token: String,
}

impl UserIdentity {
    pub fn new(entered: Option<String>) -> Self {
        let mut identity = Self {
            entered: String::new(),
            session_token: generate_token(TOKEN_LENGTH),
        };
        if let Some(name) = entered {
            identity.set(name);
        }
        identity
    }

    pub fn set(&mut self, name: impl Into<String>) {
        self.entered = name.into().chars().take(MAX_NAME_CHARS).collect();
    }

    /// Replace the entered name with a fresh random token.
    pub fn randomize(&mut self) -> &str {
        self.entered = generate_token(TOKEN_LENGTH);
        &self.entered
    }

    pub fn entered(&self) -> &str {
        &self.entered
    }

    /// Name to attribute saves and history lookups to.
    pub fn effective(&self) -> &str {
        let trimmed = self.entered.trim();
        if trimmed.is_empty() {
            &self.session_token
        } else {
            trimmed
        }
    }

    /// True when no name was entered and the session token is in use.
    pub fn is_anonymous(&self) -> bool {
        self.entered.trim().is_empty()
    }
}

impl Default for UserIdentity {
    fn default() -> Self {
        Self::new(None)
    }
}

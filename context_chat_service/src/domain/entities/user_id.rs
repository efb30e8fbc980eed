use common::helper::error_chain_fmt;

const MAX_LENGTH: usize = 128;

/// Opaque identifier of a user, also naming their context collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Parses a user id received from a request.
    ///
    /// Surrounding whitespaces are trimmed. The id ends up in a collection name,
    /// so whitespaces, control characters and path separators are rejected.
    pub fn parse(s: &str) -> Result<UserId, UserIdError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(UserIdError::Empty);
        }

        if s.chars().count() > MAX_LENGTH {
            return Err(UserIdError::TooLong(MAX_LENGTH));
        }

        if let Some(c) = s
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || *c == '/' || *c == '\\')
        {
            return Err(UserIdError::ForbiddenCharacter(c));
        }

        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(thiserror::Error)]
pub enum UserIdError {
    #[error("User ID is required")]
    Empty,
    #[error("User ID must not exceed {0} characters")]
    TooLong(usize),
    #[error("User ID contains a forbidden character: {0:?}")]
    ForbiddenCharacter(char),
}

impl std::fmt::Debug for UserIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

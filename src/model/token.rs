use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token. Please check and try again.";

/// A single-use credential granting access to vote in one election.
///
/// Always trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterToken(String);

impl VoterToken {
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VoterToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Tokens are credentials; only ever log a prefix.
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "{prefix}…")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Please enter your voter token")]
    Empty,
}

/// Why the remote API refused a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionReason {
    Used,
    Expired,
    Invalid,
    #[serde(other)]
    Unknown,
}

impl RejectionReason {
    /// Interpret the `reason` field of a failed validation. Anything
    /// unrecognised, including a missing reason, is [`RejectionReason::Unknown`].
    pub fn from_reason(reason: Option<&str>) -> Self {
        match reason {
            Some("used") => Self::Used,
            Some("expired") => Self::Expired,
            Some("invalid") => Self::Invalid,
            _ => Self::Unknown,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Used => "This token has already been used to cast a vote.",
            Self::Expired => "This token has expired.",
            Self::Invalid | Self::Unknown => INVALID_TOKEN_MESSAGE,
        }
    }
}

//! The remote election API.
//!
//! The portal never decides whether a token is valid or whether a vote counts;
//! it asks the API and reports what the API said. Everything the portal needs
//! from it sits behind [`ElectionApi`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    election::{BallotId, Election, ElectionId, ElectionPatch, OptionId},
    token::{RejectionReason, VoterToken},
};

mod http;
#[cfg(test)]
pub mod stub;

pub use http::HttpElectionApi;

/// Operations the portal performs against the remote election API.
#[rocket::async_trait]
pub trait ElectionApi: Send + Sync {
    /// Check a voter token before revealing the ballots.
    async fn validate_token(
        &self,
        request: &ValidateTokenRequest,
    ) -> Result<TokenValidation, RemoteError>;

    /// Cast every ballot of one voter in a single all-or-nothing call.
    async fn cast_votes(&self, request: &CastVotesRequest) -> Result<(), RemoteError>;

    /// Fetch the election behind a voting page.
    async fn election_by_slug(&self, slug: &str) -> Result<Election, RemoteError>;

    async fn list_elections(&self) -> Result<Vec<Election>, RemoteError>;

    async fn publish(&self, election_id: &str) -> Result<(), RemoteError>;

    async fn convert_to_draft(&self, election_id: &str) -> Result<(), RemoteError>;

    async fn delete(&self, election_id: &str) -> Result<(), RemoteError>;

    async fn edit(&self, election_id: &str, patch: &ElectionPatch) -> Result<(), RemoteError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTokenRequest {
    pub token: String,
    pub election_id: ElectionId,
}

impl ValidateTokenRequest {
    pub fn new(token: &VoterToken, election_id: &str) -> Self {
        Self {
            token: token.as_str().to_string(),
            election_id: election_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    pub status: String,
}

impl TokenValidation {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// One voter's complete batch of ballots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVotesRequest {
    pub token: String,
    pub election_id: ElectionId,
    pub ballots: Vec<BallotVote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotVote {
    pub ballot_id: BallotId,
    pub option_ids: Vec<OptionId>,
}

/// The JSON body the API sends alongside a failure status.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("election API answered {status}")]
    Rejected { status: u16, body: ErrorBody },
    #[error("election API unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RemoteError {
    pub fn rejected(status: u16, message: Option<&str>, reason: Option<&str>) -> Self {
        Self::Rejected {
            status,
            body: ErrorBody {
                message: message.map(str::to_string),
                reason: reason.map(str::to_string),
            },
        }
    }

    /// The message the API supplied, verbatim.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { body, .. } => body.message.as_deref(),
            Self::Transport(_) => None,
        }
    }

    pub fn rejection_reason(&self) -> RejectionReason {
        match self {
            Self::Rejected { body, .. } => RejectionReason::from_reason(body.reason.as_deref()),
            Self::Transport(_) => RejectionReason::Unknown,
        }
    }

    /// What to show the user: the server's message if it gave one, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { status: 404, .. })
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ElectionId = String;
pub type BallotId = String;
pub type OptionId = String;

const DEFAULT_PRIMARY_COLOR: &str = "#000000";
const DEFAULT_SECONDARY_COLOR: &str = "#666666";

/// An election as served by the remote elections API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    /// Public path segment of the voting page.
    #[serde(default)]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ElectionStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub branding: Option<Branding>,
    /// Ballots in display order.
    #[serde(default)]
    pub ballots: Vec<Ballot>,
}

impl Election {
    /// Get the ballot with the given ID, if it exists.
    pub fn ballot(&self, ballot_id: &str) -> Option<&Ballot> {
        self.ballots.iter().find(|ballot| ballot.id == ballot_id)
    }

    /// Branding with defaults filled in.
    pub fn theme(&self) -> Theme {
        let branding = self.branding.as_ref();
        Theme {
            primary_color: branding
                .and_then(|b| b.primary_color.clone())
                .unwrap_or_else(|| DEFAULT_PRIMARY_COLOR.to_string()),
            secondary_color: branding
                .and_then(|b| b.secondary_color.clone())
                .unwrap_or_else(|| DEFAULT_SECONDARY_COLOR.to_string()),
            logo: branding.and_then(|b| b.logo.clone()),
        }
    }
}

/// Lifecycle state of an election, as far as the dashboard is concerned.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    #[default]
    Draft,
    Published,
    Closed,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

/// Resolved branding used by every voter-facing screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub primary_color: String,
    pub secondary_color: String,
    pub logo: Option<String>,
}

/// One voting question within an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: BallotId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: BallotKind,
    #[serde(default)]
    pub max_selections: Option<u32>,
    #[serde(default)]
    pub options: Vec<BallotOption>,
}

impl Ballot {
    pub fn is_multiple(&self) -> bool {
        self.kind == BallotKind::Multiple
    }

    /// The selection cap of a multiple-choice ballot.
    /// A cap of zero counts as no cap at all.
    pub fn max_selections(&self) -> Option<usize> {
        match self.kind {
            BallotKind::Single => None,
            BallotKind::Multiple => self
                .max_selections
                .filter(|max| *max > 0)
                .map(|max| max as usize),
        }
    }

    pub fn option(&self, option_id: &str) -> Option<&BallotOption> {
        self.options.iter().find(|option| option.id == option_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallotKind {
    Single,
    Multiple,
}

/// A selectable choice within a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotOption {
    #[serde(rename = "_id")]
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl BallotOption {
    /// Letter shown in place of a missing photo.
    pub fn initial(&self) -> String {
        self.text
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "C".to_string())
    }
}

/// A partial update to an election's presentation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<Branding>,
}

impl ElectionPatch {
    /// Apply this patch in place.
    pub fn apply(&self, election: &mut Election) {
        if let Some(title) = &self.title {
            election.title = title.clone();
        }
        if let Some(description) = &self.description {
            election.description = Some(description.clone());
        }
        if let Some(start_date) = self.start_date {
            election.start_date = Some(start_date);
        }
        if let Some(end_date) = self.end_date {
            election.end_date = Some(end_date);
        }
        if let Some(branding) = &self.branding {
            election.branding = Some(branding.clone());
        }
    }
}

use serde::Serialize;

use crate::model::{
    election::{Ballot, BallotKind, Election, Theme},
    notice::Notice,
    selection::{Progress, Selections},
};

/// Everything a voter-facing page needs to render, tagged by which page it is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "screen", rename_all = "camelCase")]
pub enum VotingScreen {
    /// Token entry form.
    #[serde(rename_all = "camelCase")]
    TokenGate {
        header: Header,
        validating: bool,
        error: Option<String>,
        notice: Option<Notice>,
    },
    /// The election exists but has nothing to vote on.
    NoBallots { header: Header, message: String },
    /// The voting form, optionally with the confirmation step open.
    #[serde(rename_all = "camelCase")]
    Ballots {
        header: Header,
        progress: Option<Progress>,
        ballots: Vec<BallotView>,
        submitting: bool,
        confirmation: Option<Confirmation>,
        notice: Option<Notice>,
    },
    /// Terminal: the vote was recorded. No controls remain.
    Voted {
        header: Header,
        title: String,
        message: String,
        notice: Option<Notice>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub title: String,
    pub description: Option<String>,
    pub theme: Theme,
}

impl From<&Election> for Header {
    fn from(election: &Election) -> Self {
        Self {
            title: election.title.clone(),
            description: election.description.clone(),
            theme: election.theme(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: BallotKind,
    /// e.g. "Select up to 2 options"
    pub limit_hint: Option<String>,
    pub options: Vec<OptionView>,
}

impl BallotView {
    pub fn new(ballot: &Ballot, selections: &Selections) -> Self {
        let limit_hint = ballot.max_selections().map(|max| {
            let plural = if max > 1 { "s" } else { "" };
            format!("Select up to {max} option{plural}")
        });
        Self {
            id: ballot.id.clone(),
            title: ballot.title.clone(),
            description: ballot.description.clone(),
            kind: ballot.kind,
            limit_hint,
            options: ballot
                .options
                .iter()
                .map(|option| OptionView {
                    id: option.id.clone(),
                    text: option.text.clone(),
                    photo: option.photo.clone(),
                    bio: option.bio.clone(),
                    initial: option.initial(),
                    selected: selections.is_selected(&ballot.id, &option.id),
                    disabled: selections.is_disabled(ballot, &option.id),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
    pub photo: Option<String>,
    pub bio: Option<String>,
    pub initial: String,
    pub selected: bool,
    pub disabled: bool,
}

/// The voter's choices, shown for a last look before casting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub choices: Vec<Choice>,
}

impl Confirmation {
    pub fn new(election: &Election, selections: &Selections) -> Self {
        let choices = election
            .ballots
            .iter()
            .map(|ballot| Choice {
                ballot: ballot.title.clone(),
                options: selections
                    .get(&ballot.id)
                    .iter()
                    .filter_map(|id| ballot.option(id))
                    .map(|option| option.text.clone())
                    .collect(),
            })
            .collect();
        Self { choices }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub ballot: String,
    pub options: Vec<String>,
}

use std::collections::HashMap;

use serde::Serialize;

use crate::model::election::{Ballot, BallotId, Election, OptionId};

/// The options a voter has chosen so far, per ballot.
///
/// Options of a multiple-choice ballot are kept in the order they were picked.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selections(HashMap<BallotId, Vec<OptionId>>);

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip an option.
    ///
    /// For a single-choice ballot the selection becomes exactly `option_id`.
    /// For a multiple-choice ballot the option is added if absent and removed
    /// otherwise. No cap is enforced here; callers refuse disabled options
    /// (see [`Selections::is_disabled`]) before toggling.
    pub fn toggle(&mut self, ballot_id: &str, option_id: &str, is_multiple: bool) {
        let current = self.0.entry(ballot_id.to_string()).or_default();
        if !is_multiple {
            current.clear();
            current.push(option_id.to_string());
        } else if let Some(index) = current.iter().position(|id| id == option_id) {
            current.remove(index);
        } else {
            current.push(option_id.to_string());
        }
    }

    pub fn get(&self, ballot_id: &str) -> &[OptionId] {
        self.0.get(ballot_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_selected(&self, ballot_id: &str, option_id: &str) -> bool {
        self.get(ballot_id).iter().any(|id| id == option_id)
    }

    /// An unselected option of a capped ballot that is already at its cap
    /// cannot be picked. Deselecting is always possible.
    pub fn is_disabled(&self, ballot: &Ballot, option_id: &str) -> bool {
        match ballot.max_selections() {
            Some(max) => {
                !self.is_selected(&ballot.id, option_id) && self.get(&ballot.id).len() >= max
            }
            None => false,
        }
    }

    /// How many of the election's ballots have at least one selection.
    pub fn completed(&self, election: &Election) -> usize {
        election
            .ballots
            .iter()
            .filter(|ballot| !self.get(&ballot.id).is_empty())
            .count()
    }

    pub fn progress(&self, election: &Election) -> Progress {
        let total = election.ballots.len();
        let completed = self.completed(election);
        let percent = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Progress {
            completed,
            total,
            percent,
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
}

use thiserror::Error;

use crate::model::{
    election::{BallotId, BallotKind, Election},
    selection::Selections,
};

/// Why a set of selections cannot be submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Please make a selection for \"{title}\"")]
    Missing { ballot_id: BallotId, title: String },
    #[error("You can only select one option for \"{title}\"")]
    TooMany { ballot_id: BallotId, title: String },
    #[error("You can select at most {max} options for \"{title}\"")]
    ExceedsMax {
        ballot_id: BallotId,
        title: String,
        max: usize,
    },
}

/// Check every ballot in order, stopping at the first one that fails.
pub fn validate(election: &Election, selections: &Selections) -> Result<(), SelectionError> {
    for ballot in &election.ballots {
        let count = selections.get(&ballot.id).len();

        if count == 0 {
            return Err(SelectionError::Missing {
                ballot_id: ballot.id.clone(),
                title: ballot.title.clone(),
            });
        }

        if ballot.kind == BallotKind::Single && count > 1 {
            return Err(SelectionError::TooMany {
                ballot_id: ballot.id.clone(),
                title: ballot.title.clone(),
            });
        }

        if let Some(max) = ballot.max_selections() {
            if count > max {
                return Err(SelectionError::ExceedsMax {
                    ballot_id: ballot.id.clone(),
                    title: ballot.title.clone(),
                    max,
                });
            }
        }
    }
    Ok(())
}

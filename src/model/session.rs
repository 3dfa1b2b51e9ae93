use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::model::{
    election::{BallotId, Election, OptionId},
    notice::Notice,
    screen::{BallotView, Confirmation, Header, VotingScreen},
    selection::Selections,
    token::{VoterToken, INVALID_TOKEN_MESSAGE},
    validation::validate,
};
use crate::remote::{BallotVote, CastVotesRequest, RemoteError, TokenValidation};

const NO_BALLOTS_MESSAGE: &str = "No ballots available for this election.";
const NOTHING_SELECTED_MESSAGE: &str = "Please make at least one selection";
const CAST_FAILED_MESSAGE: &str = "Failed to submit vote";

/// Where a voter is in the submission sequence once past the token gate.
///
/// Ballot validation runs synchronously between `Idle` and `Confirming`; a
/// failure leaves the session in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Confirming,
    Submitting,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Gate {
    Locked {
        validating: bool,
        error: Option<String>,
    },
    Open(VoterToken),
}

/// One voter's visit to one election's voting page.
#[derive(Debug, Clone)]
pub struct VotingSession {
    election: Election,
    gate: Gate,
    selections: Selections,
    phase: Phase,
    notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("A voter token is required first")]
    Locked,
    #[error("The voter token was already accepted")]
    AlreadyUnlocked,
    #[error("Another request for this session is still in progress")]
    Busy,
    #[error("This session has already voted")]
    AlreadyVoted,
    #[error("Nothing is waiting for confirmation")]
    NotConfirming,
    #[error("The selection cannot change while confirming")]
    Confirming,
    #[error("This election has no ballots")]
    NoBallots,
    #[error("Unknown ballot '{0}'")]
    UnknownBallot(BallotId),
    #[error("Unknown option '{option}' for ballot '{ballot}'")]
    UnknownOption { ballot: BallotId, option: OptionId },
    #[error("Option '{option}' cannot be selected: ballot '{ballot}' is at its limit")]
    OptionDisabled { ballot: BallotId, option: OptionId },
}

impl VotingSession {
    /// A fresh session: locked, nothing selected.
    pub fn new(election: Election) -> Self {
        Self {
            election,
            gate: Gate::Locked {
                validating: false,
                error: None,
            },
            selections: Selections::new(),
            phase: Phase::Idle,
            notice: None,
        }
    }

    pub fn election(&self) -> &Election {
        &self.election
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self.gate, Gate::Open(_))
    }

    /// Start checking a token.
    ///
    /// Returns `Ok(None)` if the token was refused locally, in which case the
    /// gate carries the error and no remote call should be made.
    pub fn begin_token_validation(&mut self, raw: &str) -> Result<Option<VoterToken>, SessionError> {
        let error = match &mut self.gate {
            Gate::Open(_) => return Err(SessionError::AlreadyUnlocked),
            Gate::Locked {
                validating: true, ..
            } => return Err(SessionError::Busy),
            Gate::Locked { validating, error } => {
                match VoterToken::parse(raw) {
                    Ok(token) => {
                        *validating = true;
                        *error = None;
                        return Ok(Some(token));
                    }
                    Err(e) => {
                        *error = Some(e.to_string());
                        e
                    }
                }
            }
        };
        debug!("Refused token locally: {error}");
        Ok(None)
    }

    /// Apply the remote verdict on a token started by
    /// [`VotingSession::begin_token_validation`].
    pub fn finish_token_validation(
        &mut self,
        token: VoterToken,
        outcome: Result<TokenValidation, RemoteError>,
    ) {
        let message = match outcome {
            Ok(validation) if validation.is_success() => {
                info!("Voter token {token} accepted for election {}", self.election.id);
                self.gate = Gate::Open(token);
                self.notice = Some(Notice::success("Token validated successfully"));
                return;
            }
            Ok(validation) => {
                warn!("Unexpected token validation status '{}'", validation.status);
                INVALID_TOKEN_MESSAGE.to_string()
            }
            Err(e) => {
                let reason = e.rejection_reason();
                info!("Voter token {token} refused ({reason:?}): {e}");
                let message = reason.message().to_string();
                self.notice = Some(Notice::error(message.clone()));
                message
            }
        };
        self.gate = Gate::Locked {
            validating: false,
            error: Some(message),
        };
    }

    /// Forget a token check whose verdict will never arrive.
    pub fn abandon_token_validation(&mut self) {
        if let Gate::Locked { validating, .. } = &mut self.gate {
            *validating = false;
        }
    }

    /// Flip one option, refusing anything the screen shows as unavailable.
    pub fn toggle(&mut self, ballot_id: &str, option_id: &str) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let ballot = self
            .election
            .ballot(ballot_id)
            .ok_or_else(|| SessionError::UnknownBallot(ballot_id.to_string()))?;
        if ballot.option(option_id).is_none() {
            return Err(SessionError::UnknownOption {
                ballot: ballot_id.to_string(),
                option: option_id.to_string(),
            });
        }
        if self.selections.is_disabled(ballot, option_id) {
            return Err(SessionError::OptionDisabled {
                ballot: ballot_id.to_string(),
                option: option_id.to_string(),
            });
        }
        self.selections
            .toggle(ballot_id, option_id, ballot.is_multiple());
        Ok(())
    }

    /// Submit pressed: validate and, if everything is filled in, open the
    /// confirmation step. A validation failure is reported as a notice.
    pub fn request_submit(&mut self) -> Result<(), SessionError> {
        self.ensure_editable()?;
        match validate(&self.election, &self.selections) {
            Ok(()) => self.phase = Phase::Confirming,
            Err(e) => {
                debug!("Submission blocked: {e}");
                self.notice = Some(Notice::error(e.to_string()));
            }
        }
        Ok(())
    }

    /// Close the confirmation step without casting.
    pub fn cancel_confirmation(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Confirming => {
                self.phase = Phase::Idle;
                Ok(())
            }
            Phase::Submitting => Err(SessionError::Busy),
            Phase::Done => Err(SessionError::AlreadyVoted),
            Phase::Idle => Err(SessionError::NotConfirming),
        }
    }

    /// The voter confirmed: build the batch and move to `Submitting`.
    ///
    /// Returns `Ok(None)` if there turned out to be nothing to cast.
    pub fn begin_cast(&mut self) -> Result<Option<CastVotesRequest>, SessionError> {
        let token = match &self.gate {
            Gate::Open(token) => token.as_str().to_string(),
            Gate::Locked { .. } => return Err(SessionError::Locked),
        };
        match self.phase {
            Phase::Confirming => {}
            Phase::Submitting => return Err(SessionError::Busy),
            Phase::Done => return Err(SessionError::AlreadyVoted),
            Phase::Idle => return Err(SessionError::NotConfirming),
        }

        let ballots: Vec<BallotVote> = self
            .election
            .ballots
            .iter()
            .filter(|ballot| !self.selections.get(&ballot.id).is_empty())
            .map(|ballot| BallotVote {
                ballot_id: ballot.id.clone(),
                option_ids: self.selections.get(&ballot.id).to_vec(),
            })
            .collect();

        if ballots.is_empty() {
            self.phase = Phase::Idle;
            self.notice = Some(Notice::error(NOTHING_SELECTED_MESSAGE));
            return Ok(None);
        }

        self.phase = Phase::Submitting;
        Ok(Some(CastVotesRequest {
            token,
            election_id: self.election.id.clone(),
            ballots,
        }))
    }

    /// Apply the outcome of the cast started by [`VotingSession::begin_cast`].
    pub fn finish_cast(&mut self, outcome: Result<(), RemoteError>) {
        match outcome {
            Ok(()) => {
                info!("Vote recorded for election {}", self.election.id);
                self.phase = Phase::Done;
                self.selections.clear();
                self.notice = Some(Notice::success("Your vote has been recorded successfully!"));
            }
            Err(e) => {
                warn!("Failed to cast vote for election {}: {e}", self.election.id);
                // Token and selections stay so the voter can simply retry.
                self.phase = Phase::Idle;
                self.notice = Some(Notice::error(e.user_message(CAST_FAILED_MESSAGE)));
            }
        }
    }

    /// Give up on a cast whose outcome will never arrive. The selections are
    /// kept; if the vote did land, the API refuses the retry.
    pub fn abandon_cast(&mut self) {
        if self.phase == Phase::Submitting {
            warn!("Cast for election {} abandoned mid-call", self.election.id);
            self.phase = Phase::Idle;
        }
    }

    /// Render the current screen. Any pending notice is consumed.
    pub fn screen(&mut self) -> VotingScreen {
        let header = Header::from(&self.election);
        let notice = self.notice.take();

        if let Gate::Locked { validating, error } = &self.gate {
            return VotingScreen::TokenGate {
                header,
                validating: *validating,
                error: error.clone(),
                notice,
            };
        }

        if self.election.ballots.is_empty() {
            return VotingScreen::NoBallots {
                header,
                message: NO_BALLOTS_MESSAGE.to_string(),
            };
        }

        if self.phase == Phase::Done {
            return VotingScreen::Voted {
                header,
                title: "Vote Submitted Successfully!".to_string(),
                message: "Your vote has been recorded. This token can no longer be used to vote."
                    .to_string(),
                notice,
            };
        }

        let progress =
            (self.election.ballots.len() > 1).then(|| self.selections.progress(&self.election));
        let ballots = self
            .election
            .ballots
            .iter()
            .map(|ballot| BallotView::new(ballot, &self.selections))
            .collect();
        let confirmation = (self.phase == Phase::Confirming)
            .then(|| Confirmation::new(&self.election, &self.selections));

        VotingScreen::Ballots {
            header,
            progress,
            ballots,
            submitting: self.phase == Phase::Submitting,
            confirmation,
            notice,
        }
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        if !self.is_unlocked() {
            return Err(SessionError::Locked);
        }
        if self.election.ballots.is_empty() {
            return Err(SessionError::NoBallots);
        }
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Confirming => Err(SessionError::Confirming),
            Phase::Submitting => Err(SessionError::Busy),
            Phase::Done => Err(SessionError::AlreadyVoted),
        }
    }
}

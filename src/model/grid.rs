use chrono::{DateTime, Utc};
use log::{info, warn};
use rocket::request::FromParam;
use serde::Serialize;
use thiserror::Error;

use crate::model::{
    election::{Election, ElectionId, ElectionPatch, ElectionStatus},
    notice::Notice,
};
use crate::remote::RemoteError;

/// Card actions that ask for confirmation before touching the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DialogKind {
    Edit,
    Delete,
    ConvertToDraft,
}

impl DialogKind {
    fn success_message(self) -> &'static str {
        match self {
            Self::Edit => "Election updated successfully!",
            Self::Delete => "Election deleted successfully!",
            Self::ConvertToDraft => "Election converted to draft successfully!",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Self::Edit => "Failed to update election",
            Self::Delete => "Failed to delete election",
            Self::ConvertToDraft => "Failed to convert to draft",
        }
    }
}

impl<'a> FromParam<'a> for DialogKind {
    type Error = &'a str;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        match param {
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            "convert-to-draft" => Ok(Self::ConvertToDraft),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardAction {
    Edit,
    Delete,
    ConvertToDraft,
    Publish,
}

impl From<DialogKind> for CardAction {
    fn from(kind: DialogKind) -> Self {
        match kind {
            DialogKind::Edit => Self::Edit,
            DialogKind::Delete => Self::Delete,
            DialogKind::ConvertToDraft => Self::ConvertToDraft,
        }
    }
}

/// Publish is offered on drafts, convert-to-draft on published elections.
fn card_actions(status: ElectionStatus) -> Vec<CardAction> {
    let mut actions = vec![CardAction::Edit, CardAction::Delete];
    match status {
        ElectionStatus::Draft => actions.push(CardAction::Publish),
        ElectionStatus::Published => actions.push(CardAction::ConvertToDraft),
        ElectionStatus::Closed => {}
    }
    actions
}

/// An open confirmation dialog and the election it is about.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Dialog {
    kind: DialogKind,
    election: Election,
    busy: bool,
}

/// A confirmed dialog action, ready to be sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Edit {
        election_id: ElectionId,
        patch: ElectionPatch,
    },
    Delete {
        election_id: ElectionId,
    },
    ConvertToDraft {
        election_id: ElectionId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Election '{0}' is not in the list")]
    UnknownElection(ElectionId),
    #[error("A dialog is already open")]
    DialogOpen,
    #[error("No dialog is open")]
    NoDialog,
    #[error("The dialog action is still in progress")]
    Busy,
    #[error("Editing needs the changed fields")]
    MissingPatch,
    #[error("Cannot {action:?} election '{election_id}' while it is {status:?}")]
    ActionUnavailable {
        election_id: ElectionId,
        action: CardAction,
        status: ElectionStatus,
    },
}

/// The admin's list of election cards plus the at-most-one open dialog.
#[derive(Debug, Clone, Default)]
pub struct ElectionsGrid {
    elections: Vec<Election>,
    dialog: Option<Dialog>,
    notice: Option<Notice>,
}

impl ElectionsGrid {
    pub fn new(elections: Vec<Election>) -> Self {
        Self {
            elections,
            dialog: None,
            notice: None,
        }
    }

    /// Replace the local copy with a fresh list from the server.
    ///
    /// An idle dialog whose election has disappeared is closed.
    pub fn refresh(&mut self, elections: Vec<Election>) {
        self.elections = elections;
        if let Some(dialog) = &self.dialog {
            let still_listed = self.elections.iter().any(|e| e.id == dialog.election.id);
            if !dialog.busy && !still_listed {
                self.dialog = None;
            }
        }
    }

    fn find(&self, election_id: &str) -> Result<&Election, GridError> {
        self.elections
            .iter()
            .find(|e| e.id == election_id)
            .ok_or_else(|| GridError::UnknownElection(election_id.to_string()))
    }

    /// Find a listed election whose card currently offers `action`.
    fn find_for(&self, election_id: &str, action: CardAction) -> Result<&Election, GridError> {
        let election = self.find(election_id)?;
        if card_actions(election.status).contains(&action) {
            Ok(election)
        } else {
            Err(GridError::ActionUnavailable {
                election_id: election.id.clone(),
                action,
                status: election.status,
            })
        }
    }

    /// Select an election and open a dialog for it in one step. The dialog
    /// only opens once the election is known to be in the list.
    pub fn open_dialog(&mut self, kind: DialogKind, election_id: &str) -> Result<(), GridError> {
        if self.dialog.is_some() {
            return Err(GridError::DialogOpen);
        }
        let election = self.find_for(election_id, kind.into())?.clone();
        self.dialog = Some(Dialog {
            kind,
            election,
            busy: false,
        });
        Ok(())
    }

    pub fn cancel_dialog(&mut self) -> Result<(), GridError> {
        match &self.dialog {
            None => Err(GridError::NoDialog),
            Some(dialog) if dialog.busy => Err(GridError::Busy),
            Some(_) => {
                self.dialog = None;
                Ok(())
            }
        }
    }

    /// Mark the open dialog busy and hand back the action to perform.
    pub fn begin_confirm(
        &mut self,
        patch: Option<ElectionPatch>,
    ) -> Result<PendingAction, GridError> {
        let dialog = self.dialog.as_mut().ok_or(GridError::NoDialog)?;
        if dialog.busy {
            return Err(GridError::Busy);
        }
        let election_id = dialog.election.id.clone();
        let action = match dialog.kind {
            DialogKind::Edit => PendingAction::Edit {
                election_id,
                patch: patch.ok_or(GridError::MissingPatch)?,
            },
            DialogKind::Delete => PendingAction::Delete { election_id },
            DialogKind::ConvertToDraft => PendingAction::ConvertToDraft { election_id },
        };
        dialog.busy = true;
        Ok(action)
    }

    /// Close the dialog on success; keep it open and report on failure.
    pub fn finish_confirm(&mut self, outcome: Result<(), RemoteError>) {
        let Some(dialog) = self.dialog.as_mut() else {
            return;
        };
        let kind = dialog.kind;
        match outcome {
            Ok(()) => {
                info!("{kind:?} succeeded for election {}", dialog.election.id);
                self.dialog = None;
                self.notice = Some(Notice::success(kind.success_message()));
            }
            Err(e) => {
                warn!("{kind:?} failed for election {}: {e}", dialog.election.id);
                dialog.busy = false;
                self.notice = Some(Notice::error(e.user_message(kind.failure_message())));
            }
        }
    }

    /// Re-enable a dialog whose action will never report back.
    pub fn abandon_confirm(&mut self) {
        if let Some(dialog) = self.dialog.as_mut() {
            dialog.busy = false;
        }
    }

    /// Publishing needs no dialog, only an election that is on the list.
    pub fn publish_target(&self, election_id: &str) -> Result<ElectionId, GridError> {
        Ok(self.find_for(election_id, CardAction::Publish)?.id.clone())
    }

    pub fn finish_publish(&mut self, election_id: &str, outcome: Result<(), RemoteError>) {
        self.notice = Some(match outcome {
            Ok(()) => {
                info!("Published election {election_id}");
                Notice::success("Election published successfully!")
            }
            Err(e) => {
                warn!("Failed to publish election {election_id}: {e}");
                Notice::error(e.user_message("Failed to publish election"))
            }
        });
    }

    /// Render the grid. Any pending notice is consumed.
    pub fn view(&mut self) -> GridView {
        GridView {
            cards: self.elections.iter().map(CardView::from).collect(),
            dialog: self.dialog.as_ref().map(|dialog| DialogView {
                kind: dialog.kind,
                election_id: dialog.election.id.clone(),
                election_title: dialog.election.title.clone(),
                busy: dialog.busy,
            }),
            notice: self.notice.take(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridView {
    pub cards: Vec<CardView>,
    pub dialog: Option<DialogView>,
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: ElectionId,
    pub title: String,
    pub description: Option<String>,
    pub status: ElectionStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub ballot_count: usize,
    pub actions: Vec<CardAction>,
}

impl From<&Election> for CardView {
    fn from(election: &Election) -> Self {
        Self {
            id: election.id.clone(),
            title: election.title.clone(),
            description: election.description.clone(),
            status: election.status,
            start_date: election.start_date,
            end_date: election.end_date,
            ballot_count: election.ballots.len(),
            actions: card_actions(election.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogView {
    pub kind: DialogKind,
    pub election_id: ElectionId,
    pub election_title: String,
    /// Confirm and cancel are disabled while busy.
    pub busy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> ElectionsGrid {
        ElectionsGrid::new(vec![Election::example(), Election::draft_example()])
    }

    #[test]
    fn dialog_needs_listed_election() {
        let mut grid = grid();
        assert_eq!(
            grid.open_dialog(DialogKind::Delete, "nope"),
            Err(GridError::UnknownElection("nope".to_string()))
        );
        assert_eq!(grid.view().dialog, None);

        grid.open_dialog(DialogKind::Delete, "e2").unwrap();
        let dialog = grid.view().dialog.unwrap();
        assert_eq!(dialog.kind, DialogKind::Delete);
        assert_eq!(dialog.election_title, "Sports Captain");
        assert!(!dialog.busy);
    }

    #[test]
    fn one_dialog_at_a_time() {
        let mut grid = grid();
        grid.open_dialog(DialogKind::Edit, "e1").unwrap();
        assert_eq!(
            grid.open_dialog(DialogKind::Delete, "e2"),
            Err(GridError::DialogOpen)
        );
        grid.cancel_dialog().unwrap();
        grid.open_dialog(DialogKind::Delete, "e2").unwrap();
    }

    #[test]
    fn edit_requires_patch() {
        let mut grid = grid();
        grid.open_dialog(DialogKind::Edit, "e1").unwrap();
        assert_eq!(grid.begin_confirm(None), Err(GridError::MissingPatch));
        // Still usable afterwards.
        let patch = ElectionPatch {
            title: Some("New".to_string()),
            ..Default::default()
        };
        assert_eq!(
            grid.begin_confirm(Some(patch.clone())),
            Ok(PendingAction::Edit {
                election_id: "e1".to_string(),
                patch,
            })
        );
    }

    #[test]
    fn busy_dialog_cannot_be_dismissed() {
        let mut grid = grid();
        grid.open_dialog(DialogKind::ConvertToDraft, "e1").unwrap();
        grid.begin_confirm(None).unwrap();
        assert_eq!(grid.cancel_dialog(), Err(GridError::Busy));
        assert_eq!(grid.begin_confirm(None), Err(GridError::Busy));
        assert!(grid.view().dialog.unwrap().busy);
    }

    #[test]
    fn abandoned_action_unlocks_dialog() {
        let mut grid = grid();
        grid.open_dialog(DialogKind::Delete, "e2").unwrap();
        grid.begin_confirm(None).unwrap();
        grid.abandon_confirm();

        assert!(!grid.view().dialog.unwrap().busy);
        grid.cancel_dialog().unwrap();
    }

    #[test]
    fn failure_keeps_dialog_open() {
        let mut grid = grid();
        grid.open_dialog(DialogKind::ConvertToDraft, "e1").unwrap();
        grid.begin_confirm(None).unwrap();
        grid.finish_confirm(Err(RemoteError::rejected(500, None, None)));

        let view = grid.view();
        assert_eq!(view.notice, Some(Notice::error("Failed to convert to draft")));
        assert!(!view.dialog.unwrap().busy);
    }

    #[test]
    fn success_closes_dialog() {
        let mut grid = grid();
        grid.open_dialog(DialogKind::Delete, "e2").unwrap();
        grid.begin_confirm(None).unwrap();
        grid.finish_confirm(Ok(()));

        let view = grid.view();
        assert_eq!(view.dialog, None);
        assert_eq!(view.notice, Some(Notice::success("Election deleted successfully!")));
        // Notices are shown once.
        assert_eq!(grid.view().notice, None);
    }

    #[test]
    fn refresh_drops_stale_idle_dialog() {
        let mut grid = grid();
        grid.open_dialog(DialogKind::Edit, "e2").unwrap();
        grid.refresh(vec![Election::example()]);
        assert_eq!(grid.view().dialog, None);
    }

    #[test]
    fn publish_failure_uses_server_message() {
        let mut grid = grid();
        assert_eq!(grid.publish_target("e2"), Ok("e2".to_string()));
        grid.finish_publish("e2", Err(RemoteError::rejected(422, Some("Add a ballot first"), None)));
        assert_eq!(grid.view().notice, Some(Notice::error("Add a ballot first")));
    }

    #[test]
    fn card_actions_follow_status() {
        let view = grid().view();
        assert_eq!(
            view.cards[0].actions,
            [CardAction::Edit, CardAction::Delete, CardAction::ConvertToDraft]
        );
        assert_eq!(
            view.cards[1].actions,
            [CardAction::Edit, CardAction::Delete, CardAction::Publish]
        );
    }

    #[test]
    fn unavailable_actions_are_refused() {
        let mut grid = grid();
        assert_eq!(
            grid.publish_target("e1"),
            Err(GridError::ActionUnavailable {
                election_id: "e1".to_string(),
                action: CardAction::Publish,
                status: ElectionStatus::Published,
            })
        );
        assert_eq!(
            grid.open_dialog(DialogKind::ConvertToDraft, "e2"),
            Err(GridError::ActionUnavailable {
                election_id: "e2".to_string(),
                action: CardAction::ConvertToDraft,
                status: ElectionStatus::Draft,
            })
        );
        assert_eq!(grid.view().dialog, None);

        // Closed elections can only be edited or deleted.
        let mut closed = Election::example();
        closed.status = ElectionStatus::Closed;
        let mut grid = ElectionsGrid::new(vec![closed]);
        assert!(grid.publish_target("e1").is_err());
        assert!(grid.open_dialog(DialogKind::ConvertToDraft, "e1").is_err());
        grid.open_dialog(DialogKind::Delete, "e1").unwrap();
    }

    #[test]
    fn dialog_kind_params() {
        assert_eq!(DialogKind::from_param("convert-to-draft"), Ok(DialogKind::ConvertToDraft));
        assert_eq!(DialogKind::from_param("publish"), Err("publish"));
    }
}

use log::{error, warn};
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::model::{grid::GridError, session::SessionError};
use crate::remote::RemoteError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl AsRef<str>) -> Self {
        Self::Status(Status::NotFound, format!("{} not found", what.as_ref()))
    }

    pub fn session_expired() -> Self {
        Self::Status(
            Status::Unauthorized,
            "Session expired, please reload the page".to_string(),
        )
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Remote(e) if e.is_not_found() => Status::NotFound,
            Self::Remote(_) => Status::BadGateway,
            Self::Session(e) => match e {
                SessionError::Locked => Status::Unauthorized,
                SessionError::UnknownBallot(_) | SessionError::UnknownOption { .. } => {
                    Status::NotFound
                }
                SessionError::OptionDisabled { .. } | SessionError::NoBallots => {
                    Status::UnprocessableEntity
                }
                SessionError::AlreadyUnlocked
                | SessionError::Busy
                | SessionError::AlreadyVoted
                | SessionError::NotConfirming
                | SessionError::Confirming => Status::Conflict,
            },
            Self::Grid(e) => match e {
                GridError::UnknownElection(_) => Status::NotFound,
                GridError::MissingPatch | GridError::ActionUnavailable { .. } => {
                    Status::UnprocessableEntity
                }
                GridError::DialogOpen | GridError::NoDialog | GridError::Busy => Status::Conflict,
            },
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        Err(status)
    }
}

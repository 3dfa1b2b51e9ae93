//! Per-visitor state kept on the server between requests.

mod cookie;
mod store;

pub use cookie::{SessionCookie, SessionCookieError, SessionKind};
pub use store::{ResetOnDrop, SessionId, SessionStore};

use crate::model::{dashboard::DashboardSession, session::VotingSession};

pub const VOTING_SESSION_COOKIE: &str = "voting_session";
pub const DASHBOARD_SESSION_COOKIE: &str = "dashboard_session";

impl SessionKind for VotingSession {
    const COOKIE: &'static str = VOTING_SESSION_COOKIE;
}

impl SessionKind for DashboardSession {
    const COOKIE: &'static str = DASHBOARD_SESSION_COOKIE;
}

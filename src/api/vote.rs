use log::info;
use rocket::{http::CookieJar, serde::json::Json, Route, State};
use serde::Deserialize;

use crate::{
    config::Config,
    error::{Error, Result},
    model::{screen::VotingScreen, session::VotingSession},
    remote::{ElectionApi, ValidateTokenRequest},
    session::{SessionCookie, SessionStore},
};

type Sessions = SessionStore<VotingSession>;
type VoterKey = SessionCookie<VotingSession>;

pub fn routes() -> Vec<Route> {
    routes![mount, validate_token, ballots, toggle, submit, cancel, confirm]
}

/// Run `f` against the caller's voting session.
fn with_session<R>(
    sessions: &Sessions,
    key: &VoterKey,
    f: impl FnOnce(&mut VotingSession) -> R,
) -> Result<R> {
    sessions.with(&key.id, f).ok_or_else(Error::session_expired)
}

fn screen(sessions: &Sessions, key: &VoterKey) -> Result<Json<VotingScreen>> {
    with_session(sessions, key, VotingSession::screen).map(Json)
}

/// Opening the voting page always starts a fresh, locked session.
#[get("/vote/<slug>")]
async fn mount(
    slug: &str,
    previous: Option<VoterKey>,
    cookies: &CookieJar<'_>,
    api: &State<Box<dyn ElectionApi>>,
    sessions: &State<Sessions>,
    config: &State<Config>,
) -> Result<Json<VotingScreen>> {
    if let Some(previous) = previous {
        sessions.remove(&previous.id);
    }

    let election = api.election_by_slug(slug).await?;
    let mut session = VotingSession::new(election);
    let screen = session.screen();

    let id = sessions.insert(session);
    info!("Started voting session {id} for '{slug}'");
    cookies.add_private(VoterKey::new(id, slug).into_cookie(config));

    Ok(Json(screen))
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    token: String,
}

#[post("/vote/<slug>/token", data = "<request>", format = "json")]
async fn validate_token(
    slug: &str,
    request: Json<TokenRequest>,
    key: VoterKey,
    api: &State<Box<dyn ElectionApi>>,
    sessions: &State<Sessions>,
) -> Result<Json<VotingScreen>> {
    key.ensure_scope(slug)?;

    let pending = with_session(sessions, &key, |session| {
        session
            .begin_token_validation(&request.token)
            .map(|token| token.map(|token| (token, session.election().id.clone())))
    })??;

    if let Some((token, election_id)) = pending {
        let guard = sessions.reset_on_drop(&key.id, VotingSession::abandon_token_validation);
        let outcome = api
            .validate_token(&ValidateTokenRequest::new(&token, &election_id))
            .await;
        guard.disarm();
        with_session(sessions, &key, |session| {
            session.finish_token_validation(token, outcome)
        })?;
    }

    screen(sessions, &key)
}

#[get("/vote/<slug>/ballots")]
async fn ballots(slug: &str, key: VoterKey, sessions: &State<Sessions>) -> Result<Json<VotingScreen>> {
    key.ensure_scope(slug)?;
    screen(sessions, &key)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleRequest {
    ballot_id: String,
    option_id: String,
}

#[post("/vote/<slug>/selections", data = "<request>", format = "json")]
async fn toggle(
    slug: &str,
    request: Json<ToggleRequest>,
    key: VoterKey,
    sessions: &State<Sessions>,
) -> Result<Json<VotingScreen>> {
    key.ensure_scope(slug)?;
    with_session(sessions, &key, |session| {
        session.toggle(&request.ballot_id, &request.option_id)
    })??;
    screen(sessions, &key)
}

#[post("/vote/<slug>/submit")]
async fn submit(slug: &str, key: VoterKey, sessions: &State<Sessions>) -> Result<Json<VotingScreen>> {
    key.ensure_scope(slug)?;
    with_session(sessions, &key, VotingSession::request_submit)??;
    screen(sessions, &key)
}

#[post("/vote/<slug>/cancel")]
async fn cancel(slug: &str, key: VoterKey, sessions: &State<Sessions>) -> Result<Json<VotingScreen>> {
    key.ensure_scope(slug)?;
    with_session(sessions, &key, VotingSession::cancel_confirmation)??;
    screen(sessions, &key)
}

#[post("/vote/<slug>/confirm")]
async fn confirm(
    slug: &str,
    key: VoterKey,
    api: &State<Box<dyn ElectionApi>>,
    sessions: &State<Sessions>,
) -> Result<Json<VotingScreen>> {
    key.ensure_scope(slug)?;

    let request = with_session(sessions, &key, VotingSession::begin_cast)??;
    if let Some(request) = request {
        let guard = sessions.reset_on_drop(&key.id, VotingSession::abandon_cast);
        let outcome = api.cast_votes(&request).await;
        guard.disarm();
        with_session(sessions, &key, |session| session.finish_cast(outcome))?;
    }

    screen(sessions, &key)
}

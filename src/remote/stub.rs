use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::model::election::{Election, ElectionPatch, ElectionStatus};

use super::{
    CastVotesRequest, ElectionApi, ErrorBody, RemoteError, TokenValidation, ValidateTokenRequest,
};

pub const VALID_TOKEN: &str = "VALID-TOKEN";
pub const USED_TOKEN: &str = "USED-TOKEN";
pub const EXPIRED_TOKEN: &str = "EXPIRED-TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Fresh,
    Used,
    Expired,
}

/// An in-memory election API for route tests.
///
/// Clones share state, so a test can keep one handle while the server owns another.
#[derive(Clone, Default)]
pub struct StubApi {
    state: Arc<Mutex<StubState>>,
}

#[derive(Default)]
struct StubState {
    elections: Vec<Election>,
    tokens: HashMap<String, TokenState>,
    casts: Vec<CastVotesRequest>,
    calls: Vec<String>,
    next_failure: Option<ErrorBody>,
}

impl StubApi {
    /// The example elections plus one token in each state.
    pub fn seeded() -> Self {
        let stub = Self::default();
        {
            let mut state = stub.lock();
            state.elections = vec![
                Election::example(),
                Election::draft_example(),
                Election::empty_example(),
            ];
            state.tokens.insert(VALID_TOKEN.to_string(), TokenState::Fresh);
            state.tokens.insert(USED_TOKEN.to_string(), TokenState::Used);
            state.tokens.insert(EXPIRED_TOKEN.to_string(), TokenState::Expired);
        }
        stub
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }

    /// Make the next cast or election mutation fail with the given message.
    pub fn fail_next(&self, message: Option<&str>) {
        self.lock().next_failure = Some(ErrorBody {
            message: message.map(str::to_string),
            reason: None,
        });
    }

    pub fn casts(&self) -> Vec<CastVotesRequest> {
        self.lock().casts.clone()
    }

    /// Names of the calls made so far, e.g. `publish:e2`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn election(&self, election_id: &str) -> Option<Election> {
        self.lock()
            .elections
            .iter()
            .find(|e| e.id == election_id)
            .cloned()
    }

    fn record(&self, call: String) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.next_failure.take() {
            Some(body) => Err(RemoteError::Rejected { status: 500, body }),
            None => Ok(()),
        }
    }

    fn update(
        &self,
        election_id: &str,
        f: impl FnOnce(&mut Election),
    ) -> Result<(), RemoteError> {
        let mut state = self.lock();
        let election = state
            .elections
            .iter_mut()
            .find(|e| e.id == election_id)
            .ok_or_else(|| RemoteError::rejected(404, Some("Election not found"), None))?;
        f(election);
        Ok(())
    }
}

#[rocket::async_trait]
impl ElectionApi for StubApi {
    async fn validate_token(
        &self,
        request: &ValidateTokenRequest,
    ) -> Result<TokenValidation, RemoteError> {
        let mut state = self.lock();
        state.calls.push(format!("validate:{}", request.election_id));
        match state.tokens.get(&request.token) {
            Some(TokenState::Fresh) => Ok(TokenValidation::success()),
            Some(TokenState::Used) => Err(RemoteError::rejected(401, None, Some("used"))),
            Some(TokenState::Expired) => Err(RemoteError::rejected(401, None, Some("expired"))),
            None => Err(RemoteError::rejected(401, None, Some("invalid"))),
        }
    }

    async fn cast_votes(&self, request: &CastVotesRequest) -> Result<(), RemoteError> {
        self.record(format!("cast:{}", request.election_id))?;
        let mut state = self.lock();
        match state.tokens.get(&request.token) {
            Some(TokenState::Fresh) => {}
            _ => {
                return Err(RemoteError::rejected(
                    403,
                    Some("Token is not valid for voting"),
                    Some("used"),
                ))
            }
        }
        state.tokens.insert(request.token.clone(), TokenState::Used);
        state.casts.push(request.clone());
        Ok(())
    }

    async fn election_by_slug(&self, slug: &str) -> Result<Election, RemoteError> {
        let mut state = self.lock();
        state.calls.push(format!("election:{slug}"));
        state
            .elections
            .iter()
            .find(|e| e.slug == slug)
            .cloned()
            .ok_or_else(|| RemoteError::rejected(404, Some("Election not found"), None))
    }

    async fn list_elections(&self) -> Result<Vec<Election>, RemoteError> {
        let mut state = self.lock();
        state.calls.push("list".to_string());
        Ok(state.elections.clone())
    }

    async fn publish(&self, election_id: &str) -> Result<(), RemoteError> {
        self.record(format!("publish:{election_id}"))?;
        self.update(election_id, |e| e.status = ElectionStatus::Published)
    }

    async fn convert_to_draft(&self, election_id: &str) -> Result<(), RemoteError> {
        self.record(format!("convert-to-draft:{election_id}"))?;
        self.update(election_id, |e| e.status = ElectionStatus::Draft)
    }

    async fn delete(&self, election_id: &str) -> Result<(), RemoteError> {
        self.record(format!("delete:{election_id}"))?;
        let mut state = self.lock();
        let before = state.elections.len();
        state.elections.retain(|e| e.id != election_id);
        if state.elections.len() == before {
            return Err(RemoteError::rejected(404, Some("Election not found"), None));
        }
        Ok(())
    }

    async fn edit(&self, election_id: &str, patch: &ElectionPatch) -> Result<(), RemoteError> {
        self.record(format!("edit:{election_id}"))?;
        self.update(election_id, |e| patch.apply(e))
    }
}

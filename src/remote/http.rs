use std::time::Duration;

use log::debug;
use reqwest::{Client, Response};

use crate::model::election::{Election, ElectionPatch};

use super::{
    CastVotesRequest, ElectionApi, ErrorBody, RemoteError, TokenValidation, ValidateTokenRequest,
};

/// [`ElectionApi`] over HTTP+JSON.
pub struct HttpElectionApi {
    base_url: String,
    http: Client,
}

impl HttpElectionApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ballot-portal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn any non-2xx response into [`RemoteError::Rejected`], keeping the body
    /// if it parses.
    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        debug!("Election API rejected request with {status}: {body:?}");
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[rocket::async_trait]
impl ElectionApi for HttpElectionApi {
    async fn validate_token(
        &self,
        request: &ValidateTokenRequest,
    ) -> Result<TokenValidation, RemoteError> {
        let response = self
            .http
            .post(self.url("votes/validate"))
            .json(request)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn cast_votes(&self, request: &CastVotesRequest) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.url("votes/cast-all"))
            .json(request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn election_by_slug(&self, slug: &str) -> Result<Election, RemoteError> {
        let response = self
            .http
            .get(self.url(&format!("elections/slug/{slug}")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn list_elections(&self) -> Result<Vec<Election>, RemoteError> {
        let response = self.http.get(self.url("elections")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn publish(&self, election_id: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.url(&format!("elections/{election_id}/publish")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn convert_to_draft(&self, election_id: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.url(&format!("elections/{election_id}/convert-to-draft")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, election_id: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .delete(self.url(&format!("elections/{election_id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn edit(&self, election_id: &str, patch: &ElectionPatch) -> Result<(), RemoteError> {
        let response = self
            .http
            .patch(self.url(&format!("elections/{election_id}")))
            .json(patch)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

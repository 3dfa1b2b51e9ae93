use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{self, FromRequest},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::error::{Error, Result};

use super::store::SessionId;

/// A kind of server-side session that is tracked through its own cookie.
pub trait SessionKind: Send + Sync + 'static {
    const COOKIE: &'static str;
}

/// Points a client at its server-side session.
///
/// Travels as a signed JWT inside a private (encrypted) cookie, so clients
/// can neither read nor forge it. Every request that presents the cookie gets
/// a fresh one, so it expires after the same idle time as the session itself.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SessionCookie<S> {
    #[serde(rename = "sid")]
    pub id: SessionId,
    /// What the session belongs to, e.g. the slug of the election being voted in.
    #[serde(rename = "scp")]
    pub scope: String,
    #[serde(skip)]
    phantom: PhantomData<S>,
}

impl<S> SessionCookie<S>
where
    S: SessionKind,
{
    pub fn new(id: SessionId, scope: &str) -> Self {
        Self {
            id,
            scope: scope.to_string(),
            phantom: PhantomData,
        }
    }

    /// Serialize into a cookie, to be added with [`rocket::http::CookieJar::add_private`].
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            session: self,
            expire_at: Utc::now() + config.session_ttl(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(S::COOKIE, token)
            .path("/")
            .max_age(Duration::seconds(config.session_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> std::result::Result<Self, JwtError> {
        jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<S>>| claims.claims.session)
    }

    /// Refuse a session that belongs to some other page.
    pub fn ensure_scope(&self, scope: &str) -> Result<()> {
        if self.scope == scope {
            Ok(())
        } else {
            Err(Error::Status(
                Status::Unauthorized,
                format!("Session belongs to '{}', not '{scope}'", self.scope),
            ))
        }
    }
}

/// Cookie claims: the session pointer plus an expiry datetime.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
struct Claims<S> {
    #[serde(flatten)]
    session: SessionCookie<S>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, S> FromRequest<'r> for SessionCookie<S>
where
    S: SessionKind,
{
    type Error = SessionCookieError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        // Valid as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = try_outcome!(req
            .cookies()
            .get_private(S::COOKIE)
            .into_outcome((Status::Unauthorized, SessionCookieError::Missing(S::COOKIE))));

        let session = try_outcome!(Self::from_cookie(&cookie, config)
            .map_err(SessionCookieError::Jwt)
            .into_outcome(Status::Unauthorized));

        // Slide the cookie's expiry along with the server-side session.
        req.cookies()
            .add_private(Self::new(session.id.clone(), &session.scope).into_cookie(config));

        request::Outcome::Success(session)
    }
}

#[derive(Debug, Error)]
pub enum SessionCookieError {
    #[error("Missing `{0}` cookie")]
    Missing(&'static str),
    #[error(transparent)]
    Jwt(#[from] JwtError),
}

use log::debug;
use rocket::{
    http::Cookie,
    request::{FromRequest, Outcome},
    Request,
};
use time::Duration;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session_id";

/// Lifetime of the session cookie.
pub const SESSION_TTL: Duration = Duration::days(30);

/// The weak identity used to deduplicate votes: the caller's network origin
/// plus an opaque session token kept in a long-lived cookie.
///
/// This is a heuristic, not authentication. The two halves are deliberately
/// kept separate so that either one alone can block a repeat vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Client IP address, if Rocket could determine one.
    pub origin: Option<String>,
    pub session_token: String,
}

impl Identity {
    pub fn new(origin: impl Into<Option<String>>, session_token: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            session_token: session_token.into(),
        }
    }

    /// Does a vote cast with the given origin and session token belong to
    /// this identity? A match on either field is sufficient. An unknown origin
    /// never matches anything.
    pub fn matches(&self, origin: Option<&str>, session_token: &str) -> bool {
        let same_origin = match (self.origin.as_deref(), origin) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        };
        same_origin || self.session_token == session_token
    }
}

/// Build the cookie that persists a session token on the client.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .max_age(SESSION_TTL)
        .path("/")
        .http_only(true)
        .finish()
}

/// Resolve the caller's identity, minting a session token and setting the
/// cookie if the request did not carry one.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for Identity {
    type Error = (); // No errors possible.

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let origin = req.client_ip().map(|ip| ip.to_string());
        let cookies = req.cookies();

        let session_token = match cookies.get(SESSION_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
            _ => {
                let token = Uuid::new_v4().to_string();
                debug!("Issuing new session token to {origin:?}");
                cookies.add(session_cookie(token.clone()));
                token
            }
        };

        Outcome::Success(Identity {
            origin,
            session_token,
        })
    }
}

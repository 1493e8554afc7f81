//! Session context and authentication extractors.
//!
//! The visitor's bakery API token lives in the server-side session. It is
//! read once per request into a [`SessionContext`]; handlers never touch the
//! session key directly. A 401 from the API anywhere ends in
//! [`SessionContext::invalidate`].

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{Method, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use confeitaria_core::SessionToken;

use crate::models::{Notice, push_flash, session_keys};

/// Per-request view of the visitor's session.
///
/// Does not reject anonymous visitors; use [`RequireSession`] for pages that
/// need a token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(ctx: SessionContext) -> impl IntoResponse {
///     if ctx.is_logged_in() { "Welcome back!" } else { "Hello, guest!" }
/// }
/// ```
#[derive(Clone)]
pub struct SessionContext {
    session: Session,
    token: Option<SessionToken>,
}

impl SessionContext {
    /// The visitor's token, if logged in.
    #[must_use]
    pub const fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// The underlying session, for flash messages.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Drop the token after the API rejected it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn invalidate(&mut self) -> Result<(), tower_sessions::session::Error> {
        tracing::info!("Bakery API rejected session token; clearing it");
        self.token = None;
        clear_session_token(&self.session).await
    }
}

/// Error returned when a session is required but absent.
pub enum AuthRejection {
    /// Redirect to the login page, coming back to `next` afterwards.
    RedirectToLogin { next: String },
    /// The session layer is not installed.
    MissingSessionLayer,
    /// The session store failed.
    SessionStore,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::MissingSessionLayer | Self::SessionStore => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::MissingSessionLayer)?;

        let token = session
            .get::<SessionToken>(session_keys::SESSION_TOKEN)
            .await
            .map_err(|e| {
                tracing::error!("Failed to read session token: {e}");
                AuthRejection::SessionStore
            })?;

        Ok(Self { session, token })
    }
}

/// Extractor that requires a logged-in visitor.
///
/// Anonymous visitors get a "log in first" notice and a redirect to the
/// login page that returns them to the requested path.
pub struct RequireSession {
    pub session: Session,
    pub token: SessionToken,
}

impl RequireSession {
    /// Turn back into a [`SessionContext`], e.g. to invalidate it.
    #[must_use]
    pub fn into_context(self) -> SessionContext {
        SessionContext {
            session: self.session,
            token: Some(self.token),
        }
    }
}

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = SessionContext::from_request_parts(parts, state).await?;

        match ctx.token {
            Some(token) => Ok(Self {
                session: ctx.session,
                token,
            }),
            None => {
                push_flash(&ctx.session, Notice::LoginRequired)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to queue login notice: {e}");
                        AuthRejection::SessionStore
                    })?;
                Err(AuthRejection::RedirectToLogin {
                    next: return_path(parts),
                })
            }
        }
    }
}

/// Page to come back to after logging in.
///
/// Nested routers see a stripped `uri`, so the path is read from
/// [`OriginalUri`]. Form posts have no page of their own: a GET on their
/// path is a 405, so they return to the page that owns the form.
fn return_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);
    let path = uri.path();

    if parts.method == Method::GET || parts.method == Method::HEAD {
        return uri
            .path_and_query()
            .map_or_else(|| path.to_string(), ToString::to_string);
    }
    if path == "/cart" || path.starts_with("/cart/") {
        "/cart".to_string()
    } else {
        "/".to_string()
    }
}

/// Login page URL that returns to `next` after a successful login.
#[must_use]
pub fn login_url(next: &str) -> String {
    format!("/auth/login?next={}", urlencoding::encode(next))
}

/// Store the visitor's token after login.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_session_token(
    session: &Session,
    token: &SessionToken,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::SESSION_TOKEN, token).await
}

/// Clear the visitor's token (logout or rejection).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_session_token(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<SessionToken>(session_keys::SESSION_TOKEN)
        .await?;
    Ok(())
}

//! Authentication route handlers.
//!
//! Credentials are exchanged with the bakery API for a bearer token, which is
//! kept in the server-side session. The browser only ever sees the session
//! cookie.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use confeitaria_core::Email;

use super::PageContext;
use crate::api::ApiError;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{SessionContext, clear_session_token, set_session_token};
use crate::models::{Notice, push_flash};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const API_UNAVAILABLE: &str = "The bakery is unavailable right now. Please try again.";

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub next: String,
    pub email: String,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub name: String,
    pub email: String,
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

impl RegisterForm {
    fn validate(&self) -> std::result::Result<Email, String> {
        if self.name.trim().is_empty() {
            return Err("Please enter your name.".to_string());
        }
        let email = Email::parse(&self.email).map_err(|e| format!("Invalid email: {e}."))?;
        if self.password.is_empty() {
            return Err("Please choose a password.".to_string());
        }
        if self.password != self.password_confirm {
            return Err("Passwords do not match.".to_string());
        }
        Ok(email)
    }
}

/// Only same-site absolute paths are accepted as a post-login destination.
fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

// =============================================================================
// Login
// =============================================================================

/// Display the login page.
#[instrument(skip(ctx))]
pub async fn login_page(ctx: SessionContext, Query(query): Query<NextQuery>) -> Result<Response> {
    let next = safe_next(query.next.as_deref());
    if ctx.is_logged_in() {
        return Ok(Redirect::to(&next).into_response());
    }

    Ok(LoginTemplate {
        page: PageContext::load(&ctx, None).await?,
        error: None,
        next,
        email: String::new(),
    }
    .into_response())
}

/// Re-render the login form with an error, keeping the typed email.
async fn login_error(
    ctx: &SessionContext,
    status: StatusCode,
    message: &str,
    next: String,
    email: String,
) -> Result<Response> {
    Ok((
        status,
        LoginTemplate {
            page: PageContext::load(ctx, None).await?,
            error: Some(message.to_string()),
            next,
            email,
        },
    )
        .into_response())
}

/// Handle the login form.
#[instrument(skip(state, ctx, form))]
pub async fn login(
    State(state): State<AppState>,
    ctx: SessionContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref());

    let Ok(email) = Email::parse(&form.email) else {
        return login_error(&ctx, StatusCode::UNPROCESSABLE_ENTITY, INVALID_CREDENTIALS, next, form.email)
            .await;
    };
    if form.password.is_empty() {
        return login_error(
            &ctx,
            StatusCode::UNPROCESSABLE_ENTITY,
            INVALID_CREDENTIALS,
            next,
            email.into_inner(),
        )
        .await;
    }

    match state.api().login(email.as_str(), &form.password).await {
        Ok(token) => {
            // Fresh session id on privilege change
            ctx.session().cycle_id().await?;
            set_session_token(ctx.session(), &token).await?;
            add_breadcrumb("auth", "Logged in", &[]);
            tracing::info!("Visitor logged in");
            Ok(Redirect::to(&next).into_response())
        }
        Err(ApiError::Unauthorized | ApiError::Rejected { .. } | ApiError::NotFound(_)) => {
            tracing::info!("Login refused by bakery API");
            login_error(
                &ctx,
                StatusCode::UNAUTHORIZED,
                INVALID_CREDENTIALS,
                next,
                email.into_inner(),
            )
            .await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            login_error(&ctx, StatusCode::BAD_GATEWAY, API_UNAVAILABLE, next, email.into_inner())
                .await
        }
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
#[instrument(skip(ctx))]
pub async fn register_page(ctx: SessionContext) -> Result<Response> {
    if ctx.is_logged_in() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(RegisterTemplate {
        page: PageContext::load(&ctx, None).await?,
        error: None,
        name: String::new(),
        email: String::new(),
    }
    .into_response())
}

/// Handle the registration form.
#[instrument(skip(state, ctx, form))]
pub async fn register(
    State(state): State<AppState>,
    ctx: SessionContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let (status, error) = match form.validate() {
        Err(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
        Ok(email) => {
            match state
                .api()
                .register(form.name.trim(), email.as_str(), &form.password)
                .await
            {
                Ok(()) => {
                    add_breadcrumb("auth", "Registered account", &[]);
                    push_flash(ctx.session(), Notice::AccountCreated).await?;
                    return Ok(Redirect::to("/auth/login").into_response());
                }
                Err(ApiError::Rejected { message, .. }) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, message)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Registration failed");
                    (StatusCode::BAD_GATEWAY, API_UNAVAILABLE.to_string())
                }
            }
        }
    };

    Ok((
        status,
        RegisterTemplate {
            page: PageContext::load(&ctx, None).await?,
            error: Some(error),
            name: form.name,
            email: form.email,
        },
    )
        .into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// Log out: drop the token and return to the catalog.
#[instrument(skip(ctx))]
pub async fn logout(ctx: SessionContext) -> Result<Response> {
    clear_session_token(ctx.session()).await?;
    push_flash(ctx.session(), Notice::LoggedOut).await?;
    tracing::info!("Visitor logged out");
    Ok(Redirect::to("/").into_response())
}

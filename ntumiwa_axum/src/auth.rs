use axum::{
    Form, Json, Router,
    extract::State,
    routing::{get, post},
};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use ntumiwa::auth::verify_credentials;
use ntumiwa::is_authenticated;

use crate::error::IntoResponseError;
use crate::session::CurrentSession;
use crate::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_status).post(login))
        .route("/logout", post(logout))
        .route("/session", get(session_status))
}

/// 204 when already logged in, 200 when the login form should be shown.
async fn login_status(session: CurrentSession) -> Result<StatusCode, (StatusCode, String)> {
    let authenticated = is_authenticated(&*session.lock().await).into_response_error()?;
    Ok(if authenticated {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::OK
    })
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    username: String,
}

async fn login(
    State(state): State<AppState>,
    session: CurrentSession,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    verify_credentials(
        state.users.as_ref(),
        &state.hasher,
        &form.username,
        &form.password,
    )
    .await
    .into_response_error()?;

    session.login(&form.username).await.into_response_error()?;

    Ok(Json(LoginResponse {
        username: form.username,
    }))
}

/// Logging out an anonymous session leaves its id alone.
async fn logout(session: CurrentSession) -> Result<StatusCode, (StatusCode, String)> {
    let authenticated = is_authenticated(&*session.lock().await).into_response_error()?;
    if authenticated {
        session.logout().await.into_response_error()?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct SessionStatus {
    authenticated: bool,
    username: Option<String>,
}

async fn session_status(
    session: CurrentSession,
) -> Result<Json<SessionStatus>, (StatusCode, String)> {
    let session = session.lock().await;
    let authenticated = is_authenticated(&session).into_response_error()?;
    Ok(Json(SessionStatus {
        authenticated,
        username: authenticated
            .then(|| session.username().map(str::to_string))
            .flatten(),
    }))
}

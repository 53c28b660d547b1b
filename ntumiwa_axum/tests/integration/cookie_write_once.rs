use axum::{
    Router,
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use ntumiwa::SessionStore;
use ntumiwa_axum::{CurrentSession, session_layer};

use crate::common::{MockBrowser, TestApp, session_id_of};

async fn commit_three_times(session: CurrentSession) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    let mut written = 0;
    for _ in 0..3 {
        if session.commit_cookie(&mut headers).await.unwrap() {
            written += 1;
        }
    }
    (headers, format!("{written}"))
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Commits the cookie first, then tries to log in.
async fn commit_then_login(session: CurrentSession) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    session.commit_cookie(&mut headers).await.unwrap();
    let status = match session.login("alice").await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::CONFLICT,
    };
    (status, headers)
}

async fn echo(body: String) -> String {
    format!("{}", body.len())
}

fn router(app: &TestApp) -> Router {
    Router::new()
        .route("/thrice", get(commit_three_times))
        .route("/empty", get(no_content))
        .route("/early-login", post(commit_then_login))
        .route("/echo", post(echo))
        .layer(middleware::from_fn_with_state(
            app.state.sessions.clone(),
            session_layer,
        ))
}

#[tokio::test]
async fn test_handler_commits_repeatedly_single_cookie() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(router(&app));

    let response = browser.get("/thrice").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "1");
    assert_eq!(response.set_cookies().len(), 1);
}

#[tokio::test]
async fn test_handler_never_commits_single_cookie() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(router(&app));

    let response = browser.get("/empty").await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(response.set_cookies().len(), 1);
    assert_eq!(app.sessions.len().await, 1);
}

#[tokio::test]
async fn test_login_after_commit_is_refused() {
    // Given a session with a CSRF token
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(router(&app));
    browser.get("/empty").await;
    let cookie = browser.cookie.clone().unwrap();

    // When a handler commits the cookie and then tries to change the session id
    let response = browser.post_raw_form("/early-login", String::new()).await;

    // Then the login is refused and the committed cookie still matches the stored session
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.set_cookies().len(), 1);
    assert_eq!(browser.cookie.clone().unwrap(), cookie);
    let stored = app.sessions.read(&session_id_of(&cookie)).await.unwrap();
    assert!(!stored.is_authenticated().unwrap());
}

#[tokio::test]
async fn test_form_within_limit_reaches_handler() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(router(&app));
    browser.get("/empty").await;

    let response = browser.post_raw_form("/echo", "a=1&b=2".to_string()).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "7");
}

#[tokio::test]
async fn test_oversized_form_is_rejected_not_truncated() {
    // Given a valid session and CSRF header
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(router(&app));
    browser.get("/empty").await;
    let cookie = browser.cookie.clone().unwrap();

    // When the form body is larger than the session layer buffers
    let body = format!("note={}", "x".repeat(70 * 1024));
    let response = browser.post_raw_form("/echo", body).await;

    // Then the handler never runs but the session cookie is still written
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.set_cookies().len(), 1);
    assert_eq!(browser.cookie.clone().unwrap(), cookie);
}

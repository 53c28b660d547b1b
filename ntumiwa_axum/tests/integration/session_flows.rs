use http::{Method, StatusCode};
use ntumiwa::{SessionError, SessionStore, UserStore};
use serde_json::json;

use crate::common::{
    ADMIN_PASSWORD, ADMIN_USERNAME, COOKIE_NAME, MockBrowser, TestApp, session_id_of,
};

#[tokio::test]
async fn test_anonymous_visit_then_login_rotates_session() {
    // Given an anonymous visitor
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());

    let response = browser.get("/auth/login").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.set_cookies().len(), 1);
    let anonymous_cookie = browser.cookie.clone().unwrap();
    let anonymous_token = browser.csrf_token.clone().unwrap();
    assert!(anonymous_cookie.starts_with(&format!("{COOKIE_NAME}=")));

    // When they log in with valid credentials
    let response = browser.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;

    // Then the response names the user and carries a new cookie and token
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "username": ADMIN_USERNAME }));
    assert_eq!(response.set_cookies().len(), 1);
    let authenticated_cookie = browser.cookie.clone().unwrap();
    assert_ne!(authenticated_cookie, anonymous_cookie);
    assert_ne!(browser.csrf_token.clone().unwrap(), anonymous_token);

    // And the anonymous session id is gone from the store
    let anonymous_id = session_id_of(&anonymous_cookie);
    assert_eq!(
        app.sessions.read(&anonymous_id).await,
        Err(SessionError::NotFound)
    );

    let response = browser.get("/auth/session").await;
    assert_eq!(
        response.json(),
        json!({ "authenticated": true, "username": ADMIN_USERNAME })
    );

    // Visiting the login page again reports the existing login
    assert_eq!(browser.get("/auth/login").await.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_bad_password_keeps_anonymous_session() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());
    browser.get("/auth/login").await;
    let cookie = browser.cookie.clone().unwrap();

    let response = browser.login(ADMIN_USERNAME, "wrong-password").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(browser.cookie.clone().unwrap(), cookie);
    let response = browser.get("/auth/session").await;
    assert_eq!(response.json()["authenticated"], json!(false));
}

#[tokio::test]
async fn test_unknown_user_gets_same_status_as_bad_password() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());

    let response = browser.login("nobody", ADMIN_PASSWORD).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_every_response_carries_session_headers() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());

    let response = browser.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "ok");
    assert_eq!(response.set_cookies().len(), 1);
    assert_eq!(response.headers["cache-control"], "no-cache");
    assert!(
        response
            .headers
            .get_all("vary")
            .iter()
            .any(|value| value == "Cookie")
    );
    assert!(response.headers.contains_key("x-csrf-token"));

    let cookie = &response.set_cookies()[0];
    assert!(cookie.contains("; HttpOnly"));
    assert!(cookie.contains("; SameSite=Lax"));
    assert!(cookie.contains("; Max-Age=3600"));
}

#[tokio::test]
async fn test_session_persists_across_requests() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());

    browser.get("/health").await;
    let first = browser.cookie.clone().unwrap();
    browser.get("/health").await;

    assert_eq!(browser.cookie.clone().unwrap(), first);
    assert_eq!(app.sessions.len().await, 1);
}

#[tokio::test]
async fn test_tampered_cookie_gets_fresh_session() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());
    browser.get("/health").await;
    let original = browser.cookie.clone().unwrap();

    // Flip the last character of the signed value
    let mut tampered = original.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });
    browser.cookie = Some(tampered);
    browser.get("/health").await;

    let replaced = browser.cookie.clone().unwrap();
    assert_ne!(replaced, original);
    assert_ne!(session_id_of(&replaced), session_id_of(&original));
}

#[tokio::test]
async fn test_csrf_mismatch_rejected_without_losing_session() {
    // Given a logged-in browser
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());
    browser.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let cookie = browser.cookie.clone().unwrap();

    // When it posts with the wrong token
    let response = browser
        .send_json_with_token(
            Method::POST,
            "/venues",
            Some(json!({ "address": "1 Main St" })),
            Some("not-the-token"),
        )
        .await;

    // Then the request is refused but the session survives unchanged
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.text(), "CSRF token mismatch");
    assert_eq!(response.set_cookies().len(), 1);
    assert_eq!(browser.cookie.clone().unwrap(), cookie);
    assert!(app.state.catalog.list_venues().await.unwrap().is_empty());

    let response = browser.get("/venues").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_post_without_token_rejected() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());

    let response = browser
        .send_json_with_token(Method::POST, "/auth/logout", None, None)
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.set_cookies().len(), 1);
}

#[tokio::test]
async fn test_unauthenticated_request_to_protected_route() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());

    let response = browser.get("/venues").await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.text(), "Unauthenticated");
}

#[tokio::test]
async fn test_stale_session_after_user_deleted() {
    // Given a logged-in session whose user is then deleted
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());
    browser.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let stale_cookie = browser.cookie.clone().unwrap();
    let stale_id = session_id_of(&stale_cookie);
    app.users.delete_user(ADMIN_USERNAME).await.unwrap();

    // When it requests a protected route
    let response = browser.get("/venues").await;

    // Then it is refused, moved to a new id and logged out
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.sessions.read(&stale_id).await,
        Err(SessionError::NotFound)
    );
    assert_ne!(browser.cookie.clone().unwrap(), stale_cookie);

    let response = browser.get("/auth/session").await;
    assert_eq!(response.json()["authenticated"], json!(false));
}

#[tokio::test]
async fn test_logout() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());
    browser.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let cookie = browser.cookie.clone().unwrap();

    let response = browser.post_form("/auth/logout", &[]).await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_ne!(browser.cookie.clone().unwrap(), cookie);
    assert_eq!(browser.get("/venues").await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_logout_when_anonymous_keeps_id() {
    let app = TestApp::new().await;
    let mut browser = MockBrowser::new(app.router.clone());
    browser.get("/health").await;
    let cookie = browser.cookie.clone().unwrap();

    let response = browser.post_form("/auth/logout", &[]).await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(browser.cookie.clone().unwrap(), cookie);
}

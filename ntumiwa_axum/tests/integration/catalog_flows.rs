use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use http::{Method, StatusCode};
use ntumiwa::catalog::SqliteCatalog;
use serde_json::{Value, json};

use crate::common::{ADMIN_PASSWORD, ADMIN_USERNAME, MockBrowser, TestApp};

async fn create(browser: &mut MockBrowser, path: &str, body: Value) -> i64 {
    let response = browser.send_json(Method::POST, path, Some(body)).await;
    assert_eq!(response.status, StatusCode::CREATED, "POST {path}: {}", response.text());
    response.json()["id"].as_i64().unwrap()
}

/// Logs in and builds one complete, publishable event. Returns the venue and event ids.
async fn seed_event(browser: &mut MockBrowser) -> (i64, i64) {
    let response = browser.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(response.status, StatusCode::OK);

    let composer = create(
        browser,
        "/composers",
        json!({ "short_name": "Bach", "full_name": "Johann Sebastian Bach" }),
    )
    .await;
    let piece = create(
        browser,
        "/pieces",
        json!({ "title": "Goldberg Variations", "composer_id": composer }),
    )
    .await;
    let programme = create(
        browser,
        "/programmes",
        json!({ "title": "Keyboard works", "pieces": [{ "piece_id": piece, "sequence": 1 }] }),
    )
    .await;
    let venue = create(browser, "/venues", json!({ "address": "1 Concert Hall Road" })).await;

    let date = (Utc::now() + TimeDelta::days(30)).date_naive();
    let event = create(
        browser,
        "/events",
        json!({
            "title": "Spring recital",
            "date": date,
            "ticket_link": "https://tickets.example.org/spring",
            "venue_id": venue,
            "programme_id": programme,
        }),
    )
    .await;

    (venue, event)
}

#[tokio::test]
async fn test_publish_event_then_visible_to_public() {
    // Given a complete draft event
    let app = TestApp::new().await;
    let mut admin = MockBrowser::new(app.router.clone());
    let (_, event) = seed_event(&mut admin).await;

    let response = admin.get(&format!("/events/{event}")).await;
    assert_eq!(response.json()["status"], json!("draft"));

    // When it is published
    let response = admin
        .send_json(Method::POST, &format!("/events/{event}/publish"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], json!("published"));

    // Then an anonymous visitor sees it among upcoming performances
    let mut visitor = MockBrowser::new(app.router.clone());
    let response = visitor.get("/performances").await;
    assert_eq!(response.status, StatusCode::OK);
    let performances = response.json();
    assert_eq!(performances.as_array().unwrap().len(), 1);
    assert_eq!(performances[0]["title"], json!("Spring recital"));
    assert_eq!(performances[0]["venue"], json!("1 Concert Hall Road"));
    assert_eq!(
        performances[0]["programme"],
        json!([{ "composer": "Johann Sebastian Bach", "title": "Goldberg Variations" }])
    );
    assert!(performances[0].get("id").is_none());

    let response = visitor.get("/performances?timeframe=past").await;
    assert_eq!(response.json(), json!([]));
}

#[tokio::test]
async fn test_publish_flow_on_sqlite_catalog() {
    let catalog = SqliteCatalog::connect("sqlite::memory:").await.unwrap();
    let app = TestApp::with_catalog(Arc::new(catalog)).await;
    let mut admin = MockBrowser::new(app.router.clone());
    let (venue, event) = seed_event(&mut admin).await;

    let response = admin
        .send_json(Method::POST, &format!("/events/{event}/publish"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = admin
        .send_json(Method::DELETE, &format!("/venues/{venue}"), None)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let mut visitor = MockBrowser::new(app.router.clone());
    let performances = visitor.get("/performances").await.json();
    assert_eq!(performances[0]["title"], json!("Spring recital"));
    assert_eq!(
        performances[0]["programme"],
        json!([{ "composer": "Johann Sebastian Bach", "title": "Goldberg Variations" }])
    );
    assert_eq!(app.state.catalog.list_venues().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_published_event_conflicts() {
    let app = TestApp::new().await;
    let mut admin = MockBrowser::new(app.router.clone());
    let (venue, event) = seed_event(&mut admin).await;
    admin
        .send_json(Method::POST, &format!("/events/{event}/publish"), None)
        .await;

    // Publishing twice
    let response = admin
        .send_json(Method::POST, &format!("/events/{event}/publish"), None)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Editing a published event
    let response = admin
        .send_json(
            Method::PUT,
            &format!("/events/{event}"),
            Some(json!({ "title": "Renamed" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Deleting a venue still in use
    let response = admin
        .send_json(Method::DELETE, &format!("/venues/{venue}"), None)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    // Back to draft makes it editable again
    let response = admin
        .send_json(Method::POST, &format!("/events/{event}/draft"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let response = admin
        .send_json(
            Method::PUT,
            &format!("/events/{event}"),
            Some(json!({ "title": "Renamed" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["title"], json!("Renamed"));
}

#[tokio::test]
async fn test_publish_incomplete_event_rejected() {
    let app = TestApp::new().await;
    let mut admin = MockBrowser::new(app.router.clone());
    admin.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let event = create(&mut admin, "/events", json!({ "title": "Sketch" })).await;

    let response = admin
        .send_json(Method::POST, &format!("/events/{event}/publish"), None)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("venue_id"));
}

#[tokio::test]
async fn test_event_listing_and_deletion() {
    let app = TestApp::new().await;
    let mut admin = MockBrowser::new(app.router.clone());
    let (_, event) = seed_event(&mut admin).await;

    let response = admin.get("/events?status=draft").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json().as_array().unwrap().len(), 1);

    let response = admin.get("/events?status=published").await;
    assert_eq!(response.json(), json!([]));

    let response = admin.get("/events?status=bogus").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = admin
        .send_json(Method::DELETE, &format!("/events/{event}"), None)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = admin.get(&format!("/events/{event}")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(admin.get("/events/999").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_programme_summary_counts() {
    let app = TestApp::new().await;
    let mut admin = MockBrowser::new(app.router.clone());
    seed_event(&mut admin).await;

    let response = admin.get("/programmes").await;

    let summaries = response.json();
    assert_eq!(summaries[0]["piece_count"], json!(1));
    assert_eq!(summaries[0]["event_count"], json!(1));
}

#[tokio::test]
async fn test_catalog_requires_login() {
    let app = TestApp::new().await;
    let mut visitor = MockBrowser::new(app.router.clone());
    visitor.get("/health").await;

    let response = visitor
        .send_json(Method::POST, "/venues", Some(json!({ "address": "Nowhere" })))
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(app.state.catalog.list_venues().await.unwrap().is_empty());
}

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::Utc;
use http::StatusCode;
use serde::Deserialize;

use ntumiwa::catalog::{
    Composer, ComposerPatch, Event, EventDetails, EventFilter, EventInput, EventStatus,
    EventSummary, NewComposer, NewPiece, NewProgramme, NewVenue, Performance, Piece, PiecePatch,
    Programme, ProgrammePatch, ProgrammeSummary, Timeframe, Venue, VenuePatch,
};

use crate::error::IntoResponseError;
use crate::session::AuthUser;
use crate::state::AppState;

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// Routes for managing the catalog. Callers put them behind the auth guard.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/{id}/draft", post(draft_event))
        .route("/events/{id}/publish", post(publish_event))
        .route("/events/{id}/archive", post(archive_event))
        .route("/programmes", get(list_programmes).post(create_programme))
        .route(
            "/programmes/{id}",
            get(get_programme)
                .put(update_programme)
                .delete(delete_programme),
        )
        .route("/pieces", get(list_pieces).post(create_piece))
        .route(
            "/pieces/{id}",
            get(get_piece).put(update_piece).delete(delete_piece),
        )
        .route("/composers", get(list_composers).post(create_composer))
        .route(
            "/composers/{id}",
            get(get_composer).put(update_composer).delete(delete_composer),
        )
        .route("/venues", get(list_venues).post(create_venue))
        .route(
            "/venues/{id}",
            get(get_venue).put(update_venue).delete(delete_venue),
        )
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventQuery {
    status: Option<String>,
    timeframe: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PerformanceQuery {
    timeframe: Option<String>,
}

/// Public listing of published events; `timeframe` defaults to `upcoming`.
pub(crate) async fn performances(
    State(state): State<AppState>,
    Query(query): Query<PerformanceQuery>,
) -> ApiResult<Json<Vec<Performance>>> {
    let timeframe = match query.timeframe.as_deref() {
        None | Some("") => Timeframe::Upcoming,
        Some(value) => value.parse::<Timeframe>().into_response_error()?,
    };
    let today = Utc::now().date_naive();
    state
        .catalog
        .performances(timeframe, today)
        .await
        .into_response_error()
        .map(Json)
}

// Events

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> ApiResult<Json<Vec<EventSummary>>> {
    let filter = EventFilter {
        status: query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<EventStatus>)
            .transpose()
            .into_response_error()?,
        timeframe: query
            .timeframe
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::parse::<Timeframe>)
            .transpose()
            .into_response_error()?,
    };
    let today = Utc::now().date_naive();
    state
        .catalog
        .list_events(filter, today)
        .await
        .into_response_error()
        .map(Json)
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<EventDetails>> {
    state.catalog.get_event(id).await.into_response_error().map(Json)
}

async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<EventInput>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let event = state.catalog.create_event(input).await.into_response_error()?;
    tracing::info!(event_id = event.id, username = %user.username, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<EventInput>,
) -> ApiResult<Json<Event>> {
    state
        .catalog
        .update_event(id, patch)
        .await
        .into_response_error()
        .map(Json)
}

async fn delete_event(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.catalog.delete_event(id).await.into_response_error()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn transition(state: &AppState, id: i64, target: EventStatus) -> ApiResult<Json<Event>> {
    state
        .catalog
        .set_event_status(id, target)
        .await
        .into_response_error()
        .map(Json)
}

async fn draft_event(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Event>> {
    transition(&state, id, EventStatus::Draft).await
}

async fn publish_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Event>> {
    transition(&state, id, EventStatus::Published).await
}

async fn archive_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Event>> {
    transition(&state, id, EventStatus::Archived).await
}

// Programmes

async fn list_programmes(State(state): State<AppState>) -> ApiResult<Json<Vec<ProgrammeSummary>>> {
    state.catalog.list_programmes().await.into_response_error().map(Json)
}

async fn get_programme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Programme>> {
    state.catalog.get_programme(id).await.into_response_error().map(Json)
}

async fn create_programme(
    State(state): State<AppState>,
    Json(input): Json<NewProgramme>,
) -> ApiResult<(StatusCode, Json<Programme>)> {
    let programme = state.catalog.create_programme(input).await.into_response_error()?;
    Ok((StatusCode::CREATED, Json(programme)))
}

async fn update_programme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ProgrammePatch>,
) -> ApiResult<Json<Programme>> {
    state
        .catalog
        .update_programme(id, patch)
        .await
        .into_response_error()
        .map(Json)
}

async fn delete_programme(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.catalog.delete_programme(id).await.into_response_error()?;
    Ok(StatusCode::NO_CONTENT)
}

// Pieces

async fn list_pieces(State(state): State<AppState>) -> ApiResult<Json<Vec<Piece>>> {
    state.catalog.list_pieces().await.into_response_error().map(Json)
}

async fn get_piece(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Piece>> {
    state.catalog.get_piece(id).await.into_response_error().map(Json)
}

async fn create_piece(
    State(state): State<AppState>,
    Json(input): Json<NewPiece>,
) -> ApiResult<(StatusCode, Json<Piece>)> {
    let piece = state.catalog.create_piece(input).await.into_response_error()?;
    Ok((StatusCode::CREATED, Json(piece)))
}

async fn update_piece(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<PiecePatch>,
) -> ApiResult<Json<Piece>> {
    state
        .catalog
        .update_piece(id, patch)
        .await
        .into_response_error()
        .map(Json)
}

async fn delete_piece(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.catalog.delete_piece(id).await.into_response_error()?;
    Ok(StatusCode::NO_CONTENT)
}

// Composers

async fn list_composers(State(state): State<AppState>) -> ApiResult<Json<Vec<Composer>>> {
    state.catalog.list_composers().await.into_response_error().map(Json)
}

async fn get_composer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Composer>> {
    state.catalog.get_composer(id).await.into_response_error().map(Json)
}

async fn create_composer(
    State(state): State<AppState>,
    Json(input): Json<NewComposer>,
) -> ApiResult<(StatusCode, Json<Composer>)> {
    let composer = state.catalog.create_composer(input).await.into_response_error()?;
    Ok((StatusCode::CREATED, Json(composer)))
}

async fn update_composer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ComposerPatch>,
) -> ApiResult<Json<Composer>> {
    state
        .catalog
        .update_composer(id, patch)
        .await
        .into_response_error()
        .map(Json)
}

async fn delete_composer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.catalog.delete_composer(id).await.into_response_error()?;
    Ok(StatusCode::NO_CONTENT)
}

// Venues

async fn list_venues(State(state): State<AppState>) -> ApiResult<Json<Vec<Venue>>> {
    state.catalog.list_venues().await.into_response_error().map(Json)
}

async fn get_venue(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Venue>> {
    state.catalog.get_venue(id).await.into_response_error().map(Json)
}

async fn create_venue(
    State(state): State<AppState>,
    Json(input): Json<NewVenue>,
) -> ApiResult<(StatusCode, Json<Venue>)> {
    let venue = state.catalog.create_venue(input).await.into_response_error()?;
    Ok((StatusCode::CREATED, Json(venue)))
}

async fn update_venue(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<VenuePatch>,
) -> ApiResult<Json<Venue>> {
    state
        .catalog
        .update_venue(id, patch)
        .await
        .into_response_error()
        .map(Json)
}

async fn delete_venue(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.catalog.delete_venue(id).await.into_response_error()?;
    Ok(StatusCode::NO_CONTENT)
}

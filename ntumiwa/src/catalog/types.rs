use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::errors::CatalogError;

const TEXT_DATE_FORMAT: &str = "%-d %B, %Y";

/// Renders a date the way it is shown to visitors, e.g. `2 January, 2026`.
pub fn text_date(date: NaiveDate) -> String {
    date.format(TEXT_DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Venue {
    pub id: i64,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVenue {
    pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenuePatch {
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Composer {
    pub id: i64,
    pub short_name: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComposer {
    pub short_name: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposerPatch {
    pub short_name: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Piece {
    pub id: i64,
    pub title: String,
    pub composer_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPiece {
    pub title: String,
    pub composer_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PiecePatch {
    pub title: Option<String>,
    pub composer_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammePiece {
    pub piece_id: i64,
    pub sequence: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Programme {
    pub id: i64,
    pub title: String,
    /// Ordered by `sequence`
    pub pieces: Vec<ProgrammePiece>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgrammeSummary {
    pub id: i64,
    pub title: String,
    pub piece_count: usize,
    pub event_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProgramme {
    pub title: String,
    #[serde(default)]
    pub pieces: Vec<ProgrammePiece>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgrammePatch {
    pub title: Option<String>,
    pub pieces: Option<Vec<ProgrammePiece>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Archived,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Archived => "archived",
        })
    }
}

impl FromStr for EventStatus {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "archived" => Ok(EventStatus::Archived),
            other => Err(CatalogError::Validation(format!("unknown status {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Upcoming,
    Past,
}

impl FromStr for Timeframe {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(Timeframe::Upcoming),
            "past" => Ok(Timeframe::Past),
            other => Err(CatalogError::Validation(format!(
                "unknown timeframe {other:?}"
            ))),
        }
    }
}

impl Timeframe {
    /// Upcoming includes today.
    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Timeframe::Upcoming => date >= today,
            Timeframe::Past => date < today,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub ticket_link: Option<String>,
    pub venue_id: Option<i64>,
    pub programme_id: Option<i64>,
    pub status: EventStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An event with its venue and programme resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: Event,
    pub text_date: Option<String>,
    pub venue: Option<Venue>,
    pub programme: Option<Programme>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub id: i64,
    pub title: String,
    pub text_date: Option<String>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            text_date: event.date.map(text_date),
            status: event.status,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Fields of an event. On create `title` is required; on update only the present
/// fields change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventInput {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub ticket_link: Option<String>,
    pub venue_id: Option<i64>,
    pub programme_id: Option<i64>,
    pub notes: Option<String>,
}

impl EventInput {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.date.is_none()
            && self.ticket_link.is_none()
            && self.venue_id.is_none()
            && self.programme_id.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub timeframe: Option<Timeframe>,
}

/// A published event as shown on the public site. Carries no internal ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Performance {
    pub title: String,
    pub exact_date: NaiveDate,
    pub date: String,
    pub venue: String,
    pub programme: Vec<PerformancePiece>,
    pub ticket_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformancePiece {
    pub composer: String,
    pub title: String,
}

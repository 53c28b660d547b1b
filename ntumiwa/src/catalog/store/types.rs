use async_trait::async_trait;
use chrono::NaiveDate;

use crate::catalog::errors::CatalogError;
use crate::catalog::types::{
    Composer, ComposerPatch, Event, EventDetails, EventFilter, EventInput, EventStatus,
    EventSummary, NewComposer, NewPiece, NewProgramme, NewVenue, Performance, Piece, PiecePatch,
    Programme, ProgrammePatch, ProgrammeSummary, Timeframe, Venue, VenuePatch,
};

/// Storage for the concert catalog.
///
/// Reference checks and the writes they guard must be atomic: a record that is
/// still referenced can never be deleted, and a write never points at a missing
/// record. Both fail with [`CatalogError::Conflict`].
#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    async fn get_venue(&self, id: i64) -> Result<Venue, CatalogError>;
    async fn list_venues(&self) -> Result<Vec<Venue>, CatalogError>;
    async fn create_venue(&self, input: NewVenue) -> Result<Venue, CatalogError>;
    async fn update_venue(&self, id: i64, patch: VenuePatch) -> Result<Venue, CatalogError>;
    async fn delete_venue(&self, id: i64) -> Result<(), CatalogError>;

    async fn get_composer(&self, id: i64) -> Result<Composer, CatalogError>;
    /// Ordered by short name.
    async fn list_composers(&self) -> Result<Vec<Composer>, CatalogError>;
    async fn create_composer(&self, input: NewComposer) -> Result<Composer, CatalogError>;
    async fn update_composer(
        &self,
        id: i64,
        patch: ComposerPatch,
    ) -> Result<Composer, CatalogError>;
    async fn delete_composer(&self, id: i64) -> Result<(), CatalogError>;

    async fn get_piece(&self, id: i64) -> Result<Piece, CatalogError>;
    /// Ordered by title.
    async fn list_pieces(&self) -> Result<Vec<Piece>, CatalogError>;
    async fn create_piece(&self, input: NewPiece) -> Result<Piece, CatalogError>;
    async fn update_piece(&self, id: i64, patch: PiecePatch) -> Result<Piece, CatalogError>;
    async fn delete_piece(&self, id: i64) -> Result<(), CatalogError>;

    async fn get_programme(&self, id: i64) -> Result<Programme, CatalogError>;
    async fn list_programmes(&self) -> Result<Vec<ProgrammeSummary>, CatalogError>;
    async fn create_programme(&self, input: NewProgramme) -> Result<Programme, CatalogError>;
    /// Replaces the whole piece list when `patch.pieces` is present.
    async fn update_programme(
        &self,
        id: i64,
        patch: ProgrammePatch,
    ) -> Result<Programme, CatalogError>;
    async fn delete_programme(&self, id: i64) -> Result<(), CatalogError>;

    async fn get_event(&self, id: i64) -> Result<EventDetails, CatalogError>;

    /// Events matching `filter`, newest date first; undated events come last.
    async fn list_events(
        &self,
        filter: EventFilter,
        today: NaiveDate,
    ) -> Result<Vec<EventSummary>, CatalogError>;

    /// New events always start as drafts.
    async fn create_event(&self, input: EventInput) -> Result<Event, CatalogError>;

    /// Applies the present fields. Only drafts can be edited.
    async fn update_event(&self, id: i64, patch: EventInput) -> Result<Event, CatalogError>;

    async fn delete_event(&self, id: i64) -> Result<(), CatalogError>;

    /// Moves an event to `target`. Publishing requires every field a visitor needs.
    async fn set_event_status(
        &self,
        id: i64,
        target: EventStatus,
    ) -> Result<Event, CatalogError>;

    /// Published events in `timeframe`; upcoming soonest first, past most recent first.
    async fn performances(
        &self,
        timeframe: Timeframe,
        today: NaiveDate,
    ) -> Result<Vec<Performance>, CatalogError>;
}

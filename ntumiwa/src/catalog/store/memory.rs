use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::catalog::errors::CatalogError;
use crate::catalog::types::{
    Composer, ComposerPatch, Event, EventDetails, EventFilter, EventInput, EventStatus,
    EventSummary, NewComposer, NewPiece, NewProgramme, NewVenue, Performance, PerformancePiece,
    Piece, PiecePatch, Programme, ProgrammePatch, ProgrammePiece, ProgrammeSummary, Timeframe,
    Venue, VenuePatch, text_date,
};

use super::types::CatalogStore;
use super::{check_publishable, required, sorted};

/// Rows of one record type keyed by id. Ids start at 1 and are never reused.
#[derive(Debug)]
struct Table<T> {
    kind: &'static str,
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T: Clone> Table<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }

    fn get(&self, id: i64) -> Result<&T, CatalogError> {
        self.rows
            .get(&id)
            .ok_or_else(|| CatalogError::NotFound(format!("{} {id}", self.kind)))
    }

    fn get_mut(&mut self, id: i64) -> Result<&mut T, CatalogError> {
        let kind = self.kind;
        self.rows
            .get_mut(&id)
            .ok_or_else(|| CatalogError::NotFound(format!("{kind} {id}")))
    }

    /// Fails with `Conflict` when `id` does not exist; used for foreign keys.
    fn require(&self, id: i64) -> Result<(), CatalogError> {
        if self.rows.contains_key(&id) {
            Ok(())
        } else {
            Err(CatalogError::Conflict(format!(
                "referenced {} {id} does not exist",
                self.kind
            )))
        }
    }

    fn insert(&mut self, build: impl FnOnce(i64) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn remove(&mut self, id: i64) -> Result<T, CatalogError> {
        let kind = self.kind;
        self.rows
            .remove(&id)
            .ok_or_else(|| CatalogError::NotFound(format!("{kind} {id}")))
    }
}

#[derive(Debug)]
struct Tables {
    venues: Table<Venue>,
    composers: Table<Composer>,
    pieces: Table<Piece>,
    programmes: Table<Programme>,
    events: Table<Event>,
}

impl Tables {
    fn check_programme_pieces(&self, pieces: &[ProgrammePiece]) -> Result<(), CatalogError> {
        for piece in pieces {
            self.pieces.require(piece.piece_id)?;
        }
        Ok(())
    }

    fn check_event_refs(&self, input: &EventInput) -> Result<(), CatalogError> {
        if let Some(venue_id) = input.venue_id {
            self.venues.require(venue_id)?;
        }
        if let Some(programme_id) = input.programme_id {
            self.programmes.require(programme_id)?;
        }
        Ok(())
    }

    fn event_count(&self, programme_id: i64) -> usize {
        self.events
            .rows
            .values()
            .filter(|event| event.programme_id == Some(programme_id))
            .count()
    }

    fn performance(&self, event: &Event) -> Option<Performance> {
        let date = event.date?;
        let venue = self.venues.get(event.venue_id?).ok()?;
        let programme = self.programmes.get(event.programme_id?).ok()?;

        let pieces = programme
            .pieces
            .iter()
            .filter_map(|entry| {
                let piece = self.pieces.get(entry.piece_id).ok()?;
                let composer = self.composers.get(piece.composer_id).ok()?;
                Some(PerformancePiece {
                    composer: composer.full_name.clone(),
                    title: piece.title.clone(),
                })
            })
            .collect();

        Some(Performance {
            title: event.title.clone(),
            exact_date: date,
            date: text_date(date),
            venue: venue.address.clone(),
            programme: pieces,
            ticket_link: event.ticket_link.clone().unwrap_or_default(),
        })
    }
}

/// Catalog of venues, composers, pieces, programmes and events held in memory.
///
/// One lock covers every table so reference checks and the writes they guard are atomic.
#[derive(Debug)]
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                venues: Table::new("venue"),
                composers: Table::new("composer"),
                pieces: Table::new("piece"),
                programmes: Table::new("programme"),
                events: Table::new("event"),
            }),
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    // Venues

    async fn get_venue(&self, id: i64) -> Result<Venue, CatalogError> {
        self.tables.read().await.venues.get(id).cloned()
    }

    async fn list_venues(&self) -> Result<Vec<Venue>, CatalogError> {
        Ok(self.tables.read().await.venues.rows.values().cloned().collect())
    }

    async fn create_venue(&self, input: NewVenue) -> Result<Venue, CatalogError> {
        let address = required("address", &input.address)?;
        let mut tables = self.tables.write().await;
        Ok(tables.venues.insert(|id| Venue { id, address }))
    }

    async fn update_venue(&self, id: i64, patch: VenuePatch) -> Result<Venue, CatalogError> {
        let Some(address) = patch.address else {
            return Err(CatalogError::Validation("nothing to update".to_string()));
        };
        let address = required("address", &address)?;
        let mut tables = self.tables.write().await;
        let venue = tables.venues.get_mut(id)?;
        venue.address = address;
        Ok(venue.clone())
    }

    async fn delete_venue(&self, id: i64) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        tables.venues.get(id)?;
        if tables
            .events
            .rows
            .values()
            .any(|event| event.venue_id == Some(id))
        {
            return Err(CatalogError::Conflict(format!(
                "venue {id} is used by an event"
            )));
        }
        tables.venues.remove(id).map(|_| ())
    }

    // Composers

    async fn get_composer(&self, id: i64) -> Result<Composer, CatalogError> {
        self.tables.read().await.composers.get(id).cloned()
    }

    async fn list_composers(&self) -> Result<Vec<Composer>, CatalogError> {
        let mut composers: Vec<Composer> = self
            .tables
            .read()
            .await
            .composers
            .rows
            .values()
            .cloned()
            .collect();
        composers.sort_by(|a, b| a.short_name.cmp(&b.short_name));
        Ok(composers)
    }

    async fn create_composer(&self, input: NewComposer) -> Result<Composer, CatalogError> {
        let short_name = required("short_name", &input.short_name)?;
        let full_name = required("full_name", &input.full_name)?;
        let mut tables = self.tables.write().await;
        Ok(tables.composers.insert(|id| Composer {
            id,
            short_name,
            full_name,
        }))
    }

    async fn update_composer(
        &self,
        id: i64,
        patch: ComposerPatch,
    ) -> Result<Composer, CatalogError> {
        if patch.short_name.is_none() && patch.full_name.is_none() {
            return Err(CatalogError::Validation("nothing to update".to_string()));
        }
        let short_name = patch
            .short_name
            .as_deref()
            .map(|v| required("short_name", v))
            .transpose()?;
        let full_name = patch
            .full_name
            .as_deref()
            .map(|v| required("full_name", v))
            .transpose()?;

        let mut tables = self.tables.write().await;
        let composer = tables.composers.get_mut(id)?;
        if let Some(short_name) = short_name {
            composer.short_name = short_name;
        }
        if let Some(full_name) = full_name {
            composer.full_name = full_name;
        }
        Ok(composer.clone())
    }

    async fn delete_composer(&self, id: i64) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        tables.composers.get(id)?;
        if tables
            .pieces
            .rows
            .values()
            .any(|piece| piece.composer_id == id)
        {
            return Err(CatalogError::Conflict(format!(
                "composer {id} has pieces"
            )));
        }
        tables.composers.remove(id).map(|_| ())
    }

    // Pieces

    async fn get_piece(&self, id: i64) -> Result<Piece, CatalogError> {
        self.tables.read().await.pieces.get(id).cloned()
    }

    async fn list_pieces(&self) -> Result<Vec<Piece>, CatalogError> {
        let mut pieces: Vec<Piece> = self
            .tables
            .read()
            .await
            .pieces
            .rows
            .values()
            .cloned()
            .collect();
        pieces.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(pieces)
    }

    async fn create_piece(&self, input: NewPiece) -> Result<Piece, CatalogError> {
        let title = required("title", &input.title)?;
        let mut tables = self.tables.write().await;
        tables.composers.require(input.composer_id)?;
        Ok(tables.pieces.insert(|id| Piece {
            id,
            title,
            composer_id: input.composer_id,
        }))
    }

    async fn update_piece(&self, id: i64, patch: PiecePatch) -> Result<Piece, CatalogError> {
        if patch.title.is_none() && patch.composer_id.is_none() {
            return Err(CatalogError::Validation("nothing to update".to_string()));
        }
        let title = patch
            .title
            .as_deref()
            .map(|v| required("title", v))
            .transpose()?;

        let mut tables = self.tables.write().await;
        if let Some(composer_id) = patch.composer_id {
            tables.composers.require(composer_id)?;
        }
        let piece = tables.pieces.get_mut(id)?;
        if let Some(title) = title {
            piece.title = title;
        }
        if let Some(composer_id) = patch.composer_id {
            piece.composer_id = composer_id;
        }
        Ok(piece.clone())
    }

    async fn delete_piece(&self, id: i64) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        tables.pieces.get(id)?;
        if tables
            .programmes
            .rows
            .values()
            .any(|programme| programme.pieces.iter().any(|p| p.piece_id == id))
        {
            return Err(CatalogError::Conflict(format!(
                "piece {id} is part of a programme"
            )));
        }
        tables.pieces.remove(id).map(|_| ())
    }

    // Programmes

    async fn get_programme(&self, id: i64) -> Result<Programme, CatalogError> {
        self.tables.read().await.programmes.get(id).cloned()
    }

    async fn list_programmes(&self) -> Result<Vec<ProgrammeSummary>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .programmes
            .rows
            .values()
            .map(|programme| ProgrammeSummary {
                id: programme.id,
                title: programme.title.clone(),
                piece_count: programme.pieces.len(),
                event_count: tables.event_count(programme.id),
            })
            .collect())
    }

    async fn create_programme(&self, input: NewProgramme) -> Result<Programme, CatalogError> {
        let title = required("title", &input.title)?;
        let mut tables = self.tables.write().await;
        tables.check_programme_pieces(&input.pieces)?;
        let pieces = sorted(input.pieces);
        Ok(tables.programmes.insert(|id| Programme { id, title, pieces }))
    }

    async fn update_programme(
        &self,
        id: i64,
        patch: ProgrammePatch,
    ) -> Result<Programme, CatalogError> {
        if patch.title.is_none() && patch.pieces.is_none() {
            return Err(CatalogError::Validation("nothing to update".to_string()));
        }
        let title = patch
            .title
            .as_deref()
            .map(|v| required("title", v))
            .transpose()?;

        let mut tables = self.tables.write().await;
        if let Some(pieces) = &patch.pieces {
            tables.check_programme_pieces(pieces)?;
        }
        let programme = tables.programmes.get_mut(id)?;
        if let Some(title) = title {
            programme.title = title;
        }
        if let Some(pieces) = patch.pieces {
            programme.pieces = sorted(pieces);
        }
        Ok(programme.clone())
    }

    async fn delete_programme(&self, id: i64) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        tables.programmes.get(id)?;
        if tables.event_count(id) > 0 {
            return Err(CatalogError::Conflict(format!(
                "programme {id} is used by an event"
            )));
        }
        tables.programmes.remove(id).map(|_| ())
    }

    // Events

    async fn get_event(&self, id: i64) -> Result<EventDetails, CatalogError> {
        let tables = self.tables.read().await;
        let event = tables.events.get(id)?.clone();
        let venue = event
            .venue_id
            .and_then(|venue_id| tables.venues.get(venue_id).ok().cloned());
        let programme = event
            .programme_id
            .and_then(|programme_id| tables.programmes.get(programme_id).ok().cloned());

        Ok(EventDetails {
            text_date: event.date.map(text_date),
            event,
            venue,
            programme,
        })
    }

    async fn list_events(
        &self,
        filter: EventFilter,
        today: NaiveDate,
    ) -> Result<Vec<EventSummary>, CatalogError> {
        let tables = self.tables.read().await;
        let mut events: Vec<&Event> = tables
            .events
            .rows
            .values()
            .filter(|event| filter.status.is_none_or(|status| event.status == status))
            .filter(|event| match (filter.timeframe, event.date) {
                (None, _) => true,
                (Some(timeframe), Some(date)) => timeframe.contains(date, today),
                (Some(_), None) => false,
            })
            .collect();
        events.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
        Ok(events.into_iter().map(EventSummary::from).collect())
    }

    async fn create_event(&self, input: EventInput) -> Result<Event, CatalogError> {
        let title = required("title", input.title.as_deref().unwrap_or_default())?;
        let mut tables = self.tables.write().await;
        tables.check_event_refs(&input)?;

        let now = Utc::now();
        Ok(tables.events.insert(|id| Event {
            id,
            title,
            date: input.date,
            ticket_link: input.ticket_link,
            venue_id: input.venue_id,
            programme_id: input.programme_id,
            status: EventStatus::Draft,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        }))
    }

    async fn update_event(&self, id: i64, patch: EventInput) -> Result<Event, CatalogError> {
        if patch.is_empty() {
            return Err(CatalogError::Validation("nothing to update".to_string()));
        }
        let title = patch
            .title
            .as_deref()
            .map(|v| required("title", v))
            .transpose()?;

        let mut tables = self.tables.write().await;
        let status = tables.events.get(id)?.status;
        if status != EventStatus::Draft {
            return Err(CatalogError::ImmutableState(format!(
                "event {id} is {status}; only drafts can be edited"
            )));
        }
        tables.check_event_refs(&patch)?;

        let event = tables.events.get_mut(id)?;
        if let Some(title) = title {
            event.title = title;
        }
        if patch.date.is_some() {
            event.date = patch.date;
        }
        if patch.ticket_link.is_some() {
            event.ticket_link = patch.ticket_link;
        }
        if patch.venue_id.is_some() {
            event.venue_id = patch.venue_id;
        }
        if patch.programme_id.is_some() {
            event.programme_id = patch.programme_id;
        }
        if patch.notes.is_some() {
            event.notes = patch.notes;
        }
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete_event(&self, id: i64) -> Result<(), CatalogError> {
        self.tables.write().await.events.remove(id).map(|_| ())
    }

    async fn set_event_status(
        &self,
        id: i64,
        target: EventStatus,
    ) -> Result<Event, CatalogError> {
        let mut tables = self.tables.write().await;
        let event = tables.events.get_mut(id)?;
        if event.status == target {
            return Err(CatalogError::StatusUnchanged(target));
        }

        if target == EventStatus::Published {
            check_publishable(event)?;
        }

        event.status = target;
        event.updated_at = Utc::now();
        tracing::info!(event_id = id, status = %target, "Event status changed");
        Ok(event.clone())
    }

    async fn performances(
        &self,
        timeframe: Timeframe,
        today: NaiveDate,
    ) -> Result<Vec<Performance>, CatalogError> {
        let tables = self.tables.read().await;
        let mut performances: Vec<Performance> = tables
            .events
            .rows
            .values()
            .filter(|event| event.status == EventStatus::Published)
            .filter(|event| event.date.is_some_and(|date| timeframe.contains(date, today)))
            .filter_map(|event| tables.performance(event))
            .collect();

        match timeframe {
            Timeframe::Upcoming => performances.sort_by_key(|p| p.exact_date),
            Timeframe::Past => performances.sort_by(|a, b| b.exact_date.cmp(&a.exact_date)),
        }
        Ok(performances)
    }
}

//! Concert catalog: venues, composers, pieces, programmes and events.

mod errors;
mod store;
mod types;

pub use errors::CatalogError;
pub use store::{CatalogStore, MemoryCatalog, SqliteCatalog};
pub use types::{
    Composer, ComposerPatch, Event, EventDetails, EventFilter, EventInput, EventStatus,
    EventSummary, NewComposer, NewPiece, NewProgramme, NewVenue, Performance, PerformancePiece,
    Piece, PiecePatch, Programme, ProgrammePatch, ProgrammePiece, ProgrammeSummary, Timeframe,
    Venue, VenuePatch, text_date,
};

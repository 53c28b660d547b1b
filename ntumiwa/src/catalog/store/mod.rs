mod memory;
mod sqlite;
mod types;

pub use memory::MemoryCatalog;
pub use sqlite::SqliteCatalog;
pub use types::CatalogStore;

use crate::catalog::errors::CatalogError;
use crate::catalog::types::{Event, ProgrammePiece};

fn required(field: &str, value: &str) -> Result<String, CatalogError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Stable, so pieces sharing a sequence number keep their submitted order.
fn sorted(mut pieces: Vec<ProgrammePiece>) -> Vec<ProgrammePiece> {
    pieces.sort_by_key(|piece| piece.sequence);
    pieces
}

fn check_publishable(event: &Event) -> Result<(), CatalogError> {
    let missing: Vec<&str> = [
        ("title", event.title.trim().is_empty()),
        ("date", event.date.is_none()),
        (
            "ticket_link",
            event
                .ticket_link
                .as_deref()
                .is_none_or(|link| link.trim().is_empty()),
        ),
        ("venue_id", event.venue_id.is_none()),
        ("programme_id", event.programme_id.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, missing)| missing.then_some(field))
    .collect();

    if !missing.is_empty() {
        return Err(CatalogError::Validation(format!(
            "cannot publish without {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnection, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};

use crate::catalog::errors::CatalogError;
use crate::catalog::types::{
    Composer, ComposerPatch, Event, EventDetails, EventFilter, EventInput, EventStatus,
    EventSummary, NewComposer, NewPiece, NewProgramme, NewVenue, Performance, PerformancePiece,
    Piece, PiecePatch, Programme, ProgrammePatch, ProgrammePiece, ProgrammeSummary, Timeframe,
    Venue, VenuePatch, text_date,
};

use super::types::CatalogStore;
use super::{check_publishable, required, sorted};

const DB_TABLE_VENUES: &str = "venues";
const DB_TABLE_COMPOSERS: &str = "composers";
const DB_TABLE_PIECES: &str = "pieces";
const DB_TABLE_PROGRAMMES: &str = "programmes";
const DB_TABLE_PROGRAMME_PIECES: &str = "programme_pieces";
const DB_TABLE_EVENTS: &str = "events";

const EVENT_COLUMNS: &str =
    "id, title, date, ticket_link, venue_id, programme_id, status, notes, created_at, updated_at";

/// Catalog persisted in a SQLite database.
///
/// Writes that check references run in one transaction with the checks.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: Pool<Sqlite>,
}

#[derive(FromRow)]
struct EventRow {
    id: i64,
    title: String,
    date: Option<NaiveDate>,
    ticket_link: Option<String>,
    venue_id: Option<i64>,
    programme_id: Option<i64>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = CatalogError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            CatalogError::Storage(format!("event {} has unknown status {:?}", row.id, row.status))
        })?;
        Ok(Event {
            id: row.id,
            title: row.title,
            date: row.date,
            ticket_link: row.ticket_link,
            venue_id: row.venue_id,
            programme_id: row.programme_id,
            status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl SqliteCatalog {
    /// Connects to `url` and creates the catalog tables when missing.
    pub async fn connect(url: &str) -> Result<Self, CatalogError> {
        // Every connection to `sqlite::memory:` opens its own database
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, CatalogError> {
        let catalog = Self { pool };
        catalog.create_tables().await?;
        tracing::info!("Connected to SQLite catalog");
        Ok(catalog)
    }

    async fn create_tables(&self) -> Result<(), CatalogError> {
        // AUTOINCREMENT keeps ids of deleted rows from being handed out again
        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {DB_TABLE_VENUES} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    address TEXT NOT NULL
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {DB_TABLE_COMPOSERS} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    short_name TEXT NOT NULL,
                    full_name TEXT NOT NULL
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {DB_TABLE_PIECES} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    composer_id INTEGER NOT NULL REFERENCES {DB_TABLE_COMPOSERS}(id)
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {DB_TABLE_PROGRAMMES} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {DB_TABLE_PROGRAMME_PIECES} (
                    programme_id INTEGER NOT NULL
                        REFERENCES {DB_TABLE_PROGRAMMES}(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    piece_id INTEGER NOT NULL REFERENCES {DB_TABLE_PIECES}(id),
                    sequence INTEGER NOT NULL,
                    PRIMARY KEY (programme_id, position)
                )
                "#
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {DB_TABLE_EVENTS} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    date DATE,
                    ticket_link TEXT,
                    venue_id INTEGER REFERENCES {DB_TABLE_VENUES}(id),
                    programme_id INTEGER REFERENCES {DB_TABLE_PROGRAMMES}(id),
                    status TEXT NOT NULL,
                    notes TEXT,
                    created_at TIMESTAMP NOT NULL,
                    updated_at TIMESTAMP NOT NULL
                )
                "#
            ),
        ];
        for statement in &statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

async fn exists(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    id: i64,
) -> Result<bool, CatalogError> {
    let found: Option<(i64,)> =
        sqlx::query_as(&format!("SELECT 1 FROM {table} WHERE {column} = ? LIMIT 1"))
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(found.is_some())
}

/// Fails with `NotFound` when row `id` of `table` is missing.
async fn require_row(
    conn: &mut SqliteConnection,
    table: &str,
    kind: &str,
    id: i64,
) -> Result<(), CatalogError> {
    if exists(conn, table, "id", id).await? {
        Ok(())
    } else {
        Err(CatalogError::NotFound(format!("{kind} {id}")))
    }
}

/// Fails with `Conflict` when the referenced row is missing.
async fn require_reference(
    conn: &mut SqliteConnection,
    table: &str,
    kind: &str,
    id: i64,
) -> Result<(), CatalogError> {
    if exists(conn, table, "id", id).await? {
        Ok(())
    } else {
        Err(CatalogError::Conflict(format!(
            "referenced {kind} {id} does not exist"
        )))
    }
}

async fn check_programme_pieces(
    conn: &mut SqliteConnection,
    pieces: &[ProgrammePiece],
) -> Result<(), CatalogError> {
    for piece in pieces {
        require_reference(conn, DB_TABLE_PIECES, "piece", piece.piece_id).await?;
    }
    Ok(())
}

async fn check_event_refs(
    conn: &mut SqliteConnection,
    input: &EventInput,
) -> Result<(), CatalogError> {
    if let Some(venue_id) = input.venue_id {
        require_reference(conn, DB_TABLE_VENUES, "venue", venue_id).await?;
    }
    if let Some(programme_id) = input.programme_id {
        require_reference(conn, DB_TABLE_PROGRAMMES, "programme", programme_id).await?;
    }
    Ok(())
}

async fn insert_programme_pieces(
    conn: &mut SqliteConnection,
    programme_id: i64,
    pieces: &[ProgrammePiece],
) -> Result<(), CatalogError> {
    for (position, piece) in pieces.iter().enumerate() {
        sqlx::query(&format!(
            "INSERT INTO {DB_TABLE_PROGRAMME_PIECES} (programme_id, position, piece_id, sequence) \
             VALUES (?, ?, ?, ?)"
        ))
        .bind(programme_id)
        .bind(position as i64)
        .bind(piece.piece_id)
        .bind(piece.sequence)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn load_programme(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Programme, CatalogError> {
    let (title,): (String,) = sqlx::query_as(&format!(
        "SELECT title FROM {DB_TABLE_PROGRAMMES} WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CatalogError::NotFound(format!("programme {id}")))?;

    let pieces: Vec<(i64, i32)> = sqlx::query_as(&format!(
        "SELECT piece_id, sequence FROM {DB_TABLE_PROGRAMME_PIECES} \
         WHERE programme_id = ? ORDER BY position"
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Programme {
        id,
        title,
        pieces: pieces
            .into_iter()
            .map(|(piece_id, sequence)| ProgrammePiece { piece_id, sequence })
            .collect(),
    })
}

async fn load_event(conn: &mut SqliteConnection, id: i64) -> Result<Event, CatalogError> {
    sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {EVENT_COLUMNS} FROM {DB_TABLE_EVENTS} WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| CatalogError::NotFound(format!("event {id}")))?
    .try_into()
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    // Venues

    async fn get_venue(&self, id: i64) -> Result<Venue, CatalogError> {
        sqlx::query_as::<_, Venue>(&format!(
            "SELECT id, address FROM {DB_TABLE_VENUES} WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("venue {id}")))
    }

    async fn list_venues(&self) -> Result<Vec<Venue>, CatalogError> {
        Ok(sqlx::query_as::<_, Venue>(&format!(
            "SELECT id, address FROM {DB_TABLE_VENUES} ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_venue(&self, input: NewVenue) -> Result<Venue, CatalogError> {
        let address = required("address", &input.address)?;
        Ok(sqlx::query_as::<_, Venue>(&format!(
            "INSERT INTO {DB_TABLE_VENUES} (address) VALUES (?) RETURNING id, address"
        ))
        .bind(address)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_venue(&self, id: i64, patch: VenuePatch) -> Result<Venue, CatalogError> {
        let Some(address) = patch.address else {
            return Err(CatalogError::Validation("nothing to update".to_string()));
        };
        let address = required("address", &address)?;
        sqlx::query_as::<_, Venue>(&format!(
            "UPDATE {DB_TABLE_VENUES} SET address = ? WHERE id = ? RETURNING id, address"
        ))
        .bind(address)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("venue {id}")))
    }

    async fn delete_venue(&self, id: i64) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;
        require_row(&mut tx, DB_TABLE_VENUES, "venue", id).await?;
        if exists(&mut tx, DB_TABLE_EVENTS, "venue_id", id).await? {
            return Err(CatalogError::Conflict(format!(
                "venue {id} is used by an event"
            )));
        }
        sqlx::query(&format!("DELETE FROM {DB_TABLE_VENUES} WHERE id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // Composers

    async fn get_composer(&self, id: i64) -> Result<Composer, CatalogError> {
        sqlx::query_as::<_, Composer>(&format!(
            "SELECT id, short_name, full_name FROM {DB_TABLE_COMPOSERS} WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("composer {id}")))
    }

    async fn list_composers(&self) -> Result<Vec<Composer>, CatalogError> {
        Ok(sqlx::query_as::<_, Composer>(&format!(
            "SELECT id, short_name, full_name FROM {DB_TABLE_COMPOSERS} ORDER BY short_name, id"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_composer(&self, input: NewComposer) -> Result<Composer, CatalogError> {
        let short_name = required("short_name", &input.short_name)?;
        let full_name = required("full_name", &input.full_name)?;
        Ok(sqlx::query_as::<_, Composer>(&format!(
            "INSERT INTO {DB_TABLE_COMPOSERS} (short_name, full_name) VALUES (?, ?) \
             RETURNING id, short_name, full_name"
        ))
        .bind(short_name)
        .bind(full_name)
        .fetch_one(&self.pool)
        .await?)
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

        sqlx::query_as::<_, Composer>(&format!(
            "UPDATE {DB_TABLE_COMPOSERS} \
             SET short_name = COALESCE(?, short_name), full_name = COALESCE(?, full_name) \
             WHERE id = ? RETURNING id, short_name, full_name"
        ))
        .bind(short_name)
        .bind(full_name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("composer {id}")))
    }

    async fn delete_composer(&self, id: i64) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;
        require_row(&mut tx, DB_TABLE_COMPOSERS, "composer", id).await?;
        if exists(&mut tx, DB_TABLE_PIECES, "composer_id", id).await? {
            return Err(CatalogError::Conflict(format!(
                "composer {id} has pieces"
            )));
        }
        sqlx::query(&format!("DELETE FROM {DB_TABLE_COMPOSERS} WHERE id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // Pieces

    async fn get_piece(&self, id: i64) -> Result<Piece, CatalogError> {
        sqlx::query_as::<_, Piece>(&format!(
            "SELECT id, title, composer_id FROM {DB_TABLE_PIECES} WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("piece {id}")))
    }

    async fn list_pieces(&self) -> Result<Vec<Piece>, CatalogError> {
        Ok(sqlx::query_as::<_, Piece>(&format!(
            "SELECT id, title, composer_id FROM {DB_TABLE_PIECES} ORDER BY title, id"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_piece(&self, input: NewPiece) -> Result<Piece, CatalogError> {
        let title = required("title", &input.title)?;
        let mut tx = self.pool.begin().await?;
        require_reference(&mut tx, DB_TABLE_COMPOSERS, "composer", input.composer_id).await?;
        let piece = sqlx::query_as::<_, Piece>(&format!(
            "INSERT INTO {DB_TABLE_PIECES} (title, composer_id) VALUES (?, ?) \
             RETURNING id, title, composer_id"
        ))
        .bind(title)
        .bind(input.composer_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(piece)
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

        let mut tx = self.pool.begin().await?;
        if let Some(composer_id) = patch.composer_id {
            require_reference(&mut tx, DB_TABLE_COMPOSERS, "composer", composer_id).await?;
        }
        let piece = sqlx::query_as::<_, Piece>(&format!(
            "UPDATE {DB_TABLE_PIECES} \
             SET title = COALESCE(?, title), composer_id = COALESCE(?, composer_id) \
             WHERE id = ? RETURNING id, title, composer_id"
        ))
        .bind(title)
        .bind(patch.composer_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("piece {id}")))?;
        tx.commit().await?;
        Ok(piece)
    }

    async fn delete_piece(&self, id: i64) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;
        require_row(&mut tx, DB_TABLE_PIECES, "piece", id).await?;
        if exists(&mut tx, DB_TABLE_PROGRAMME_PIECES, "piece_id", id).await? {
            return Err(CatalogError::Conflict(format!(
                "piece {id} is part of a programme"
            )));
        }
        sqlx::query(&format!("DELETE FROM {DB_TABLE_PIECES} WHERE id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // Programmes

    async fn get_programme(&self, id: i64) -> Result<Programme, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        load_programme(&mut conn, id).await
    }

    async fn list_programmes(&self) -> Result<Vec<ProgrammeSummary>, CatalogError> {
        let rows: Vec<(i64, String, i64, i64)> = sqlx::query_as(&format!(
            r#"
            SELECT p.id, p.title,
                (SELECT COUNT(*) FROM {DB_TABLE_PROGRAMME_PIECES} pp WHERE pp.programme_id = p.id),
                (SELECT COUNT(*) FROM {DB_TABLE_EVENTS} e WHERE e.programme_id = p.id)
            FROM {DB_TABLE_PROGRAMMES} p
            ORDER BY p.id
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, title, piece_count, event_count)| ProgrammeSummary {
                id,
                title,
                piece_count: piece_count as usize,
                event_count: event_count as usize,
            })
            .collect())
    }

    async fn create_programme(&self, input: NewProgramme) -> Result<Programme, CatalogError> {
        let title = required("title", &input.title)?;
        let mut tx = self.pool.begin().await?;
        check_programme_pieces(&mut tx, &input.pieces).await?;

        let (id,): (i64,) = sqlx::query_as(&format!(
            "INSERT INTO {DB_TABLE_PROGRAMMES} (title) VALUES (?) RETURNING id"
        ))
        .bind(&title)
        .fetch_one(&mut *tx)
        .await?;
        let pieces = sorted(input.pieces);
        insert_programme_pieces(&mut tx, id, &pieces).await?;
        tx.commit().await?;

        Ok(Programme { id, title, pieces })
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

        let mut tx = self.pool.begin().await?;
        if let Some(pieces) = &patch.pieces {
            check_programme_pieces(&mut tx, pieces).await?;
        }
        require_row(&mut tx, DB_TABLE_PROGRAMMES, "programme", id).await?;

        if let Some(title) = title {
            sqlx::query(&format!(
                "UPDATE {DB_TABLE_PROGRAMMES} SET title = ? WHERE id = ?"
            ))
            .bind(title)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        if let Some(pieces) = patch.pieces {
            sqlx::query(&format!(
                "DELETE FROM {DB_TABLE_PROGRAMME_PIECES} WHERE programme_id = ?"
            ))
            .bind(id)
            .execute(&mut *tx)
            .await?;
            insert_programme_pieces(&mut tx, id, &sorted(pieces)).await?;
        }

        let programme = load_programme(&mut tx, id).await?;
        tx.commit().await?;
        Ok(programme)
    }

    async fn delete_programme(&self, id: i64) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;
        require_row(&mut tx, DB_TABLE_PROGRAMMES, "programme", id).await?;
        if exists(&mut tx, DB_TABLE_EVENTS, "programme_id", id).await? {
            return Err(CatalogError::Conflict(format!(
                "programme {id} is used by an event"
            )));
        }
        sqlx::query(&format!(
            "DELETE FROM {DB_TABLE_PROGRAMME_PIECES} WHERE programme_id = ?"
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM {DB_TABLE_PROGRAMMES} WHERE id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // Events

    async fn get_event(&self, id: i64) -> Result<EventDetails, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let event = load_event(&mut conn, id).await?;
        let venue = match event.venue_id {
            Some(venue_id) => sqlx::query_as::<_, Venue>(&format!(
                "SELECT id, address FROM {DB_TABLE_VENUES} WHERE id = ?"
            ))
            .bind(venue_id)
            .fetch_optional(&mut *conn)
            .await?,
            None => None,
        };
        let programme = match event.programme_id {
            Some(programme_id) => match load_programme(&mut conn, programme_id).await {
                Ok(programme) => Some(programme),
                Err(CatalogError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

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
        // NULL dates sort last under DESC
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM {DB_TABLE_EVENTS} \
             WHERE (?1 IS NULL OR status = ?1) ORDER BY date DESC, id"
        ))
        .bind(filter.status.map(|status| status.to_string()))
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let event = Event::try_from(row)?;
            let in_timeframe = match (filter.timeframe, event.date) {
                (None, _) => true,
                (Some(timeframe), Some(date)) => timeframe.contains(date, today),
                (Some(_), None) => false,
            };
            if in_timeframe {
                summaries.push(EventSummary::from(&event));
            }
        }
        Ok(summaries)
    }

    async fn create_event(&self, input: EventInput) -> Result<Event, CatalogError> {
        let title = required("title", input.title.as_deref().unwrap_or_default())?;
        let mut tx = self.pool.begin().await?;
        check_event_refs(&mut tx, &input).await?;

        let now = Utc::now();
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO {DB_TABLE_EVENTS} (
                title, date, ticket_link, venue_id, programme_id,
                status, notes, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(title)
        .bind(input.date)
        .bind(input.ticket_link)
        .bind(input.venue_id)
        .bind(input.programme_id)
        .bind(EventStatus::Draft.to_string())
        .bind(input.notes)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        row.try_into()
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

        let mut tx = self.pool.begin().await?;
        let status = load_event(&mut tx, id).await?.status;
        if status != EventStatus::Draft {
            return Err(CatalogError::ImmutableState(format!(
                "event {id} is {status}; only drafts can be edited"
            )));
        }
        check_event_refs(&mut tx, &patch).await?;

        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE {DB_TABLE_EVENTS} SET
                title = COALESCE(?, title),
                date = COALESCE(?, date),
                ticket_link = COALESCE(?, ticket_link),
                venue_id = COALESCE(?, venue_id),
                programme_id = COALESCE(?, programme_id),
                notes = COALESCE(?, notes),
                updated_at = ?
            WHERE id = ?
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(title)
        .bind(patch.date)
        .bind(patch.ticket_link)
        .bind(patch.venue_id)
        .bind(patch.programme_id)
        .bind(patch.notes)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        row.try_into()
    }

    async fn delete_event(&self, id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query(&format!("DELETE FROM {DB_TABLE_EVENTS} WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(format!("event {id}")));
        }
        Ok(())
    }

    async fn set_event_status(
        &self,
        id: i64,
        target: EventStatus,
    ) -> Result<Event, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let mut event = load_event(&mut tx, id).await?;
        if event.status == target {
            return Err(CatalogError::StatusUnchanged(target));
        }

        if target == EventStatus::Published {
            check_publishable(&event)?;
        }

        event.status = target;
        event.updated_at = Utc::now();
        sqlx::query(&format!(
            "UPDATE {DB_TABLE_EVENTS} SET status = ?, updated_at = ? WHERE id = ?"
        ))
        .bind(target.to_string())
        .bind(event.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(event_id = id, status = %target, "Event status changed");
        Ok(event)
    }

    async fn performances(
        &self,
        timeframe: Timeframe,
        today: NaiveDate,
    ) -> Result<Vec<Performance>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<(String, NaiveDate, Option<String>, String, i64)> = sqlx::query_as(&format!(
            r#"
            SELECT e.title, e.date, e.ticket_link, v.address, e.programme_id
            FROM {DB_TABLE_EVENTS} e
            JOIN {DB_TABLE_VENUES} v ON v.id = e.venue_id
            JOIN {DB_TABLE_PROGRAMMES} p ON p.id = e.programme_id
            WHERE e.status = ? AND e.date IS NOT NULL
            "#
        ))
        .bind(EventStatus::Published.to_string())
        .fetch_all(&mut *conn)
        .await?;

        let mut performances = Vec::new();
        for (title, date, ticket_link, venue, programme_id) in rows {
            if !timeframe.contains(date, today) {
                continue;
            }
            let pieces: Vec<(String, String)> = sqlx::query_as(&format!(
                r#"
                SELECT c.full_name, pc.title
                FROM {DB_TABLE_PROGRAMME_PIECES} pp
                JOIN {DB_TABLE_PIECES} pc ON pc.id = pp.piece_id
                JOIN {DB_TABLE_COMPOSERS} c ON c.id = pc.composer_id
                WHERE pp.programme_id = ?
                ORDER BY pp.position
                "#
            ))
            .bind(programme_id)
            .fetch_all(&mut *conn)
            .await?;

            performances.push(Performance {
                title,
                exact_date: date,
                date: text_date(date),
                venue,
                programme: pieces
                    .into_iter()
                    .map(|(composer, title)| PerformancePiece { composer, title })
                    .collect(),
                ticket_link: ticket_link.unwrap_or_default(),
            });
        }

        match timeframe {
            Timeframe::Upcoming => performances.sort_by_key(|p| p.exact_date),
            Timeframe::Past => performances.sort_by(|a, b| b.exact_date.cmp(&a.exact_date)),
        }
        Ok(performances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn catalog() -> SqliteCatalog {
        SqliteCatalog::connect("sqlite::memory:").await.unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Composer, piece, programme and venue ids.
    async fn seed(catalog: &SqliteCatalog) -> (i64, i64, i64, i64) {
        let composer = catalog
            .create_composer(NewComposer {
                short_name: "Bach".to_string(),
                full_name: "Johann Sebastian Bach".to_string(),
            })
            .await
            .unwrap();
        let piece = catalog
            .create_piece(NewPiece {
                title: "Cello Suite No. 1".to_string(),
                composer_id: composer.id,
            })
            .await
            .unwrap();
        let programme = catalog
            .create_programme(NewProgramme {
                title: "Suites".to_string(),
                pieces: vec![ProgrammePiece {
                    piece_id: piece.id,
                    sequence: 1,
                }],
            })
            .await
            .unwrap();
        let venue = catalog
            .create_venue(NewVenue {
                address: "Town Hall".to_string(),
            })
            .await
            .unwrap();
        (composer.id, piece.id, programme.id, venue.id)
    }

    async fn published(
        catalog: &SqliteCatalog,
        title: &str,
        date: NaiveDate,
        venue_id: i64,
        programme_id: i64,
    ) -> Event {
        let event = catalog
            .create_event(EventInput {
                title: Some(title.to_string()),
                date: Some(date),
                ticket_link: Some("https://tickets.example/1".to_string()),
                venue_id: Some(venue_id),
                programme_id: Some(programme_id),
                notes: None,
            })
            .await
            .unwrap();
        catalog
            .set_event_status(event.id, EventStatus::Published)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_venue_crud() {
        let catalog = catalog().await;
        let venue = catalog
            .create_venue(NewVenue {
                address: "  Town Hall ".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(venue.address, "Town Hall");

        let updated = catalog
            .update_venue(
                venue.id,
                VenuePatch {
                    address: Some("Old Church".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(catalog.get_venue(venue.id).await.unwrap(), updated);
        assert_eq!(catalog.list_venues().await.unwrap(), vec![updated]);

        catalog.delete_venue(venue.id).await.unwrap();
        assert_eq!(
            catalog.get_venue(venue.id).await,
            Err(CatalogError::NotFound(format!("venue {}", venue.id)))
        );
        assert_eq!(
            catalog.update_venue(venue.id, VenuePatch::default()).await,
            Err(CatalogError::Validation("nothing to update".to_string()))
        );
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let catalog = catalog().await;
        let first = catalog
            .create_venue(NewVenue {
                address: "A".to_string(),
            })
            .await
            .unwrap();
        catalog.delete_venue(first.id).await.unwrap();
        let second = catalog
            .create_venue(NewVenue {
                address: "B".to_string(),
            })
            .await
            .unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_missing_references_conflict() {
        let catalog = catalog().await;
        assert_eq!(
            catalog
                .create_piece(NewPiece {
                    title: "Orphan".to_string(),
                    composer_id: 42,
                })
                .await,
            Err(CatalogError::Conflict(
                "referenced composer 42 does not exist".to_string()
            ))
        );
        assert!(matches!(
            catalog
                .create_programme(NewProgramme {
                    title: "Empty".to_string(),
                    pieces: vec![ProgrammePiece {
                        piece_id: 7,
                        sequence: 1,
                    }],
                })
                .await,
            Err(CatalogError::Conflict(_))
        ));
        assert!(matches!(
            catalog
                .create_event(EventInput {
                    title: Some("Gala".to_string()),
                    venue_id: Some(3),
                    ..Default::default()
                })
                .await,
            Err(CatalogError::Conflict(_))
        ));
        assert!(catalog.list_programmes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_referenced_records_cannot_be_deleted() {
        let catalog = catalog().await;
        let (composer, piece, programme, venue) = seed(&catalog).await;
        published(&catalog, "Gala", day(2026, 5, 1), venue, programme).await;

        for result in [
            catalog.delete_composer(composer).await,
            catalog.delete_piece(piece).await,
            catalog.delete_programme(programme).await,
            catalog.delete_venue(venue).await,
        ] {
            assert!(matches!(result, Err(CatalogError::Conflict(_))), "{result:?}");
        }
        assert_eq!(catalog.get_composer(composer).await.unwrap().short_name, "Bach");
    }

    #[tokio::test]
    async fn test_programme_keeps_submitted_order_for_equal_sequences() {
        let catalog = catalog().await;
        let (composer, first, _, _) = seed(&catalog).await;
        let second = catalog
            .create_piece(NewPiece {
                title: "Partita No. 2".to_string(),
                composer_id: composer,
            })
            .await
            .unwrap()
            .id;

        let programme = catalog
            .create_programme(NewProgramme {
                title: "Mixed".to_string(),
                pieces: vec![
                    ProgrammePiece {
                        piece_id: second,
                        sequence: 2,
                    },
                    ProgrammePiece {
                        piece_id: first,
                        sequence: 1,
                    },
                    ProgrammePiece {
                        piece_id: second,
                        sequence: 1,
                    },
                ],
            })
            .await
            .unwrap();

        let stored = catalog.get_programme(programme.id).await.unwrap();
        let order: Vec<(i64, i32)> = stored
            .pieces
            .iter()
            .map(|p| (p.piece_id, p.sequence))
            .collect();
        assert_eq!(order, vec![(first, 1), (second, 1), (second, 2)]);
        assert_eq!(stored, programme);

        let updated = catalog
            .update_programme(
                programme.id,
                ProgrammePatch {
                    title: None,
                    pieces: Some(vec![ProgrammePiece {
                        piece_id: first,
                        sequence: 5,
                    }]),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Mixed");
        assert_eq!(updated.pieces.len(), 1);

        let summary = catalog
            .list_programmes()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.id == programme.id)
            .unwrap();
        assert_eq!(summary.piece_count, 1);
        assert_eq!(summary.event_count, 0);
    }

    #[tokio::test]
    async fn test_event_lifecycle() {
        let catalog = catalog().await;
        let (_, _, programme, venue) = seed(&catalog).await;
        let event = catalog
            .create_event(EventInput {
                title: Some("Gala".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(event.status, EventStatus::Draft);

        let err = catalog
            .set_event_status(event.id, EventStatus::Published)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::Validation(
                "cannot publish without date, ticket_link, venue_id, programme_id".to_string()
            )
        );

        let edited = catalog
            .update_event(
                event.id,
                EventInput {
                    date: Some(day(2026, 5, 1)),
                    ticket_link: Some("https://tickets.example/gala".to_string()),
                    venue_id: Some(venue),
                    programme_id: Some(programme),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.title, "Gala");
        assert_eq!(edited.venue_id, Some(venue));

        let live = catalog
            .set_event_status(event.id, EventStatus::Published)
            .await
            .unwrap();
        assert_eq!(live.status, EventStatus::Published);
        assert_eq!(
            catalog
                .set_event_status(event.id, EventStatus::Published)
                .await,
            Err(CatalogError::StatusUnchanged(EventStatus::Published))
        );
        assert!(matches!(
            catalog
                .update_event(
                    event.id,
                    EventInput {
                        notes: Some("late".to_string()),
                        ..Default::default()
                    },
                )
                .await,
            Err(CatalogError::ImmutableState(_))
        ));

        let details = catalog.get_event(event.id).await.unwrap();
        assert_eq!(details.event, live);
        assert_eq!(details.text_date.as_deref(), Some("1 May, 2026"));
        assert_eq!(details.venue.unwrap().address, "Town Hall");
        assert_eq!(details.programme.unwrap().title, "Suites");

        catalog.delete_event(event.id).await.unwrap();
        assert_eq!(
            catalog.delete_event(event.id).await,
            Err(CatalogError::NotFound(format!("event {}", event.id)))
        );
    }

    #[tokio::test]
    async fn test_list_events_orders_and_filters() {
        let catalog = catalog().await;
        let (_, _, programme, venue) = seed(&catalog).await;
        let today = day(2026, 3, 1);
        let undated = catalog
            .create_event(EventInput {
                title: Some("Someday".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let old = published(&catalog, "Old", day(2025, 12, 1), venue, programme).await;
        let soon = published(&catalog, "Soon", day(2026, 4, 1), venue, programme).await;

        let ids: Vec<i64> = catalog
            .list_events(EventFilter::default(), today)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![soon.id, old.id, undated.id]);

        let filter = EventFilter {
            status: Some(EventStatus::Published),
            timeframe: Some(Timeframe::Past),
        };
        let past = catalog.list_events(filter, today).await.unwrap();
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].id, old.id);

        let drafts = EventFilter {
            status: Some(EventStatus::Draft),
            timeframe: None,
        };
        assert_eq!(
            catalog.list_events(drafts, today).await.unwrap()[0].id,
            undated.id
        );
    }

    #[tokio::test]
    async fn test_performances_split_by_today() {
        let catalog = catalog().await;
        let (_, _, programme, venue) = seed(&catalog).await;
        let today = day(2026, 3, 1);
        published(&catalog, "Later", day(2026, 6, 1), venue, programme).await;
        published(&catalog, "Today", today, venue, programme).await;
        published(&catalog, "Last year", day(2025, 3, 1), venue, programme).await;
        catalog
            .create_event(EventInput {
                title: Some("Draft".to_string()),
                date: Some(day(2026, 4, 1)),
                ..Default::default()
            })
            .await
            .unwrap();

        let upcoming = catalog
            .performances(Timeframe::Upcoming, today)
            .await
            .unwrap();
        let titles: Vec<&str> = upcoming.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Today", "Later"]);
        assert_eq!(upcoming[0].date, "1 March, 2026");
        assert_eq!(upcoming[0].venue, "Town Hall");
        assert_eq!(
            upcoming[0].programme,
            vec![PerformancePiece {
                composer: "Johann Sebastian Bach".to_string(),
                title: "Cello Suite No. 1".to_string(),
            }]
        );

        let past = catalog.performances(Timeframe::Past, today).await.unwrap();
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].title, "Last year");
    }

    #[tokio::test]
    async fn test_reconnecting_keeps_tables() {
        // Table creation is idempotent
        let catalog = catalog().await;
        catalog.create_tables().await.unwrap();
        seed(&catalog).await;
        assert_eq!(catalog.list_composers().await.unwrap().len(), 1);
    }
}

//! SQLite-based journal storage.
//!
//! Provides persistent storage for:
//! - Experiences (titled sessions)
//! - Ingestions, each belonging to one experience
//! - Key-value store for application state

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::data_dir;
use crate::error::{DatabaseError, Result, ValidationError};
use crate::journal::{Experience, ExperienceCandidate, Ingestion, NewExperience, NewIngestion};
use crate::substance::AdministrationRoute;

const INGESTION_COLUMNS: &str = "id, experience_id, substance_name, time, route, dose,
     is_dose_an_estimate, estimated_dose_standard_deviation, units, notes, consumer_name";

const EXPERIENCE_COLUMNS: &str = "id, title, text, creation_date, sort_date, is_favorite";

/// Read access to logged ingestions.
///
/// Timeline, statistics and search callers depend on this rather than on
/// [`Database`] directly.
pub trait IngestionStore {
    /// Ingestions of one experience, oldest first.
    fn ingestions_for_experience(&self, experience_id: i64) -> Result<Vec<Ingestion>>;

    /// Ingestions at or after `since` (all when `None`), newest first.
    fn ingestions_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Ingestion>>;

    /// Distinct substance names, most recently taken first.
    fn last_used_substance_names(&self, limit: usize) -> Result<Vec<String>>;
}

/// Timestamps are stored as fixed-width UTC strings so text order is time order.
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(column: &str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::CorruptValue {
            column: column.to_string(),
            value: value.to_string(),
        })
}

struct ExperienceRow {
    id: i64,
    title: String,
    text: String,
    creation_date: String,
    sort_date: String,
    is_favorite: bool,
}

impl ExperienceRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            text: row.get(2)?,
            creation_date: row.get(3)?,
            sort_date: row.get(4)?,
            is_favorite: row.get(5)?,
        })
    }

    fn decode(self) -> Result<Experience, DatabaseError> {
        Ok(Experience {
            id: self.id,
            title: self.title,
            text: self.text,
            creation_date: parse_time("creation_date", &self.creation_date)?,
            sort_date: parse_time("sort_date", &self.sort_date)?,
            is_favorite: self.is_favorite,
        })
    }
}

struct IngestionRow {
    id: i64,
    experience_id: i64,
    substance_name: String,
    time: String,
    route: String,
    dose: Option<f64>,
    is_dose_an_estimate: bool,
    estimated_dose_standard_deviation: Option<f64>,
    units: String,
    notes: Option<String>,
    consumer_name: Option<String>,
}

impl IngestionRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            experience_id: row.get(1)?,
            substance_name: row.get(2)?,
            time: row.get(3)?,
            route: row.get(4)?,
            dose: row.get(5)?,
            is_dose_an_estimate: row.get(6)?,
            estimated_dose_standard_deviation: row.get(7)?,
            units: row.get(8)?,
            notes: row.get(9)?,
            consumer_name: row.get(10)?,
        })
    }

    fn decode(self) -> Result<Ingestion, DatabaseError> {
        let route: AdministrationRoute =
            self.route.parse().map_err(|_| DatabaseError::CorruptValue {
                column: "route".into(),
                value: self.route.clone(),
            })?;
        Ok(Ingestion {
            id: self.id,
            experience_id: self.experience_id,
            substance_name: self.substance_name,
            time: parse_time("time", &self.time)?,
            route,
            dose: self.dose,
            is_dose_an_estimate: self.is_dose_an_estimate,
            estimated_dose_standard_deviation: self.estimated_dose_standard_deviation,
            units: self.units,
            notes: self.notes,
            consumer_name: self.consumer_name,
        })
    }
}

/// SQLite database for the journal.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/doselog.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("doselog.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "opened journal database");
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS experiences (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                title         TEXT NOT NULL,
                text          TEXT NOT NULL DEFAULT '',
                creation_date TEXT NOT NULL,
                sort_date     TEXT NOT NULL,
                is_favorite   INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS ingestions (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                experience_id  INTEGER NOT NULL REFERENCES experiences(id) ON DELETE CASCADE,
                substance_name TEXT NOT NULL,
                time           TEXT NOT NULL,
                route          TEXT NOT NULL,
                dose           REAL,
                is_dose_an_estimate INTEGER NOT NULL DEFAULT 0,
                estimated_dose_standard_deviation REAL,
                units          TEXT NOT NULL DEFAULT '',
                notes          TEXT,
                consumer_name  TEXT
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_ingestions_time ON ingestions(time);
            CREATE INDEX IF NOT EXISTS idx_ingestions_experience ON ingestions(experience_id, time);
            CREATE INDEX IF NOT EXISTS idx_experiences_sort_date ON experiences(sort_date);",
        )?;
        Ok(())
    }

    // ── Experiences ──────────────────────────────────────────────────

    /// Insert an experience; returns its id.
    pub fn insert_experience(&self, experience: &NewExperience) -> Result<i64> {
        experience.validate()?;
        self.conn.execute(
            "INSERT INTO experiences (title, text, creation_date, sort_date, is_favorite)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![
                experience.title.trim(),
                experience.text,
                format_time(Utc::now()),
                format_time(experience.sort_date),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, title = %experience.title, "inserted experience");
        Ok(id)
    }

    pub fn get_experience(&self, id: i64) -> Result<Option<Experience>> {
        let sql = format!("SELECT {EXPERIENCE_COLUMNS} FROM experiences WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], ExperienceRow::read)
            .optional()?;
        Ok(row.map(ExperienceRow::decode).transpose()?)
    }

    /// All experiences, most recent sort date first.
    pub fn list_experiences(&self) -> Result<Vec<Experience>> {
        let sql = format!("SELECT {EXPERIENCE_COLUMNS} FROM experiences ORDER BY sort_date DESC, id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], ExperienceRow::read)?;
        let mut experiences = Vec::new();
        for row in rows {
            experiences.push(row?.decode()?);
        }
        Ok(experiences)
    }

    pub fn update_experience_favorite(&self, id: i64, is_favorite: bool) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE experiences SET is_favorite = ?1 WHERE id = ?2",
            params![is_favorite, id],
        )?;
        if changed == 0 {
            return Err(ValidationError::UnknownExperience(id).into());
        }
        Ok(())
    }

    /// Delete an experience together with its ingestions.
    pub fn delete_experience(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM experiences WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(ValidationError::UnknownExperience(id).into());
        }
        tracing::debug!(id, "deleted experience");
        Ok(())
    }

    /// Experiences that have ingestions, with their latest ingestion time.
    pub fn experiences_with_last_ingestion(&self) -> Result<Vec<ExperienceCandidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.id, e.title, MAX(i.time)
             FROM experiences e
             JOIN ingestions i ON i.experience_id = e.id
             GROUP BY e.id, e.title
             ORDER BY MAX(i.time) DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut candidates = Vec::new();
        for row in rows {
            let (experience_id, title, last) = row?;
            candidates.push(ExperienceCandidate {
                experience_id,
                title,
                last_ingestion_time: parse_time("time", &last)?,
            });
        }
        Ok(candidates)
    }

    // ── Ingestions ───────────────────────────────────────────────────

    /// Insert an ingestion into an existing experience; returns its id.
    pub fn insert_ingestion(&self, ingestion: &NewIngestion) -> Result<i64> {
        ingestion.validate()?;
        if self.get_experience(ingestion.experience_id)?.is_none() {
            return Err(ValidationError::UnknownExperience(ingestion.experience_id).into());
        }
        self.conn.execute(
            "INSERT INTO ingestions (experience_id, substance_name, time, route, dose,
                 is_dose_an_estimate, estimated_dose_standard_deviation, units, notes, consumer_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                ingestion.experience_id,
                ingestion.substance_name.trim(),
                format_time(ingestion.time),
                ingestion.route.display_text(),
                ingestion.dose,
                ingestion.is_dose_an_estimate,
                ingestion.estimated_dose_standard_deviation,
                ingestion.units,
                ingestion.notes,
                ingestion.consumer_name,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(
            id,
            experience_id = ingestion.experience_id,
            substance = %ingestion.substance_name,
            "inserted ingestion"
        );
        Ok(id)
    }

    pub fn get_ingestion(&self, id: i64) -> Result<Option<Ingestion>> {
        let sql = format!("SELECT {INGESTION_COLUMNS} FROM ingestions WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], IngestionRow::read)
            .optional()?;
        Ok(row.map(IngestionRow::decode).transpose()?)
    }

    pub fn delete_ingestion(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM ingestions WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(ValidationError::UnknownIngestion(id).into());
        }
        Ok(())
    }

    /// Every ingestion, newest first.
    pub fn all_ingestions(&self) -> Result<Vec<Ingestion>> {
        self.ingestions_since(None)
    }

    fn query_ingestions(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Ingestion>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, IngestionRow::read)?;
        let mut ingestions = Vec::new();
        for row in rows {
            ingestions.push(row?.decode()?);
        }
        Ok(ingestions)
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl IngestionStore for Database {
    fn ingestions_for_experience(&self, experience_id: i64) -> Result<Vec<Ingestion>> {
        let sql = format!(
            "SELECT {INGESTION_COLUMNS} FROM ingestions WHERE experience_id = ?1 ORDER BY time ASC, id ASC"
        );
        self.query_ingestions(&sql, params![experience_id])
    }

    fn ingestions_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Ingestion>> {
        match since {
            Some(since) => {
                let sql = format!(
                    "SELECT {INGESTION_COLUMNS} FROM ingestions WHERE time >= ?1 ORDER BY time DESC, id DESC"
                );
                self.query_ingestions(&sql, params![format_time(since)])
            }
            None => {
                let sql =
                    format!("SELECT {INGESTION_COLUMNS} FROM ingestions ORDER BY time DESC, id DESC");
                self.query_ingestions(&sql, [])
            }
        }
    }

    fn last_used_substance_names(&self, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT substance_name, MAX(time) AS last_time
             FROM ingestions
             GROUP BY substance_name COLLATE NOCASE
             ORDER BY last_time DESC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap()
    }

    fn experience(db: &Database, title: &str, sort_date: DateTime<Utc>) -> i64 {
        db.insert_experience(&NewExperience {
            title: title.into(),
            text: String::new(),
            sort_date,
        })
        .unwrap()
    }

    fn ingestion(experience_id: i64, name: &str, time: DateTime<Utc>) -> NewIngestion {
        NewIngestion {
            experience_id,
            substance_name: name.into(),
            time,
            route: AdministrationRoute::Oral,
            dose: Some(100.0),
            is_dose_an_estimate: false,
            estimated_dose_standard_deviation: None,
            units: "mg".into(),
            notes: None,
            consumer_name: None,
        }
    }

    #[test]
    fn experience_roundtrip_and_ordering() {
        let db = Database::open_memory().unwrap();
        let older = experience(&db, "Older", t0() - Duration::days(3));
        let newer = experience(&db, "Newer", t0());

        let listed = db.list_experiences().unwrap();
        let ids: Vec<i64> = listed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![newer, older]);

        let fetched = db.get_experience(older).unwrap().unwrap();
        assert_eq!(fetched.title, "Older");
        assert_eq!(fetched.sort_date, t0() - Duration::days(3));
        assert!(!fetched.is_favorite);

        db.update_experience_favorite(older, true).unwrap();
        assert!(db.get_experience(older).unwrap().unwrap().is_favorite);
        assert!(db.get_experience(999).unwrap().is_none());
    }

    #[test]
    fn ingestion_fields_survive_storage() {
        let db = Database::open_memory().unwrap();
        let exp = experience(&db, "Evening", t0());
        let mut new = ingestion(exp, "MDMA", t0());
        new.is_dose_an_estimate = true;
        new.estimated_dose_standard_deviation = Some(10.0);
        new.notes = Some("with water".into());
        new.consumer_name = Some("Alex".into());
        let id = db.insert_ingestion(&new).unwrap();

        let stored = db.get_ingestion(id).unwrap().unwrap();
        assert_eq!(stored.substance_name, "MDMA");
        assert_eq!(stored.time, t0());
        assert_eq!(stored.route, AdministrationRoute::Oral);
        assert_eq!(stored.estimated_dose_standard_deviation, Some(10.0));
        assert_eq!(stored.consumer_name.as_deref(), Some("Alex"));
    }

    #[test]
    fn ingestions_for_experience_are_time_ordered() {
        let db = Database::open_memory().unwrap();
        let exp = experience(&db, "Evening", t0());
        db.insert_ingestion(&ingestion(exp, "B", t0() + Duration::hours(2))).unwrap();
        db.insert_ingestion(&ingestion(exp, "A", t0())).unwrap();

        let names: Vec<String> = db
            .ingestions_for_experience(exp)
            .unwrap()
            .into_iter()
            .map(|i| i.substance_name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn deleting_experience_cascades() {
        let db = Database::open_memory().unwrap();
        let exp = experience(&db, "Evening", t0());
        let id = db.insert_ingestion(&ingestion(exp, "Caffeine", t0())).unwrap();

        db.delete_experience(exp).unwrap();
        assert!(db.get_ingestion(id).unwrap().is_none());
        assert!(db.all_ingestions().unwrap().is_empty());
        assert!(matches!(
            db.delete_experience(exp),
            Err(CoreError::Validation(ValidationError::UnknownExperience(_)))
        ));
    }

    #[test]
    fn insert_rejects_invalid_input() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.insert_ingestion(&ingestion(42, "Caffeine", t0())),
            Err(CoreError::Validation(ValidationError::UnknownExperience(42)))
        ));

        let exp = experience(&db, "Evening", t0());
        let mut negative = ingestion(exp, "Caffeine", t0());
        negative.dose = Some(-1.0);
        assert!(db.insert_ingestion(&negative).is_err());
        assert!(db
            .insert_experience(&NewExperience {
                title: "  ".into(),
                text: String::new(),
                sort_date: t0(),
            })
            .is_err());
    }

    #[test]
    fn since_filter_and_recent_names() {
        let db = Database::open_memory().unwrap();
        let exp = experience(&db, "Week", t0());
        db.insert_ingestion(&ingestion(exp, "Caffeine", t0() - Duration::days(10))).unwrap();
        db.insert_ingestion(&ingestion(exp, "LSD", t0() - Duration::days(5))).unwrap();
        db.insert_ingestion(&ingestion(exp, "caffeine", t0())).unwrap();

        let recent = db.ingestions_since(Some(t0() - Duration::days(6))).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].substance_name, "caffeine");

        let names = db.last_used_substance_names(10).unwrap();
        assert_eq!(names.len(), 2);
        assert!(names[0].eq_ignore_ascii_case("caffeine"));
        assert_eq!(names[1], "LSD");
        assert_eq!(db.last_used_substance_names(1).unwrap().len(), 1);
    }

    #[test]
    fn candidates_carry_latest_ingestion_time() {
        let db = Database::open_memory().unwrap();
        let exp = experience(&db, "Evening", t0());
        experience(&db, "Empty", t0());
        db.insert_ingestion(&ingestion(exp, "A", t0())).unwrap();
        db.insert_ingestion(&ingestion(exp, "B", t0() + Duration::hours(3))).unwrap();

        let candidates = db.experiences_with_last_ingestion().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].last_ingestion_time, t0() + Duration::hours(3));
    }

    #[test]
    fn corrupt_route_is_reported() {
        let db = Database::open_memory().unwrap();
        let exp = experience(&db, "Evening", t0());
        let id = db.insert_ingestion(&ingestion(exp, "A", t0())).unwrap();
        db.conn()
            .execute("UPDATE ingestions SET route = 'teleported' WHERE id = ?1", params![id])
            .unwrap();
        assert!(matches!(
            db.get_ingestion(id),
            Err(CoreError::Database(DatabaseError::CorruptValue { .. }))
        ));
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");
        {
            let db = Database::open_at(&path).unwrap();
            experience(&db, "Kept", t0());
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.list_experiences().unwrap().len(), 1);
    }
}

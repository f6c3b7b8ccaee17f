use crate::domain::models::{AcademicCalendarDay, CalendarDayType, SessionStatus, TrainingSession};
use crate::infrastructure::error::InfraError;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEDULE_SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Creates the sessions and academic_calendar tables if they are missing.
/// Safe to run on every startup.
pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEDULE_SCHEMA_SQL)?;
    Ok(())
}

/// Durable mirror of the in-memory session/calendar collections; the
/// lifecycle store stays authoritative, the repository just survives
/// app restarts.
pub trait ScheduleRepository: Send + Sync {
    fn load_sessions(&self) -> Result<Vec<TrainingSession>, InfraError>;
    fn upsert_session(&self, session: &TrainingSession) -> Result<(), InfraError>;
    fn replace_sessions(&self, sessions: &[TrainingSession]) -> Result<(), InfraError>;
    fn load_calendar(&self) -> Result<Vec<AcademicCalendarDay>, InfraError>;
    fn replace_calendar(&self, days: &[AcademicCalendarDay]) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteScheduleRepository {
    db_path: PathBuf,
}

#[derive(Debug)]
struct RawSessionRow {
    id: String,
    topic: String,
    planned_topics: String,
    batch: String,
    year: i64,
    venue: String,
    trainer_id: String,
    trainer_name: String,
    date: String,
    start_time: String,
    end_time: String,
    status: String,
    cancellation_reason: Option<String>,
    actual_start_time: Option<String>,
    actual_end_time: Option<String>,
    topic_covered: Option<i64>,
    verified_topics: String,
    is_late: Option<i64>,
}

impl SqliteScheduleRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }

    fn raw_session_from_row(row: &Row<'_>) -> rusqlite::Result<RawSessionRow> {
        Ok(RawSessionRow {
            id: row.get("id")?,
            topic: row.get("topic")?,
            planned_topics: row.get("planned_topics")?,
            batch: row.get("batch")?,
            year: row.get("year")?,
            venue: row.get("venue")?,
            trainer_id: row.get("trainer_id")?,
            trainer_name: row.get("trainer_name")?,
            date: row.get("date")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            status: row.get("status")?,
            cancellation_reason: row.get("cancellation_reason")?,
            actual_start_time: row.get("actual_start_time")?,
            actual_end_time: row.get("actual_end_time")?,
            topic_covered: row.get("topic_covered")?,
            verified_topics: row.get("verified_topics")?,
            is_late: row.get("is_late")?,
        })
    }

    fn decode_session(raw: RawSessionRow) -> Result<TrainingSession, InfraError> {
        let status = SessionStatus::parse(&raw.status).ok_or_else(|| {
            InfraError::InvalidConfig(format!(
                "invalid sessions.status '{}' for session {}",
                raw.status, raw.id
            ))
        })?;
        Ok(TrainingSession {
            id: raw.id,
            topic: raw.topic,
            planned_topics: serde_json::from_str(&raw.planned_topics)?,
            batch: raw.batch,
            year: raw.year as u8,
            venue: raw.venue,
            trainer_id: raw.trainer_id,
            trainer_name: raw.trainer_name,
            date: raw.date,
            start_time: raw.start_time,
            end_time: raw.end_time,
            status,
            cancellation_reason: raw.cancellation_reason,
            actual_start_time: raw.actual_start_time,
            actual_end_time: raw.actual_end_time,
            topic_covered: raw.topic_covered.map(|value| value != 0),
            verified_topics: serde_json::from_str(&raw.verified_topics)?,
            is_late: raw.is_late.map(|value| value != 0),
        })
    }

    fn write_session(connection: &Connection, session: &TrainingSession) -> Result<(), InfraError> {
        connection.execute(
            "INSERT INTO sessions (
                 id, topic, planned_topics, batch, year, venue, trainer_id, trainer_name,
                 date, start_time, end_time, status, cancellation_reason,
                 actual_start_time, actual_end_time, topic_covered, verified_topics, is_late
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
             ON CONFLICT(id) DO UPDATE SET
               topic = excluded.topic,
               planned_topics = excluded.planned_topics,
               batch = excluded.batch,
               year = excluded.year,
               venue = excluded.venue,
               trainer_id = excluded.trainer_id,
               trainer_name = excluded.trainer_name,
               date = excluded.date,
               start_time = excluded.start_time,
               end_time = excluded.end_time,
               status = excluded.status,
               cancellation_reason = excluded.cancellation_reason,
               actual_start_time = excluded.actual_start_time,
               actual_end_time = excluded.actual_end_time,
               topic_covered = excluded.topic_covered,
               verified_topics = excluded.verified_topics,
               is_late = excluded.is_late",
            params![
                session.id,
                session.topic,
                serde_json::to_string(&session.planned_topics)?,
                session.batch,
                session.year as i64,
                session.venue,
                session.trainer_id,
                session.trainer_name,
                session.date,
                session.start_time,
                session.end_time,
                session.status.as_str(),
                session.cancellation_reason,
                session.actual_start_time,
                session.actual_end_time,
                session.topic_covered.map(i64::from),
                serde_json::to_string(&session.verified_topics)?,
                session.is_late.map(i64::from),
            ],
        )?;
        Ok(())
    }
}

impl ScheduleRepository for SqliteScheduleRepository {
    fn load_sessions(&self) -> Result<Vec<TrainingSession>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT id, topic, planned_topics, batch, year, venue, trainer_id, trainer_name,
                    date, start_time, end_time, status, cancellation_reason,
                    actual_start_time, actual_end_time, topic_covered, verified_topics, is_late
             FROM sessions
             ORDER BY date, start_time, id",
        )?;
        let rows = statement.query_map([], Self::raw_session_from_row)?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(Self::decode_session(row?)?);
        }
        Ok(sessions)
    }

    fn upsert_session(&self, session: &TrainingSession) -> Result<(), InfraError> {
        let connection = self.connect()?;
        Self::write_session(&connection, session)
    }

    fn replace_sessions(&self, sessions: &[TrainingSession]) -> Result<(), InfraError> {
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        transaction.execute("DELETE FROM sessions", [])?;
        for session in sessions {
            Self::write_session(&transaction, session)?;
        }
        transaction.commit()?;
        Ok(())
    }

    fn load_calendar(&self) -> Result<Vec<AcademicCalendarDay>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare("SELECT date, day_type, description FROM academic_calendar ORDER BY date")?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut days = Vec::new();
        for row in rows {
            let (date, day_type_raw, description) = row?;
            let day_type = CalendarDayType::parse(&day_type_raw).ok_or_else(|| {
                InfraError::InvalidConfig(format!(
                    "invalid academic_calendar.day_type '{day_type_raw}' for {date}"
                ))
            })?;
            days.push(AcademicCalendarDay {
                date,
                day_type,
                description,
            });
        }
        Ok(days)
    }

    fn replace_calendar(&self, days: &[AcademicCalendarDay]) -> Result<(), InfraError> {
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        transaction.execute("DELETE FROM academic_calendar", [])?;
        for day in days {
            transaction.execute(
                "INSERT INTO academic_calendar (date, day_type, description)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(date) DO UPDATE SET
                   day_type = excluded.day_type,
                   description = excluded.description",
                params![day.date, day.day_type.as_str(), day.description],
            )?;
        }
        transaction.commit()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryScheduleRepository {
    sessions: Mutex<Vec<TrainingSession>>,
    calendar: Mutex<Vec<AcademicCalendarDay>>,
}

impl InMemoryScheduleRepository {
    fn lock_sessions(&self) -> Result<std::sync::MutexGuard<'_, Vec<TrainingSession>>, InfraError> {
        self.sessions
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("session lock poisoned: {error}")))
    }

    fn lock_calendar(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Vec<AcademicCalendarDay>>, InfraError> {
        self.calendar
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("calendar lock poisoned: {error}")))
    }
}

impl ScheduleRepository for InMemoryScheduleRepository {
    fn load_sessions(&self) -> Result<Vec<TrainingSession>, InfraError> {
        Ok(self.lock_sessions()?.clone())
    }

    fn upsert_session(&self, session: &TrainingSession) -> Result<(), InfraError> {
        let mut sessions = self.lock_sessions()?;
        if let Some(existing) = sessions.iter_mut().find(|stored| stored.id == session.id) {
            *existing = session.clone();
        } else {
            sessions.push(session.clone());
        }
        Ok(())
    }

    fn replace_sessions(&self, sessions: &[TrainingSession]) -> Result<(), InfraError> {
        *self.lock_sessions()? = sessions.to_vec();
        Ok(())
    }

    fn load_calendar(&self) -> Result<Vec<AcademicCalendarDay>, InfraError> {
        Ok(self.lock_calendar()?.clone())
    }

    fn replace_calendar(&self, days: &[AcademicCalendarDay]) -> Result<(), InfraError> {
        *self.lock_calendar()? = days.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::sample_session;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    struct TempDb {
        dir: PathBuf,
        path: PathBuf,
    }

    impl TempDb {
        fn new() -> Self {
            let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
            let dir = std::env::temp_dir().join(format!(
                "trainops-repo-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&dir).expect("create temp dir");
            let path = dir.join("trainops.sqlite");
            initialize_database(&path).expect("initialize database");
            Self { dir, path }
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    fn verified_session() -> TrainingSession {
        let mut session = sample_session();
        session.id = "ses-verified".to_string();
        session.status = SessionStatus::Verified;
        session.actual_start_time = Some("10:05".to_string());
        session.actual_end_time = Some("12:30".to_string());
        session.topic_covered = Some(false);
        session.verified_topics = vec!["BFS Implementation".to_string()];
        session.is_late = Some(true);
        session
    }

    fn repositories() -> (SqliteScheduleRepository, InMemoryScheduleRepository, TempDb) {
        let db = TempDb::new();
        (
            SqliteScheduleRepository::new(&db.path),
            InMemoryScheduleRepository::default(),
            db,
        )
    }

    #[test]
    fn sessions_roundtrip_in_both_repositories() {
        let (sqlite, in_memory, _db) = repositories();
        let sessions = vec![sample_session(), verified_session()];

        for repository in [&sqlite as &dyn ScheduleRepository, &in_memory] {
            repository.replace_sessions(&sessions).expect("replace");
            let loaded = repository.load_sessions().expect("load");
            assert_eq!(loaded.len(), 2);
            assert!(loaded.contains(&sessions[0]));
            assert!(loaded.contains(&sessions[1]));
        }
    }

    #[test]
    fn upsert_updates_in_place() {
        let (sqlite, in_memory, _db) = repositories();
        for repository in [&sqlite as &dyn ScheduleRepository, &in_memory] {
            let mut session = sample_session();
            repository.upsert_session(&session).expect("insert");
            session.topic = "Dynamic Programming".to_string();
            repository.upsert_session(&session).expect("update");

            let loaded = repository.load_sessions().expect("load");
            assert_eq!(loaded.len(), 1);
            assert_eq!(loaded[0].topic, "Dynamic Programming");
        }
    }

    #[test]
    fn calendar_roundtrip() {
        let (sqlite, in_memory, _db) = repositories();
        let days = vec![
            AcademicCalendarDay {
                date: "2025-07-07".to_string(),
                day_type: CalendarDayType::Instruction,
                description: "1st spell of Instructions".to_string(),
            },
            AcademicCalendarDay {
                date: "2025-09-29".to_string(),
                day_type: CalendarDayType::Holiday,
                description: "Dussera Vacation".to_string(),
            },
        ];

        for repository in [&sqlite as &dyn ScheduleRepository, &in_memory] {
            repository.replace_calendar(&days).expect("replace");
            assert_eq!(repository.load_calendar().expect("load"), days);
        }
    }
}

use crate::application::almanac::import_almanac;
use crate::application::bootstrap::bootstrap_workspace;
use crate::application::generation::ScheduleGenerationService;
use crate::application::store::{RejectedSession, SessionStore};
use crate::domain::expansion::{expand_pattern, materialize_upcoming_week};
use crate::domain::models::{
    next_id, weekday_name, AcademicCalendarDay, CalendarDayType, SessionStatus, TrainingSession,
};
use crate::infrastructure::config::{load_setup_bundle, read_rest_day, read_timezone};
use crate::infrastructure::credential_store::{ApiKeyStore, KeyringApiKeyStore};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::pattern_client::{PatternGeneratorClient, ReqwestPatternClient};
use crate::infrastructure::schedule_repository::{ScheduleRepository, SqliteScheduleRepository};
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

const SCHEDULE_GENERATION_TARGET_MS: u128 = 30_000;

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    logs_dir: PathBuf,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config_dir = workspace_root.join("config");
        let logs_dir = workspace_root.join("logs");

        let repository = SqliteScheduleRepository::new(&bootstrap.database_path);
        let runtime = RuntimeState {
            store: SessionStore::from_sessions(repository.load_sessions()?),
            calendar: repository.load_calendar()?,
        };

        Ok(Self {
            config_dir,
            database_path: bootstrap.database_path,
            logs_dir,
            runtime: Mutex::new(runtime),
            log_guard: Mutex::new(()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Default)]
struct RuntimeState {
    store: SessionStore,
    calendar: Vec<AcademicCalendarDay>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportAlmanacResponse {
    pub days_imported: usize,
    pub instruction_days: usize,
    pub rows_processed: usize,
    pub rows_skipped: usize,
    pub duplicate_dates: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedSessionResponse {
    pub session: TrainingSession,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateScheduleResponse {
    pub generated: usize,
    pub inserted: usize,
    pub rejected: Vec<RejectedSessionResponse>,
    pub pattern_entries_skipped: usize,
    pub expansion_source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionExportRow {
    pub id: String,
    pub date: String,
    pub day: String,
    pub time: String,
    pub topic: String,
    pub batch: String,
    pub year: u8,
    pub venue: String,
    pub trainer: String,
    pub status: String,
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDayItem {
    pub date: String,
    pub day: String,
    pub day_type: String,
    pub description: String,
}

pub fn import_almanac_impl(
    state: &AppState,
    rows: Vec<serde_json::Value>,
) -> Result<ImportAlmanacResponse, InfraError> {
    let rest_day = read_rest_day(state.config_dir())?;
    let import = import_almanac(&rows, rest_day)?;

    let repository = SqliteScheduleRepository::new(state.database_path());
    repository.replace_calendar(&import.days)?;
    let days_imported = import.days.len();
    {
        let mut runtime = lock_runtime(state)?;
        runtime.calendar = import.days;
    }

    state.log_info(
        "import_almanac",
        &format!(
            "imported {} calendar days ({} instruction) from {} rows, {} skipped, {} duplicates",
            days_imported,
            import.instruction_days,
            import.rows_processed,
            import.rows_skipped,
            import.duplicate_dates
        ),
    );

    Ok(ImportAlmanacResponse {
        days_imported,
        instruction_days: import.instruction_days,
        rows_processed: import.rows_processed,
        rows_skipped: import.rows_skipped,
        duplicate_dates: import.duplicate_dates,
    })
}

pub async fn generate_schedule_impl(
    state: &AppState,
    api_key: Option<String>,
) -> Result<GenerateScheduleResponse, InfraError> {
    let client = Arc::new(ReqwestPatternClient::new());
    generate_schedule_with_client(state, client, api_key).await
}

/// The generation path behind generate_schedule, generic over the generator
/// boundary. The runtime lock is never held across the network call; the
/// expanded sessions are applied in one step afterwards.
pub async fn generate_schedule_with_client<C: PatternGeneratorClient>(
    state: &AppState,
    client: Arc<C>,
    api_key: Option<String>,
) -> Result<GenerateScheduleResponse, InfraError> {
    let started_at = Instant::now();
    let api_key = resolve_api_key(api_key)?;
    let bundle = load_setup_bundle(state.config_dir())?;

    let service = ScheduleGenerationService::new(client);
    let pattern = service.generate(&api_key, &bundle).await?;

    let instruction_days: Vec<AcademicCalendarDay> = {
        let runtime = lock_runtime(state)?;
        runtime
            .calendar
            .iter()
            .filter(|day| day.day_type == CalendarDayType::Instruction)
            .cloned()
            .collect()
    };

    let (sessions, expansion_source) = if instruction_days.is_empty() {
        let timezone = read_timezone(state.config_dir())?;
        let rest_day = read_rest_day(state.config_dir())?;
        let today = Utc::now().with_timezone(&timezone).date_naive();
        (
            materialize_upcoming_week(&pattern.templates, today, rest_day),
            "upcoming_week".to_string(),
        )
    } else {
        (
            expand_pattern(&pattern.templates, &instruction_days),
            "calendar".to_string(),
        )
    };

    let generated = sessions.len();
    let report = {
        let mut runtime = lock_runtime(state)?;
        let report = runtime.store.bulk_insert(sessions);
        persist_sessions(state, &runtime.store)?;
        report
    };

    let elapsed_ms = started_at.elapsed().as_millis();
    state.log_info(
        "generate_schedule",
        &format!(
            "generated {} sessions from {} source, inserted {}, rejected {}, in {}ms",
            generated,
            expansion_source,
            report.inserted,
            report.rejected.len(),
            elapsed_ms
        ),
    );
    if elapsed_ms > SCHEDULE_GENERATION_TARGET_MS {
        state.log_error(
            "generate_schedule",
            &format!(
                "generation exceeded target {}ms (actual={}ms)",
                SCHEDULE_GENERATION_TARGET_MS, elapsed_ms
            ),
        );
    }

    Ok(GenerateScheduleResponse {
        generated,
        inserted: report.inserted,
        rejected: report.rejected.into_iter().map(to_rejected_response).collect(),
        pattern_entries_skipped: pattern.skipped,
        expansion_source,
    })
}

pub fn store_api_key_impl(state: &AppState, api_key: String) -> Result<(), InfraError> {
    let store = KeyringApiKeyStore::default();
    store.save_api_key(&api_key)?;
    state.log_info("store_api_key", "stored generator api key");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn create_session_impl(
    state: &AppState,
    topic: String,
    planned_topics: Vec<String>,
    batch: String,
    year: u8,
    venue: String,
    trainer_id: String,
    trainer_name: String,
    date: String,
    start_time: String,
    end_time: String,
) -> Result<TrainingSession, InfraError> {
    let session = TrainingSession {
        id: next_id("ses"),
        topic: topic.trim().to_string(),
        planned_topics: planned_topics
            .into_iter()
            .map(|topic| topic.trim().to_string())
            .filter(|topic| !topic.is_empty())
            .collect(),
        batch: batch.trim().to_string(),
        year,
        venue: venue.trim().to_string(),
        trainer_id: trainer_id.trim().to_string(),
        trainer_name: trainer_name.trim().to_string(),
        date: date.trim().to_string(),
        start_time: start_time.trim().to_string(),
        end_time: end_time.trim().to_string(),
        status: SessionStatus::Scheduled,
        cancellation_reason: None,
        actual_start_time: None,
        actual_end_time: None,
        topic_covered: None,
        verified_topics: Vec::new(),
        is_late: None,
    };

    let created = apply_persisted(state, &session.id, |store| {
        store.insert(session.clone())?;
        Ok(session.clone())
    })?;

    state.log_info(
        "create_session",
        &format!("created session_id={} on {}", created.id, created.date),
    );
    Ok(created)
}

pub fn edit_session_impl(
    state: &AppState,
    session_id: String,
    start_time: String,
    end_time: String,
    topic: String,
) -> Result<TrainingSession, InfraError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(InfraError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }

    let updated = apply_persisted(state, session_id, |store| {
        store.edit(session_id, start_time.trim(), end_time.trim(), &topic)
    })?;

    state.log_info(
        "edit_session",
        &format!(
            "edited session_id={session_id} start={} end={}",
            updated.start_time, updated.end_time
        ),
    );
    Ok(updated)
}

pub fn cancel_session_impl(
    state: &AppState,
    session_id: String,
    reason: String,
) -> Result<TrainingSession, InfraError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(InfraError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }

    let cancelled = apply_persisted(state, session_id, |store| store.cancel(session_id, &reason))?;

    state.log_info(
        "cancel_session",
        &format!("cancelled session_id={session_id}"),
    );
    Ok(cancelled)
}

pub fn complete_session_impl(
    state: &AppState,
    session_id: String,
) -> Result<TrainingSession, InfraError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(InfraError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }

    let completed = apply_persisted(state, session_id, |store| store.complete(session_id))?;

    state.log_info(
        "complete_session",
        &format!("marked session_id={session_id} completed"),
    );
    Ok(completed)
}

pub fn verify_session_impl(
    state: &AppState,
    session_id: String,
    actual_start_time: String,
    actual_end_time: String,
    confirmed_topics: Vec<String>,
) -> Result<TrainingSession, InfraError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(InfraError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }

    let verified = apply_persisted(state, session_id, |store| {
        store.verify(
            session_id,
            actual_start_time.trim(),
            actual_end_time.trim(),
            confirmed_topics,
        )
    })?;

    state.log_info(
        "verify_session",
        &format!(
            "verified session_id={session_id} late={:?} covered={:?}",
            verified.is_late, verified.topic_covered
        ),
    );
    Ok(verified)
}

pub fn list_sessions_impl(
    state: &AppState,
    date: Option<String>,
    batch: Option<String>,
    status: Option<String>,
) -> Result<Vec<TrainingSession>, InfraError> {
    let date = normalized_filter(date);
    let batch = normalized_filter(batch);
    let status = match normalized_filter(status) {
        Some(raw) => Some(SessionStatus::parse(&raw).ok_or_else(|| {
            InfraError::Validation(format!("unsupported session status: {raw}"))
        })?),
        None => None,
    };

    let runtime = lock_runtime(state)?;
    Ok(runtime
        .store
        .all_sorted()
        .into_iter()
        .filter(|session| date.as_deref().map(|date| session.date == date).unwrap_or(true))
        .filter(|session| {
            batch
                .as_deref()
                .map(|batch| {
                    session
                        .batch
                        .to_lowercase()
                        .contains(&batch.to_lowercase())
                })
                .unwrap_or(true)
        })
        .filter(|session| status.map(|status| session.status == status).unwrap_or(true))
        .collect())
}

pub fn list_calendar_days_impl(
    state: &AppState,
    day_type: Option<String>,
) -> Result<Vec<CalendarDayItem>, InfraError> {
    let day_type = match normalized_filter(day_type) {
        Some(raw) => Some(CalendarDayType::parse(&raw).ok_or_else(|| {
            InfraError::Validation(format!("unsupported calendar day type: {raw}"))
        })?),
        None => None,
    };

    let runtime = lock_runtime(state)?;
    Ok(runtime
        .calendar
        .iter()
        .filter(|day| day_type.map(|wanted| day.day_type == wanted).unwrap_or(true))
        .map(|day| CalendarDayItem {
            date: day.date.clone(),
            day: day.day_name().unwrap_or("Unknown").to_string(),
            day_type: day.day_type.as_str().to_string(),
            description: day.description.clone(),
        })
        .collect())
}

/// Flat rows for report exports, optionally narrowed to one status or
/// batch. Verification outcomes land in the remarks column so the sheet
/// reads without chasing status codes.
pub fn export_sessions_impl(
    state: &AppState,
    status: Option<String>,
    batch: Option<String>,
) -> Result<Vec<SessionExportRow>, InfraError> {
    let sessions = list_sessions_impl(state, None, batch, status)?;
    Ok(sessions
        .into_iter()
        .map(|session| {
            let day = session
                .weekday()
                .map(weekday_name)
                .unwrap_or("Unknown")
                .to_string();
            let trainer = if session.trainer_unassigned() {
                "Unassigned".to_string()
            } else {
                session.trainer_name.clone()
            };
            SessionExportRow {
                id: session.id,
                date: session.date,
                day,
                time: format!("{} - {}", session.start_time, session.end_time),
                topic: session.topic,
                batch: session.batch,
                year: session.year,
                venue: session.venue,
                trainer,
                status: session.status.as_str().to_string(),
                remarks: export_remarks(
                    session.status,
                    session.is_late,
                    session.topic_covered,
                    session.cancellation_reason.as_deref(),
                ),
            }
        })
        .collect())
}

fn export_remarks(
    status: SessionStatus,
    is_late: Option<bool>,
    topic_covered: Option<bool>,
    cancellation_reason: Option<&str>,
) -> String {
    match status {
        SessionStatus::Cancelled => {
            format!("Cancelled: {}", cancellation_reason.unwrap_or("no reason"))
        }
        SessionStatus::Verified => {
            let punctuality = if is_late == Some(true) {
                "trainer late"
            } else {
                "on time"
            };
            let coverage = if topic_covered == Some(true) {
                "topics fully covered"
            } else {
                "topics partially covered"
            };
            format!("{punctuality}, {coverage}")
        }
        _ => String::new(),
    }
}

fn to_rejected_response(rejected: RejectedSession) -> RejectedSessionResponse {
    RejectedSessionResponse {
        session: rejected.session,
        reason: rejected.reason,
    }
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::Validation(format!("runtime lock poisoned: {error}")))
}

/// Applies one store mutation and mirrors it to SQLite. A failed write
/// reinstates the pre-mutation snapshot, so the store never disagrees with
/// the error the caller received.
fn apply_persisted<F>(
    state: &AppState,
    session_id: &str,
    mutate: F,
) -> Result<TrainingSession, InfraError>
where
    F: FnOnce(&mut SessionStore) -> Result<TrainingSession, InfraError>,
{
    let mut runtime = lock_runtime(state)?;
    let previous = runtime.store.get(session_id).cloned();
    let updated = mutate(&mut runtime.store)?;
    if let Err(error) = persist_session(state, &updated) {
        match previous {
            Some(previous) => runtime.store.restore(previous),
            None => {
                runtime.store.remove(&updated.id);
            }
        }
        return Err(error);
    }
    Ok(updated)
}

fn persist_session(state: &AppState, session: &TrainingSession) -> Result<(), InfraError> {
    SqliteScheduleRepository::new(state.database_path()).upsert_session(session)
}

fn persist_sessions(state: &AppState, store: &SessionStore) -> Result<(), InfraError> {
    SqliteScheduleRepository::new(state.database_path()).replace_sessions(&store.all_sorted())
}

fn resolve_api_key(explicit: Option<String>) -> Result<String, InfraError> {
    if let Some(key) = explicit {
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
    }
    if let Some(key) =
        optional_lookup_value(&|key| std::env::var(key).ok(), &["TRAINOPS_GEMINI_API_KEY", "GEMINI_API_KEY"])
    {
        return Ok(key);
    }
    let store = KeyringApiKeyStore::default();
    store.load_api_key()?.ok_or_else(|| {
        InfraError::InvalidConfig(
            "missing generator api key (pass one, set TRAINOPS_GEMINI_API_KEY, or store it first)"
                .to_string(),
        )
    })
}

fn normalized_filter(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}

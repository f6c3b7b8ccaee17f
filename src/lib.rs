mod application;
mod domain;
mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::commands::{
    cancel_session_impl, complete_session_impl, create_session_impl, edit_session_impl,
    export_sessions_impl, generate_schedule_impl, import_almanac_impl, list_calendar_days_impl,
    list_sessions_impl, store_api_key_impl, verify_session_impl, AppState, CalendarDayItem,
    GenerateScheduleResponse, ImportAlmanacResponse, SessionExportRow,
};
use domain::models::TrainingSession;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct BootstrapResponse {
    workspace_root: String,
    database_path: String,
}

#[tauri::command]
fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = match root {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };

    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        database_path: result.database_path.display().to_string(),
    })
}

#[tauri::command]
fn ping() -> &'static str {
    "pong"
}

#[tauri::command]
fn import_almanac(
    state: tauri::State<'_, AppState>,
    rows: Vec<serde_json::Value>,
) -> Result<ImportAlmanacResponse, String> {
    import_almanac_impl(state.inner(), rows)
        .map_err(|error| state.command_error("import_almanac", &error))
}

#[tauri::command]
async fn generate_schedule(
    state: tauri::State<'_, AppState>,
    api_key: Option<String>,
) -> Result<GenerateScheduleResponse, String> {
    generate_schedule_impl(state.inner(), api_key)
        .await
        .map_err(|error| state.command_error("generate_schedule", &error))
}

#[tauri::command]
fn store_api_key(state: tauri::State<'_, AppState>, api_key: String) -> Result<(), String> {
    store_api_key_impl(state.inner(), api_key)
        .map_err(|error| state.command_error("store_api_key", &error))
}

#[tauri::command]
#[allow(clippy::too_many_arguments)]
fn create_session(
    state: tauri::State<'_, AppState>,
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
) -> Result<TrainingSession, String> {
    create_session_impl(
        state.inner(),
        topic,
        planned_topics,
        batch,
        year,
        venue,
        trainer_id,
        trainer_name,
        date,
        start_time,
        end_time,
    )
    .map_err(|error| state.command_error("create_session", &error))
}

#[tauri::command]
fn edit_session(
    state: tauri::State<'_, AppState>,
    session_id: String,
    start_time: String,
    end_time: String,
    topic: String,
) -> Result<TrainingSession, String> {
    edit_session_impl(state.inner(), session_id, start_time, end_time, topic)
        .map_err(|error| state.command_error("edit_session", &error))
}

#[tauri::command]
fn cancel_session(
    state: tauri::State<'_, AppState>,
    session_id: String,
    reason: String,
) -> Result<TrainingSession, String> {
    cancel_session_impl(state.inner(), session_id, reason)
        .map_err(|error| state.command_error("cancel_session", &error))
}

#[tauri::command]
fn complete_session(
    state: tauri::State<'_, AppState>,
    session_id: String,
) -> Result<TrainingSession, String> {
    complete_session_impl(state.inner(), session_id)
        .map_err(|error| state.command_error("complete_session", &error))
}

#[tauri::command]
fn verify_session(
    state: tauri::State<'_, AppState>,
    session_id: String,
    actual_start_time: String,
    actual_end_time: String,
    confirmed_topics: Vec<String>,
) -> Result<TrainingSession, String> {
    verify_session_impl(
        state.inner(),
        session_id,
        actual_start_time,
        actual_end_time,
        confirmed_topics,
    )
    .map_err(|error| state.command_error("verify_session", &error))
}

#[tauri::command]
fn list_sessions(
    state: tauri::State<'_, AppState>,
    date: Option<String>,
    batch: Option<String>,
    status: Option<String>,
) -> Result<Vec<TrainingSession>, String> {
    list_sessions_impl(state.inner(), date, batch, status)
        .map_err(|error| state.command_error("list_sessions", &error))
}

#[tauri::command]
fn list_calendar_days(
    state: tauri::State<'_, AppState>,
    day_type: Option<String>,
) -> Result<Vec<CalendarDayItem>, String> {
    list_calendar_days_impl(state.inner(), day_type)
        .map_err(|error| state.command_error("list_calendar_days", &error))
}

#[tauri::command]
fn export_sessions(
    state: tauri::State<'_, AppState>,
    status: Option<String>,
    batch: Option<String>,
) -> Result<Vec<SessionExportRow>, String> {
    export_sessions_impl(state.inner(), status, batch)
        .map_err(|error| state.command_error("export_sessions", &error))
}

pub fn run() {
    let workspace_root = std::env::current_dir().expect("failed to resolve current directory");
    let app_state = AppState::new(workspace_root).expect("failed to initialize app state");

    tauri::Builder::default()
        .manage(app_state)
        .invoke_handler(tauri::generate_handler![
            ping,
            bootstrap,
            import_almanac,
            generate_schedule,
            store_api_key,
            create_session,
            edit_session,
            cancel_session,
            complete_session,
            verify_session,
            list_sessions,
            list_calendar_days,
            export_sessions
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}

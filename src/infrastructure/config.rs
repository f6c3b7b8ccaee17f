use crate::domain::models::{
    parse_weekday, CurriculumMapping, SectionDetails, SetupBundle, TimingRule, TrainerMapping,
    TrainingTypeMapping, VenueMapping,
};
use crate::infrastructure::error::InfraError;
use chrono::Weekday;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const TRAINERS_JSON: &str = "trainers.json";
const VENUES_JSON: &str = "venues.json";
const CURRICULUM_JSON: &str = "curriculum.json";
const TIMINGS_JSON: &str = "timings.json";
const TRAINING_TYPES_JSON: &str = "training_types.json";
const SECTIONS_JSON: &str = "sections.json";

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "TrainOps",
                "timezone": "Asia/Kolkata",
                "restDay": "Sunday"
            }),
        ),
        (
            TRAINERS_JSON,
            serde_json::json!({
                "schema": 1,
                "trainers": []
            }),
        ),
        (
            VENUES_JSON,
            serde_json::json!({
                "schema": 1,
                "venues": []
            }),
        ),
        (
            CURRICULUM_JSON,
            serde_json::json!({
                "schema": 1,
                "curriculum": []
            }),
        ),
        (
            TIMINGS_JSON,
            serde_json::json!({
                "schema": 1,
                "timings": [
                    { "semester": 5, "session": "FN", "startTime": "09:00", "endTime": "12:40" },
                    { "semester": 3, "session": "FN", "startTime": "09:55", "endTime": "12:40" },
                    { "semester": 3, "session": "AN", "startTime": "13:20", "endTime": "16:00" },
                    { "semester": 6, "session": "FULL_DAY", "startTime": "09:00", "endTime": "16:00" }
                ]
            }),
        ),
        (
            TRAINING_TYPES_JSON,
            serde_json::json!({
                "schema": 1,
                "trainingTypes": []
            }),
        ),
        (
            SECTIONS_JSON,
            serde_json::json!({
                "schema": 1,
                "sections": []
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn read_section<T>(config_dir: &Path, file: &str, key: &str) -> Result<Vec<T>, InfraError>
where
    T: DeserializeOwned,
{
    let path = config_dir.join(file);
    let parsed = read_config(&path)?;
    let value = parsed.get(key).cloned().ok_or_else(|| {
        InfraError::InvalidConfig(format!("missing '{key}' in {}", path.display()))
    })?;
    serde_json::from_value(value).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid '{key}' in {}: {error}", path.display()))
    })
}

pub fn load_setup_bundle(config_dir: &Path) -> Result<SetupBundle, InfraError> {
    let trainers: Vec<TrainerMapping> = read_section(config_dir, TRAINERS_JSON, "trainers")?;
    let venues: Vec<VenueMapping> = read_section(config_dir, VENUES_JSON, "venues")?;
    let curriculum: Vec<CurriculumMapping> = read_section(config_dir, CURRICULUM_JSON, "curriculum")?;
    let timings: Vec<TimingRule> = read_section(config_dir, TIMINGS_JSON, "timings")?;
    let training_types: Vec<TrainingTypeMapping> =
        read_section(config_dir, TRAINING_TYPES_JSON, "trainingTypes")?;
    let sections: Vec<SectionDetails> = read_section(config_dir, SECTIONS_JSON, "sections")?;

    for timing in &timings {
        timing.validate().map_err(InfraError::InvalidConfig)?;
    }

    Ok(SetupBundle {
        trainers,
        venues,
        curriculum,
        timings,
        training_types,
        sections,
    })
}

pub fn read_timezone(config_dir: &Path) -> Result<Tz, InfraError> {
    let parsed = read_config(&config_dir.join(APP_JSON))?;
    let raw = parsed
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("Asia/Kolkata");
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone in app.json: {raw}")))
}

/// The weekly rest day the almanac importer never emits.
pub fn read_rest_day(config_dir: &Path) -> Result<Weekday, InfraError> {
    let parsed = read_config(&config_dir.join(APP_JSON))?;
    let raw = parsed
        .get("restDay")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("Sunday");
    parse_weekday(raw)
        .ok_or_else(|| InfraError::InvalidConfig(format!("unknown restDay in app.json: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SessionSlot;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "trainops-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn defaults_are_written_once_and_load() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");

        let bundle = load_setup_bundle(&dir.path).expect("load bundle");
        assert!(bundle.trainers.is_empty());
        assert_eq!(bundle.timings.len(), 4);
        assert!(bundle
            .timings
            .iter()
            .any(|rule| rule.session == SessionSlot::FullDay));

        assert_eq!(read_rest_day(&dir.path).expect("rest day"), Weekday::Sun);
        assert_eq!(
            read_timezone(&dir.path).expect("timezone"),
            chrono_tz::Asia::Kolkata
        );
    }

    #[test]
    fn rejects_unsupported_schema() {
        let dir = TempConfigDir::new();
        fs::write(dir.path.join(APP_JSON), r#"{"schema": 2}"#).expect("write app.json");
        assert!(matches!(
            read_rest_day(&dir.path),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_unknown_timezone() {
        let dir = TempConfigDir::new();
        fs::write(
            dir.path.join(APP_JSON),
            r#"{"schema": 1, "timezone": "Mars/Olympus"}"#,
        )
        .expect("write app.json");
        assert!(matches!(
            read_timezone(&dir.path),
            Err(InfraError::InvalidConfig(_))
        ));
    }
}

use crate::domain::clock;
use crate::domain::models::{parse_weekday, SetupBundle, TemplateSession};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::pattern_client::PatternGeneratorClient;
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CoercedPattern {
    pub templates: Vec<TemplateSession>,
    pub skipped: usize,
}

/// Thin orchestration over the generator boundary. The model output is
/// treated as untrusted and coerced field by field before anything reaches
/// the schedule.
pub struct ScheduleGenerationService<C: PatternGeneratorClient> {
    client: Arc<C>,
}

impl<C: PatternGeneratorClient> ScheduleGenerationService<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub async fn generate(
        &self,
        api_key: &str,
        bundle: &SetupBundle,
    ) -> Result<CoercedPattern, InfraError> {
        validate_setup(bundle)?;
        let raw = self.client.generate_weekly_pattern(api_key, bundle).await?;
        coerce_weekly_pattern(&raw)
    }
}

/// Rejects generation before any network call when a section has no
/// curriculum backing it. All gaps are reported at once.
pub fn validate_setup(bundle: &SetupBundle) -> Result<(), InfraError> {
    if bundle.sections.is_empty() {
        return Err(InfraError::Validation(
            "no sections configured; complete setup before generating".to_string(),
        ));
    }
    if bundle.timings.is_empty() {
        return Err(InfraError::Validation(
            "no timing rules configured; complete setup before generating".to_string(),
        ));
    }

    let mut gaps: Vec<String> = Vec::new();
    for section in &bundle.sections {
        let covered = bundle.curriculum.iter().any(|mapping| {
            mapping.department == section.department
                && mapping.semester == section.semester
                && !mapping.courses.is_empty()
        });
        if covered {
            continue;
        }
        let gap = format!(
            "no curriculum courses defined for {} semester {}",
            section.department, section.semester
        );
        if !gaps.contains(&gap) {
            gaps.push(gap);
        }
    }
    if gaps.is_empty() {
        Ok(())
    } else {
        Err(InfraError::Validation(gaps.join("; ")))
    }
}

/// Turns the model's JSON array into template sessions. Entries missing a
/// usable topic, batch, venue, year, weekday, or time window are counted and
/// dropped; a missing trainer name is repaired to unassigned.
pub fn coerce_weekly_pattern(raw: &serde_json::Value) -> Result<CoercedPattern, InfraError> {
    let entries = raw.as_array().ok_or_else(|| {
        InfraError::Generation("generated pattern must be a JSON array".to_string())
    })?;

    let mut templates = Vec::new();
    let mut skipped = 0usize;
    for entry in entries {
        match coerce_entry(entry) {
            Some(template) => templates.push(template),
            None => skipped += 1,
        }
    }

    if templates.is_empty() {
        return Err(InfraError::Generation(format!(
            "generated pattern contained no usable sessions ({skipped} entries rejected)"
        )));
    }
    Ok(CoercedPattern { templates, skipped })
}

fn coerce_entry(entry: &serde_json::Value) -> Option<TemplateSession> {
    let topic = required_text(entry, "topic")?;
    let batch = required_text(entry, "batch")?;
    let venue = required_text(entry, "venue")?;
    let year = entry.get("year").and_then(|value| value.as_u64())?;
    if !(1..=4).contains(&year) {
        return None;
    }
    let start_time = required_text(entry, "startTime")?;
    let end_time = required_text(entry, "endTime")?;
    let start = clock::minute_of_day(&start_time)?;
    let end = clock::minute_of_day(&end_time)?;
    if end <= start {
        return None;
    }
    let weekday = entry
        .get("weekday")
        .and_then(|value| value.as_str())
        .and_then(parse_weekday)
        .or_else(|| {
            let date = entry.get("date")?.as_str()?;
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .ok()
                .map(|date| date.weekday())
        })?;
    let planned_topics = entry
        .get("plannedTopics")
        .and_then(|value| value.as_array())
        .map(|topics| {
            topics
                .iter()
                .filter_map(|topic| topic.as_str())
                .map(str::trim)
                .filter(|topic| !topic.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(TemplateSession {
        weekday,
        topic,
        planned_topics,
        batch,
        year: year as u8,
        venue,
        trainer_id: optional_text(entry, "trainerId"),
        trainer_name: optional_text(entry, "trainerName"),
        start_time,
        end_time,
    })
}

fn required_text(entry: &serde_json::Value, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(|value| value.as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn optional_text(entry: &serde_json::Value, key: &str) -> String {
    entry
        .get(key)
        .and_then(|value| value.as_str())
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

use crate::domain::models::{AcademicCalendarDay, CalendarDayType};
use crate::infrastructure::error::InfraError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeMap;

/// Offset between the spreadsheet serial epoch (1899-12-30) and the dates the
/// almanac actually covers. Fractional day parts are discarded.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

const EVENT_COLUMNS: [&str; 4] = ["I Semester", "II Semester", "Event", "Description"];
const FROM_COLUMNS: [&str; 2] = ["From", "Start Date"];
const TO_COLUMNS: [&str; 2] = ["To", "End Date"];

#[derive(Debug, Clone)]
pub struct AlmanacImport {
    pub days: Vec<AcademicCalendarDay>,
    pub rows_processed: usize,
    pub rows_skipped: usize,
    pub instruction_days: usize,
    pub duplicate_dates: usize,
}

/// Builds the academic calendar from tabular almanac rows. Each row names an
/// event and a date range; every date in the range becomes one calendar day,
/// except the weekly rest day. Later rows win when ranges overlap.
pub fn import_almanac(
    rows: &[serde_json::Value],
    rest_day: Weekday,
) -> Result<AlmanacImport, InfraError> {
    let mut by_date: BTreeMap<NaiveDate, AcademicCalendarDay> = BTreeMap::new();
    let mut rows_processed = 0usize;
    let mut rows_skipped = 0usize;
    let mut duplicate_dates = 0usize;

    for row in rows {
        let event = match first_text_column(row, &EVENT_COLUMNS) {
            Some(event) => event,
            None => {
                rows_skipped += 1;
                continue;
            }
        };
        let from = first_cell(row, &FROM_COLUMNS).and_then(parse_date_cell);
        let from = match from {
            Some(date) => date,
            None => {
                rows_skipped += 1;
                continue;
            }
        };
        let to = first_cell(row, &TO_COLUMNS)
            .and_then(parse_date_cell)
            .unwrap_or(from);
        if to < from {
            rows_skipped += 1;
            continue;
        }

        rows_processed += 1;
        let day_type = classify_event(&event);
        let mut cursor = from;
        while cursor <= to {
            if cursor.weekday() != rest_day {
                let replaced = by_date
                    .insert(
                        cursor,
                        AcademicCalendarDay {
                            date: cursor.format("%Y-%m-%d").to_string(),
                            day_type,
                            description: event.clone(),
                        },
                    )
                    .is_some();
                if replaced {
                    duplicate_dates += 1;
                }
            }
            cursor += Duration::days(1);
        }
    }

    if by_date.is_empty() {
        return Err(InfraError::Validation(
            "almanac import produced no calendar days; check the sheet's column names and date formats".to_string(),
        ));
    }

    let days: Vec<AcademicCalendarDay> = by_date.into_values().collect();
    let instruction_days = days
        .iter()
        .filter(|day| day.day_type == CalendarDayType::Instruction)
        .count();

    Ok(AlmanacImport {
        days,
        rows_processed,
        rows_skipped,
        instruction_days,
        duplicate_dates,
    })
}

fn first_cell<'a>(row: &'a serde_json::Value, columns: &[&str]) -> Option<&'a serde_json::Value> {
    let object = row.as_object()?;
    columns.iter().find_map(|column| object.get(*column))
}

fn first_text_column(row: &serde_json::Value, columns: &[&str]) -> Option<String> {
    first_cell(row, columns)
        .and_then(|cell| cell.as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Date cells arrive either as spreadsheet serial numbers or as text in
/// DD.MM.YYYY, YYYY-MM-DD, or full timestamp form.
fn parse_date_cell(cell: &serde_json::Value) -> Option<NaiveDate> {
    if let Some(serial) = cell.as_f64() {
        let epoch = NaiveDate::from_ymd_opt(SERIAL_EPOCH.0, SERIAL_EPOCH.1, SERIAL_EPOCH.2)?;
        return epoch.checked_add_signed(Duration::days(serial.floor() as i64));
    }
    let text = cell.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%d.%m.%Y") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    // Timestamp exports keep the date in the first ten characters.
    let prefix = text.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn classify_event(event: &str) -> CalendarDayType {
    let lowered = event.to_lowercase();
    if lowered.contains("exam") || lowered.contains("submission") {
        CalendarDayType::Exam
    } else if lowered.contains("vacation")
        || lowered.contains("break")
        || lowered.contains("preparation")
    {
        CalendarDayType::Holiday
    } else {
        CalendarDayType::Instruction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(event: &str, from: serde_json::Value, to: serde_json::Value) -> serde_json::Value {
        json!({ "I Semester": event, "From": from, "To": to })
    }

    #[test]
    fn dotted_dates_expand_and_skip_the_rest_day() {
        let rows = vec![row(
            "Dussera Vacation",
            json!("28.09.2025"),
            json!("05.10.2025"),
        )];
        let import = import_almanac(&rows, Weekday::Sun).expect("import");
        // Both endpoints fall on Sundays, leaving six holiday days.
        assert_eq!(import.days.len(), 6);
        assert!(import
            .days
            .iter()
            .all(|day| day.day_type == CalendarDayType::Holiday));
        assert_eq!(import.days.first().map(|day| day.date.as_str()), Some("2025-09-29"));
        assert_eq!(import.days.last().map(|day| day.date.as_str()), Some("2025-10-04"));
        assert_eq!(import.instruction_days, 0);
    }

    #[test]
    fn spreadsheet_serials_map_to_calendar_dates() {
        let rows = vec![row("Commencement of Instruction", json!(45658.0), json!(45658.0))];
        let import = import_almanac(&rows, Weekday::Sun).expect("import");
        assert_eq!(import.days[0].date, "2025-01-01");
        assert_eq!(import.days[0].day_type, CalendarDayType::Instruction);
    }

    #[test]
    fn classification_follows_event_keywords() {
        assert_eq!(classify_event("Mid Examinations"), CalendarDayType::Exam);
        assert_eq!(classify_event("Record Submission"), CalendarDayType::Exam);
        assert_eq!(classify_event("Summer Vacation"), CalendarDayType::Holiday);
        assert_eq!(classify_event("Semester Break"), CalendarDayType::Holiday);
        assert_eq!(classify_event("Preparation Holidays"), CalendarDayType::Holiday);
        assert_eq!(classify_event("Instruction Period"), CalendarDayType::Instruction);
        assert_eq!(classify_event("Sports Day"), CalendarDayType::Instruction);
    }

    #[test]
    fn alternate_column_names_are_accepted() {
        let rows = vec![json!({
            "Event": "Instruction",
            "Start Date": "2025-07-07",
            "End Date": "2025-07-08"
        })];
        let import = import_almanac(&rows, Weekday::Sun).expect("import");
        assert_eq!(import.days.len(), 2);
        assert_eq!(import.rows_processed, 1);
    }

    #[test]
    fn missing_end_date_yields_a_single_day() {
        let rows = vec![json!({ "Event": "Convocation", "From": "01.12.2025" })];
        let import = import_almanac(&rows, Weekday::Sun).expect("import");
        assert_eq!(import.days.len(), 1);
        assert_eq!(import.days[0].date, "2025-12-01");
    }

    #[test]
    fn overlapping_ranges_keep_the_later_row() {
        let rows = vec![
            row("Instruction", json!("06.10.2025"), json!("10.10.2025")),
            row("Mid Examinations", json!("08.10.2025"), json!("09.10.2025")),
        ];
        let import = import_almanac(&rows, Weekday::Sun).expect("import");
        assert_eq!(import.duplicate_dates, 2);
        let exam_days: Vec<_> = import
            .days
            .iter()
            .filter(|day| day.day_type == CalendarDayType::Exam)
            .map(|day| day.date.as_str())
            .collect();
        assert_eq!(exam_days, vec!["2025-10-08", "2025-10-09"]);
    }

    #[test]
    fn unusable_rows_fail_the_import() {
        let rows = vec![json!({ "Remarks": "nothing here" }), json!({ "Event": "X" })];
        let error = import_almanac(&rows, Weekday::Sun).expect_err("no days");
        assert!(matches!(error, InfraError::Validation(_)));
    }

    #[test]
    fn timestamp_cells_use_the_date_prefix() {
        let rows = vec![json!({
            "Event": "Instruction",
            "From": "2025-07-07T00:00:00.000Z"
        })];
        let import = import_almanac(&rows, Weekday::Sun).expect("import");
        assert_eq!(import.days[0].date, "2025-07-07");
    }
}

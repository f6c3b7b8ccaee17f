use crate::domain::models::{AcademicCalendarDay, CalendarDayType, TemplateSession, TrainingSession};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashMap;

/// Maps a one-week pattern onto an academic calendar: every INSTRUCTION day
/// receives a copy of each template whose weekday matches, with a fresh id,
/// the day's concrete date, and SCHEDULED status. HOLIDAY and EXAM days
/// produce nothing; weekdays with no template produce nothing. Pure up to
/// id generation.
pub fn expand_pattern(
    pattern: &[TemplateSession],
    calendar: &[AcademicCalendarDay],
) -> Vec<TrainingSession> {
    let mut by_weekday: HashMap<Weekday, Vec<&TemplateSession>> = HashMap::new();
    for template in pattern {
        by_weekday.entry(template.weekday).or_default().push(template);
    }

    let mut expanded = Vec::new();
    for day in calendar {
        if day.day_type != CalendarDayType::Instruction {
            continue;
        }
        let Some(weekday) = day.weekday() else {
            continue;
        };
        let Some(templates) = by_weekday.get(&weekday) else {
            continue;
        };
        for template in templates {
            expanded.push(template.to_session(&day.date));
        }
    }
    expanded
}

/// Fallback when no almanac has been imported: the pattern becomes one
/// concrete week of sessions starting on the Monday strictly after `today`.
/// The weekly rest day is skipped, matching what the calendar path can
/// produce (the importer never emits the rest day).
pub fn materialize_upcoming_week(
    pattern: &[TemplateSession],
    today: NaiveDate,
    rest_day: Weekday,
) -> Vec<TrainingSession> {
    let days_until_monday = (7 - today.weekday().num_days_from_monday()) % 7;
    let week_start = today
        + Duration::days(if days_until_monday == 0 {
            7
        } else {
            days_until_monday as i64
        });

    let mut sessions = Vec::new();
    for offset in 0..7 {
        let date = week_start + Duration::days(offset);
        if date.weekday() == rest_day {
            continue;
        }
        for template in pattern {
            if template.weekday == date.weekday() {
                sessions.push(template.to_session(&date.format("%Y-%m-%d").to_string()));
            }
        }
    }
    sessions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(weekday: Weekday, venue: &str) -> TemplateSession {
        TemplateSession {
            weekday,
            topic: "Java Full Stack".to_string(),
            planned_topics: vec!["Streams".to_string(), "Collections".to_string()],
            batch: "CSE-A+B".to_string(),
            year: 3,
            venue: venue.to_string(),
            trainer_id: "T001".to_string(),
            trainer_name: "Vikas".to_string(),
            start_time: "09:55".to_string(),
            end_time: "12:40".to_string(),
        }
    }

    fn day(date: &str, day_type: CalendarDayType) -> AcademicCalendarDay {
        AcademicCalendarDay {
            date: date.to_string(),
            day_type,
            description: "1st spell of Instructions".to_string(),
        }
    }

    #[test]
    fn instruction_days_receive_matching_templates() {
        // 2025-07-07 Monday, 2025-07-08 Tuesday.
        let pattern = vec![template(Weekday::Mon, "E-704"), template(Weekday::Tue, "Lab-1")];
        let calendar = vec![
            day("2025-07-07", CalendarDayType::Instruction),
            day("2025-07-08", CalendarDayType::Instruction),
            day("2025-07-09", CalendarDayType::Holiday),
            day("2025-07-10", CalendarDayType::Exam),
        ];

        let expanded = expand_pattern(&pattern, &calendar);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].date, "2025-07-07");
        assert_eq!(expanded[0].venue, "E-704");
        assert_eq!(expanded[1].date, "2025-07-08");
        assert_eq!(expanded[1].venue, "Lab-1");
        assert!(expanded.iter().all(|s| s.status == crate::domain::models::SessionStatus::Scheduled));
    }

    #[test]
    fn weekday_without_template_yields_nothing() {
        let pattern = vec![template(Weekday::Mon, "E-704")];
        // 2025-07-12 is a Saturday.
        let calendar = vec![day("2025-07-12", CalendarDayType::Instruction)];
        assert!(expand_pattern(&pattern, &calendar).is_empty());
    }

    #[test]
    fn expansion_is_deterministic_up_to_ids() {
        let pattern = vec![template(Weekday::Mon, "E-704"), template(Weekday::Mon, "Lab-1")];
        let calendar = vec![
            day("2025-07-07", CalendarDayType::Instruction),
            day("2025-07-14", CalendarDayType::Instruction),
        ];

        let first = expand_pattern(&pattern, &calendar);
        let second = expand_pattern(&pattern, &calendar);
        assert_eq!(first.len(), second.len());
        for (left, right) in first.iter().zip(second.iter()) {
            assert_ne!(left.id, right.id);
            let mut left_anon = left.clone();
            let mut right_anon = right.clone();
            left_anon.id = String::new();
            right_anon.id = String::new();
            assert_eq!(left_anon, right_anon);
        }
    }

    #[test]
    fn upcoming_week_starts_next_monday() {
        let pattern = vec![template(Weekday::Mon, "E-704"), template(Weekday::Fri, "Lab-1")];
        // 2025-07-02 is a Wednesday; the following Monday is 2025-07-07.
        let sessions = materialize_upcoming_week(
            &pattern,
            NaiveDate::from_ymd_opt(2025, 7, 2).unwrap(),
            Weekday::Sun,
        );
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].date, "2025-07-07");
        assert_eq!(sessions[1].date, "2025-07-11");

        // From a Monday, the pattern lands on the week after.
        let from_monday = materialize_upcoming_week(
            &pattern,
            NaiveDate::from_ymd_opt(2025, 7, 7).unwrap(),
            Weekday::Sun,
        );
        assert_eq!(from_monday[0].date, "2025-07-14");
    }

    #[test]
    fn upcoming_week_skips_the_rest_day() {
        let pattern = vec![template(Weekday::Sun, "E-704")];
        let today = NaiveDate::from_ymd_opt(2025, 7, 2).unwrap();

        // A Sunday template produces nothing when Sunday is the rest day.
        assert!(materialize_upcoming_week(&pattern, today, Weekday::Sun).is_empty());

        // With a different rest day the Sunday of that week is used.
        let sessions = materialize_upcoming_week(&pattern, today, Weekday::Mon);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].date, "2025-07-13");
    }
}

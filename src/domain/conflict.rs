use crate::domain::clock::minute_of_day;
use crate::domain::models::{SessionStatus, TrainingSession};

/// True iff the candidate double-books a venue: same date, same venue
/// (exact match), against a non-cancelled session whose `[start, end)`
/// interval overlaps the candidate's. Half-open semantics: a session
/// ending at 12:40 and one starting at 12:40 do not conflict.
///
/// Pure predicate; callers run it before committing any insert or edit
/// that changes venue, date, or times. Assumes times were already
/// normalized to valid `start < end` clock strings.
pub fn has_conflict(candidate: &TrainingSession, existing: &[TrainingSession]) -> bool {
    let (Some(candidate_start), Some(candidate_end)) = (
        minute_of_day(&candidate.start_time),
        minute_of_day(&candidate.end_time),
    ) else {
        return false;
    };

    existing.iter().any(|session| {
        if session.id == candidate.id {
            return false;
        }
        if session.status == SessionStatus::Cancelled {
            return false;
        }
        if session.date != candidate.date || session.venue != candidate.venue {
            return false;
        }
        let (Some(existing_start), Some(existing_end)) = (
            minute_of_day(&session.start_time),
            minute_of_day(&session.end_time),
        ) else {
            return false;
        };
        candidate_start < existing_end && candidate_end > existing_start
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::sample_session;

    fn candidate(start: &str, end: &str) -> TrainingSession {
        let mut session = sample_session();
        session.id = "ses-candidate".to_string();
        session.start_time = start.to_string();
        session.end_time = end.to_string();
        session
    }

    #[test]
    fn overlapping_same_venue_same_date_conflicts() {
        let existing = vec![sample_session()]; // E-301, 09:00-12:40
        assert!(has_conflict(&candidate("11:59", "13:00"), &existing));
        assert!(has_conflict(&candidate("08:00", "09:01"), &existing));
        assert!(has_conflict(&candidate("10:00", "11:00"), &existing));
    }

    #[test]
    fn half_open_boundary_does_not_conflict() {
        let existing = vec![sample_session()]; // ends 12:40
        assert!(!has_conflict(&candidate("12:40", "16:00"), &existing));
        assert!(!has_conflict(&candidate("08:00", "09:00"), &existing));
    }

    #[test]
    fn cancelled_sessions_never_block() {
        let mut cancelled = sample_session();
        cancelled.status = SessionStatus::Cancelled;
        cancelled.cancellation_reason = Some("Placement drive".to_string());
        assert!(!has_conflict(&candidate("10:00", "11:00"), &[cancelled]));
    }

    #[test]
    fn different_date_or_venue_does_not_conflict() {
        let existing = vec![sample_session()];

        let mut other_date = candidate("10:00", "11:00");
        other_date.date = "2025-07-08".to_string();
        assert!(!has_conflict(&other_date, &existing));

        let mut other_venue = candidate("10:00", "11:00");
        other_venue.venue = "Lab-4".to_string();
        assert!(!has_conflict(&other_venue, &existing));

        // Venue comparison is exact, not fuzzy.
        let mut cased_venue = candidate("10:00", "11:00");
        cased_venue.venue = "e-301".to_string();
        assert!(!has_conflict(&cased_venue, &existing));
    }

    #[test]
    fn session_never_conflicts_with_itself() {
        let session = sample_session();
        assert!(!has_conflict(&session, &[session.clone()]));
    }

    #[test]
    fn conflict_is_symmetric() {
        let left = candidate("11:59", "13:00");
        let right = sample_session();
        assert_eq!(
            has_conflict(&left, std::slice::from_ref(&right)),
            has_conflict(&right, std::slice::from_ref(&left))
        );
    }
}

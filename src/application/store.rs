use crate::domain::clock;
use crate::domain::conflict::has_conflict;
use crate::domain::models::{validate_hhmm, validate_non_empty, SessionStatus, TrainingSession};
use crate::infrastructure::error::InfraError;
use std::collections::HashMap;

/// In-memory session book. All mutations validate and conflict-check before
/// touching the map, so a rejected call leaves the store unchanged.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, TrainingSession>,
}

#[derive(Debug, Clone)]
pub struct RejectedSession {
    pub session: TrainingSession,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BulkInsertReport {
    pub inserted: usize,
    pub rejected: Vec<RejectedSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sessions(sessions: Vec<TrainingSession>) -> Self {
        Self {
            sessions: sessions
                .into_iter()
                .map(|session| (session.id.clone(), session))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TrainingSession> {
        self.sessions.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<TrainingSession> {
        self.sessions.remove(id)
    }

    /// Reinstates a snapshot taken before a mutation whose follow-up write
    /// failed. Skips validation and conflict checks; only for rolling back
    /// a just-applied change.
    pub fn restore(&mut self, session: TrainingSession) {
        self.sessions.insert(session.id.clone(), session);
    }

    /// Sessions ordered by date, then start minute, then id. The id tiebreak
    /// keeps the order stable for sessions sharing a slot.
    pub fn all_sorted(&self) -> Vec<TrainingSession> {
        let mut sessions: Vec<TrainingSession> = self.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| {
                    clock::minute_of_day(&a.start_time)
                        .unwrap_or(0)
                        .cmp(&clock::minute_of_day(&b.start_time).unwrap_or(0))
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        sessions
    }

    pub fn insert(&mut self, session: TrainingSession) -> Result<(), InfraError> {
        session.validate().map_err(InfraError::Validation)?;
        if self.sessions.contains_key(&session.id) {
            return Err(InfraError::Validation(format!(
                "session {} already exists",
                session.id
            )));
        }
        let existing: Vec<TrainingSession> = self.sessions.values().cloned().collect();
        if has_conflict(&session, &existing) {
            return Err(InfraError::Validation(format!(
                "venue {} is already booked on {} between {} and {}",
                session.venue, session.date, session.start_time, session.end_time
            )));
        }
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    /// Inserts every session it can and reports the rest. A candidate is
    /// checked against the store as it stands, so two conflicting candidates
    /// in the same batch reject the later one.
    pub fn bulk_insert(&mut self, sessions: Vec<TrainingSession>) -> BulkInsertReport {
        let mut report = BulkInsertReport::default();
        for session in sessions {
            match self.insert(session.clone()) {
                Ok(()) => report.inserted += 1,
                Err(error) => report.rejected.push(RejectedSession {
                    session,
                    reason: error.to_string(),
                }),
            }
        }
        report
    }

    pub fn edit(
        &mut self,
        id: &str,
        new_start: &str,
        new_end: &str,
        new_topic: &str,
    ) -> Result<TrainingSession, InfraError> {
        validate_hhmm(new_start, "session.start_time").map_err(InfraError::Validation)?;
        validate_hhmm(new_end, "session.end_time").map_err(InfraError::Validation)?;
        validate_non_empty(new_topic, "session.topic").map_err(InfraError::Validation)?;
        let (start, end) = match (clock::minute_of_day(new_start), clock::minute_of_day(new_end)) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(InfraError::Validation(
                    "session times must be valid HH:MM values".to_string(),
                ))
            }
        };
        if end <= start {
            return Err(InfraError::Validation(
                "session.end_time must be after session.start_time".to_string(),
            ));
        }

        let current = self
            .sessions
            .get(id)
            .ok_or_else(|| InfraError::Validation(format!("session {id} not found")))?;
        if current.status == SessionStatus::Cancelled {
            return Err(InfraError::Validation(format!(
                "session {id} is cancelled and cannot be edited"
            )));
        }

        let mut updated = current.clone();
        updated.start_time = new_start.to_string();
        updated.end_time = new_end.to_string();
        updated.topic = new_topic.trim().to_string();

        let others: Vec<TrainingSession> = self
            .sessions
            .values()
            .filter(|session| session.id != id)
            .cloned()
            .collect();
        if has_conflict(&updated, &others) {
            return Err(InfraError::Validation(format!(
                "venue {} is already booked on {} between {} and {}",
                updated.venue, updated.date, updated.start_time, updated.end_time
            )));
        }

        self.sessions.insert(id.to_string(), updated.clone());
        Ok(updated)
    }

    pub fn cancel(&mut self, id: &str, reason: &str) -> Result<TrainingSession, InfraError> {
        validate_non_empty(reason, "cancellation reason").map_err(InfraError::Validation)?;
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| InfraError::Validation(format!("session {id} not found")))?;
        match session.status {
            SessionStatus::Scheduled | SessionStatus::Completed => {
                session.status = SessionStatus::Cancelled;
                session.cancellation_reason = Some(reason.trim().to_string());
                Ok(session.clone())
            }
            other => Err(InfraError::Validation(format!(
                "session {id} is {} and cannot be cancelled",
                other.as_str()
            ))),
        }
    }

    pub fn complete(&mut self, id: &str) -> Result<TrainingSession, InfraError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| InfraError::Validation(format!("session {id} not found")))?;
        if session.status != SessionStatus::Scheduled {
            return Err(InfraError::Validation(format!(
                "session {id} is {} and cannot be marked completed",
                session.status.as_str()
            )));
        }
        session.status = SessionStatus::Completed;
        Ok(session.clone())
    }

    /// Records the trainer's actual attendance and which planned topics were
    /// confirmed as covered. Lateness compares the scheduled start against the
    /// actual start with the five minute grace.
    pub fn verify(
        &mut self,
        id: &str,
        actual_start: &str,
        actual_end: &str,
        confirmed_topics: Vec<String>,
    ) -> Result<TrainingSession, InfraError> {
        validate_hhmm(actual_start, "actual start time").map_err(InfraError::Validation)?;
        validate_hhmm(actual_end, "actual end time").map_err(InfraError::Validation)?;
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| InfraError::Validation(format!("session {id} not found")))?;
        match session.status {
            SessionStatus::Scheduled | SessionStatus::Completed => {}
            other => {
                return Err(InfraError::Validation(format!(
                    "session {id} is {} and cannot be verified",
                    other.as_str()
                )))
            }
        }

        let available = session.available_topics();
        let confirmed: Vec<String> = confirmed_topics
            .into_iter()
            .filter(|topic| available.contains(topic))
            .collect();
        let lateness = clock::minutes_difference(&session.start_time, actual_start);

        session.actual_start_time = Some(actual_start.to_string());
        session.actual_end_time = Some(actual_end.to_string());
        session.is_late = Some(clock::is_late(lateness));
        session.topic_covered = Some(confirmed.len() == available.len());
        session.verified_topics = confirmed;
        session.status = SessionStatus::Verified;
        Ok(session.clone())
    }
}

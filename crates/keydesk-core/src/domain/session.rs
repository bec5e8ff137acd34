//! StudentSession domain entity
//!
//! A session is the desk's short-term memory: the student whose badge
//! was scanned most recently. It lives only inside the custody engine,
//! is overwritten by every badge scan and is never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::StudentId;

/// The currently active student at the desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSession {
    student_id: StudentId,
    started_at: DateTime<Utc>,
}

impl StudentSession {
    /// Open a session for a freshly scanned badge
    pub fn new(student_id: StudentId) -> Self {
        Self {
            student_id,
            started_at: Utc::now(),
        }
    }

    /// Returns the student this session belongs to
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    /// Returns when the badge was scanned
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_holds_student() {
        let id = StudentId::new("AB123456".to_string()).unwrap();
        let session = StudentSession::new(id.clone());
        assert_eq!(session.student_id(), &id);
    }

    #[test]
    fn test_sessions_are_replaceable_values() {
        let first = StudentSession::new(StudentId::new("AB123456".to_string()).unwrap());
        let second = StudentSession::new(StudentId::new("CD789012".to_string()).unwrap());
        // The engine overwrites rather than stacks sessions.
        let active = second;
        assert_ne!(active.student_id(), first.student_id());
    }
}

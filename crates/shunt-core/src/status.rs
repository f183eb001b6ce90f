use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// RowStatus
// ---------------------------------------------------------------------------

/// Overall status of a project row. A blank cell means the row is still in
/// the backlog. Values are normalized (trim + uppercase) when parsed;
/// anything unrecognized is carried through as `Unknown` rather than being
/// silently treated as blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    Backlog,
    Ready,
    Running,
    Blocked,
    Done,
    Unknown(String),
}

impl RowStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "" => RowStatus::Backlog,
            "READY" => RowStatus::Ready,
            "RUNNING" => RowStatus::Running,
            "BLOCKED" => RowStatus::Blocked,
            "DONE" => RowStatus::Done,
            other => RowStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RowStatus::Backlog => "",
            RowStatus::Ready => "READY",
            RowStatus::Running => "RUNNING",
            RowStatus::Blocked => "BLOCKED",
            RowStatus::Done => "DONE",
            RowStatus::Unknown(s) => s,
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Permission
// ---------------------------------------------------------------------------

/// Secondary gate layered on the row status. Only `Go` grants a run; a blank
/// cell is not a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Blank,
    Go,
    Pause,
    Unknown(String),
}

impl Permission {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "" => Permission::Blank,
            "GO" => Permission::Go,
            "PAUSE" => Permission::Pause,
            other => Permission::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Permission::Blank => "",
            Permission::Go => "GO",
            Permission::Pause => "PAUSE",
            Permission::Unknown(s) => s,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Per-task status within a row. Executors write `DONE` or `BLOCKED` into
/// the task's column; the pipeline writes `RUNNING` and `BLOCKED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Blank,
    Ready,
    Running,
    Done,
    Blocked,
    Unknown(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "" => TaskStatus::Blank,
            "READY" => TaskStatus::Ready,
            "RUNNING" => TaskStatus::Running,
            "DONE" => TaskStatus::Done,
            "BLOCKED" => TaskStatus::Blocked,
            other => TaskStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Blank => "",
            TaskStatus::Ready => "READY",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Done => "DONE",
            TaskStatus::Blocked => "BLOCKED",
            TaskStatus::Unknown(s) => s,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_status_normalizes_case_and_whitespace() {
        assert_eq!(RowStatus::parse("  done "), RowStatus::Done);
        assert_eq!(RowStatus::parse("Ready"), RowStatus::Ready);
        assert_eq!(RowStatus::parse("RUNNING"), RowStatus::Running);
        assert_eq!(RowStatus::parse(""), RowStatus::Backlog);
        assert_eq!(RowStatus::parse("   "), RowStatus::Backlog);
    }

    #[test]
    fn unrecognized_values_become_unknown() {
        assert_eq!(
            RowStatus::parse("shipped"),
            RowStatus::Unknown("SHIPPED".to_string())
        );
        assert_eq!(
            Permission::parse("maybe"),
            Permission::Unknown("MAYBE".to_string())
        );
        assert_eq!(
            TaskStatus::parse("wip"),
            TaskStatus::Unknown("WIP".to_string())
        );
    }

    #[test]
    fn permission_blank_is_not_go() {
        assert_eq!(Permission::parse(""), Permission::Blank);
        assert_ne!(Permission::parse(""), Permission::Go);
        assert_eq!(Permission::parse("go"), Permission::Go);
        assert_eq!(Permission::parse(" PAUSE "), Permission::Pause);
    }

    #[test]
    fn task_status_roundtrip() {
        for status in [
            TaskStatus::Blank,
            TaskStatus::Ready,
            TaskStatus::Running,
            TaskStatus::Done,
            TaskStatus::Blocked,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), status);
        }
    }
}

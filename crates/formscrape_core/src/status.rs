use std::fmt;
use std::str::FromStr;

/// Per-row scrape status. Rows only ever move forward:
/// `NotStarted -> Started -> {Done, Error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobStatus {
    NotStarted,
    Started,
    Done,
    Error,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::NotStarted,
        JobStatus::Started,
        JobStatus::Done,
        JobStatus::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::NotStarted => "not_started",
            JobStatus::Started => "started",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    /// Pending rows are the work-list: anything not yet done or errored.
    pub fn is_pending(self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// `Started -> Started` is allowed so a row interrupted by a crash can be
    /// picked up again on resume.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::NotStarted, JobStatus::Started)
                | (JobStatus::Started, JobStatus::Started)
                | (JobStatus::Started, JobStatus::Done)
                | (JobStatus::Started, JobStatus::Error)
        )
    }

    /// Statuses from which `self` may be entered.
    pub fn predecessors(self) -> Vec<JobStatus> {
        JobStatus::ALL
            .into_iter()
            .filter(|prev| prev.can_advance_to(self))
            .collect()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(JobStatus::NotStarted),
            "started" => Ok(JobStatus::Started),
            "done" => Ok(JobStatus::Done),
            "error" => Ok(JobStatus::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

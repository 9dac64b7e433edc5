use crate::auction::{ClearingError, ParticipantId, Submission, SubmissionError};
use uuid::Uuid;

/// Everything that goes through the event log
///
/// Each service owns one variant and only ever writes that one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Ui(UiEvent),
    Deadline(DeadlineEvent),
    Registrar(RegistrarEvent),
    Clearing(ClearingEvent),
    #[cfg(test)]
    Test,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    /// A sanitized form, not yet part of the auction
    BidSubmitted(Submission),
    /// Operator asked to clear now
    ClearRequested,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeadlineEvent {
    Passed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrarEvent {
    Accepted {
        participant: ParticipantId,
    },
    Rejected {
        participant: ParticipantId,
        reason: SubmissionError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClearingEvent {
    Cleared { run_id: Uuid },
    Failed { reason: ClearingError },
}

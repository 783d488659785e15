//! Domain types and models

pub mod capture;
pub mod persisted;
pub mod submission;

pub use capture::{CaptureErrorBody, CaptureRequest, CaptureResponse, CaptureStatus};
pub use persisted::{decode_queue_document, encode_queue_document, LoadedQueue};
pub use submission::{
    normalize_optional_text, PendingSubmission, QueueSummary, ResultRef, SubmissionStatus,
    TerminalOutcome,
};

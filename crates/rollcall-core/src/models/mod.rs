pub mod link;
pub mod record;
pub mod request;
pub mod task;

pub use link::{AttendanceLink, FormatError, LinkCodec, DEFAULT_PORTAL_BASE_URL};
pub use record::{AttendanceRecord, RecordStatus};
pub use request::{ConversionMode, ConversionRequest, Credentials};
pub use task::{
    Completion, SubmissionError, SubmissionTask, TaskStatus, TransitionError,
};

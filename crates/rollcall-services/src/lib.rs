//! Rollcall Services Library
//!
//! The conversion-and-submission building blocks: the link reconstructor, QR
//! image generation, the browser driver abstraction and the attendance
//! submitter state machine.

pub mod browser;
pub mod qr;
pub mod reconstructor;
pub mod submitter;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use browser::{BrowserError, BrowserLauncher, BrowserSession, FormField, Selector};
#[cfg(feature = "webdriver")]
pub use browser::webdriver::{WebDriverConfig, WebDriverLauncher};
pub use qr::{QrError, QrGenerator};
pub use reconstructor::{LinkReconstructor, ReconstructionError, RejectionCause};
pub use submitter::{
    AttendanceSubmitter, Confirmation, FailedSubmission, PortalSelectors, SubmissionStage,
    SubmitterTimeouts,
};

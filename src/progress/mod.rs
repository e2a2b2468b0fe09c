// ABOUTME: Upload progress tracking module
// ABOUTME: Submits analysis jobs and polls them until a result page is ready

pub mod navigate;
pub mod poller;
pub mod submit;

pub use poller::{
    PollHandle, PollOutcome, PollerConfig, ProgressPoller, ProgressSource, ProgressUpdate,
};
pub use navigate::{conclude, BrowserNavigator, Navigator};
pub use submit::submit;

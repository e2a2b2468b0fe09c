// ABOUTME: Library root for the X-ray analysis upload client
// ABOUTME: Exposes the HTTP client, progress poller, theme preference, and terminal display

pub mod display;
pub mod error;
pub mod progress;
pub mod remote;
pub mod theme;

pub use error::UploadError;

// ABOUTME: Turns a finished poll into at most one navigation to the results page
// ABOUTME: Browser opening sits behind a small trait so the CLI path stays testable

use anyhow::Result;

use super::poller::PollOutcome;
use crate::error::UploadError;

/// Destination for the results page of a finished job.
pub trait Navigator {
    fn navigate(&mut self, url: &str);
}

/// Prints the results URL and, unless disabled, opens it in the browser.
pub struct BrowserNavigator {
    open_browser: bool,
    opener: fn(&str) -> std::io::Result<()>,
}

impl BrowserNavigator {
    pub fn new(open_browser: bool) -> Self {
        Self {
            open_browser,
            opener: |url| open::that(url),
        }
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&mut self, url: &str) {
        println!("{}", url);
        if !self.open_browser {
            return;
        }
        if let Err(e) = (self.opener)(url) {
            tracing::warn!(url = %url, error = %e, "Failed to open results in browser");
        }
    }
}

/// Navigate for a completed job; nothing else ever navigates.
///
/// Returns the URL that was opened, `None` when polling was cancelled, and
/// `UploadError::MissingResultId` when the job ended without a result.
pub fn conclude<N: Navigator>(
    outcome: &PollOutcome,
    base_url: &str,
    upload_id: &str,
    navigator: &mut N,
) -> Result<Option<String>> {
    match outcome {
        PollOutcome::Complete { path, .. } => {
            let url = format!("{}{}", base_url.trim_end_matches('/'), path);
            navigator.navigate(&url);
            Ok(Some(url))
        }
        PollOutcome::MissingResultId => {
            Err(UploadError::MissingResultId(upload_id.to_string()).into())
        }
        PollOutcome::Cancelled { .. } => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingNavigator {
        visited: Vec<String>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&mut self, url: &str) {
            self.visited.push(url.to_string());
        }
    }

    fn complete(xray_id: &str) -> PollOutcome {
        PollOutcome::Complete {
            xray_id: xray_id.to_string(),
            path: format!("/xray/{}/", xray_id),
        }
    }

    #[test]
    fn test_complete_navigates_once() {
        let mut navigator = RecordingNavigator::default();

        let url = conclude(&complete("99"), "http://host:8000/", "abc", &mut navigator).unwrap();

        assert_eq!(url.as_deref(), Some("http://host:8000/xray/99/"));
        assert_eq!(navigator.visited, vec!["http://host:8000/xray/99/"]);
    }

    #[test]
    fn test_missing_result_never_navigates() {
        let mut navigator = RecordingNavigator::default();

        let err = conclude(&PollOutcome::MissingResultId, "http://host", "abc", &mut navigator)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<UploadError>(),
            Some(UploadError::MissingResultId(id)) if id == "abc"
        ));
        assert!(navigator.visited.is_empty());
    }

    #[test]
    fn test_cancelled_never_navigates() {
        let mut navigator = RecordingNavigator::default();

        let url = conclude(
            &PollOutcome::Cancelled { percent: 40 },
            "http://host",
            "abc",
            &mut navigator,
        )
        .unwrap();

        assert!(url.is_none());
        assert!(navigator.visited.is_empty());
    }

    static OPENED: AtomicUsize = AtomicUsize::new(0);

    fn counting_opener(_url: &str) -> std::io::Result<()> {
        OPENED.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    #[test]
    fn test_browser_opens_only_when_enabled() {
        let mut quiet = BrowserNavigator {
            open_browser: false,
            opener: counting_opener,
        };
        conclude(&complete("1"), "http://host", "1", &mut quiet).unwrap();
        assert_eq!(OPENED.load(Ordering::SeqCst), 0);

        let mut browser = BrowserNavigator {
            open_browser: true,
            opener: counting_opener,
        };
        conclude(&complete("2"), "http://host", "2", &mut browser).unwrap();
        conclude(&PollOutcome::Cancelled { percent: 0 }, "http://host", "3", &mut browser)
            .unwrap();
        assert_eq!(OPENED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_browser_open_failure_is_not_fatal() {
        let mut browser = BrowserNavigator {
            open_browser: true,
            opener: |_| Err(std::io::Error::other("no display")),
        };
        let url = conclude(&complete("5"), "http://host", "5", &mut browser).unwrap();
        assert_eq!(url.as_deref(), Some("http://host/xray/5/"));
    }
}

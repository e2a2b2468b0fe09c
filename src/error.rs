// ABOUTME: Custom error types for upload submission and progress tracking
// ABOUTME: Separates transport failures from well-formed but unusable server replies

use std::fmt;

#[derive(Debug)]
pub enum UploadError {
    /// Network failure, non-2xx status, or a body that is not the expected JSON.
    Transport(String),
    /// The server answered, but without the field the client needs to continue.
    Application(String),
    /// The job reached 100% and the server never named the result to open.
    MissingResultId(String),
}

impl UploadError {
    /// Short message shown to the user before the details.
    pub fn user_message(&self) -> &'static str {
        match self {
            UploadError::Transport(_) => "Error submitting form. Please try again.",
            UploadError::Application(_) => "Error starting analysis. Please try again.",
            UploadError::MissingResultId(_) => {
                "Analysis finished but the server did not return a result. Please check your history."
            }
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UploadError::Transport(msg) => write!(f, "{} ({})", self.user_message(), msg),
            UploadError::Application(msg) => write!(f, "{} ({})", self.user_message(), msg),
            UploadError::MissingResultId(upload_id) => {
                write!(f, "{} (upload {})", self.user_message(), upload_id)
            }
        }
    }
}

impl std::error::Error for UploadError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_and_application_messages_differ() {
        let transport = UploadError::Transport("connection refused".to_string());
        let application = UploadError::Application("no upload_id".to_string());

        assert_ne!(transport.user_message(), application.user_message());
        assert!(transport.to_string().contains("connection refused"));
        assert!(application.to_string().starts_with("Error starting analysis"));
    }

    #[test]
    fn test_missing_result_names_upload() {
        let err = UploadError::MissingResultId("abc".to_string());
        assert!(err.to_string().contains("upload abc"));
    }
}

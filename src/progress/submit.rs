// ABOUTME: Upload submission step that starts a tracked analysis job
// ABOUTME: Maps client failures onto transport vs application errors

use anyhow::Result;

use crate::error::UploadError;
use crate::remote::{RemoteClient, UploadForm};

/// Submit the upload form once and return the server-assigned job id.
///
/// A reply without `upload_id` is an application error; anything that
/// prevents a well-formed reply is a transport error. Neither is retried.
/// An unreadable image fails before any request is made, with its own
/// context rather than an `UploadError`.
pub async fn submit(client: &RemoteClient, form: &UploadForm) -> Result<String> {
    let image = form.read_image().await?;

    let response = client.submit_upload(form, image).await.map_err(|e| {
        let detail = format!("{:#}", e);
        tracing::error!(error = %detail, "Error submitting form");
        UploadError::Transport(detail)
    })?;

    match response.upload_id {
        Some(upload_id) => {
            tracing::info!(upload_id = %upload_id, "Upload accepted, tracking progress");
            Ok(upload_id)
        }
        None => {
            let reason = response
                .error
                .unwrap_or_else(|| "response did not include an upload id".to_string());
            tracing::error!(reason = %reason, "Server did not start the analysis");
            Err(UploadError::Application(reason).into())
        }
    }
}

// ABOUTME: HTTP client for communicating with the X-ray analysis web service
// ABOUTME: Handles form upload, progress lookups, and interpretability re-runs

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;

use super::models::{InterpretRequest, ProgressResponse, ResultsView, SubmitResponse, UploadForm};

/// Header the server checks to answer with JSON instead of a redirect.
const AJAX_HEADER: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

pub struct RemoteClient {
    client: Client,
    api_base_url: String,
}

impl RemoteClient {
    pub fn new(api_base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Absolute URL of the page showing a finished job.
    pub fn results_url(&self, view: ResultsView, xray_id: &str) -> String {
        format!("{}{}", self.api_base_url, view.path(xray_id))
    }

    pub async fn submit_upload(
        &self,
        form: &UploadForm,
        image: Vec<u8>,
    ) -> Result<SubmitResponse> {
        let url = format!("{}/", self.api_base_url);

        let image_part = Part::bytes(image).file_name(form.image_file_name());
        let mut body = Form::new().part("image", image_part);
        for (name, value) in form.text_fields() {
            body = body.text(name, value);
        }

        let response = self
            .client
            .post(&url)
            .header(AJAX_HEADER.0, AJAX_HEADER.1)
            .multipart(body)
            .send()
            .await
            .context("Failed to submit upload. The analysis service may be unavailable")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Upload failed with status {}: {}", status, body);
        }

        let submit_response: SubmitResponse = response
            .json()
            .await
            .context("Failed to parse upload response")?;

        Ok(submit_response)
    }

    pub async fn get_progress(&self, upload_id: &str) -> Result<ProgressResponse> {
        let url = format!("{}/progress/{}/", self.api_base_url, upload_id);

        let response = self
            .client
            .get(&url)
            .header(AJAX_HEADER.0, AJAX_HEADER.1)
            .send()
            .await
            .context("Failed to get progress. The analysis service may be unavailable")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to get progress {}: {}", status, body);
        }

        let progress: ProgressResponse = response
            .json()
            .await
            .context("Failed to parse progress response")?;

        Ok(progress)
    }

    /// Ask the server to recompute visualizations; it resets progress to 0
    /// and answers with a redirect to the results page.
    pub async fn generate_interpretability(
        &self,
        xray_id: &str,
        request: &InterpretRequest,
    ) -> Result<()> {
        let url = format!(
            "{}/interpretability/{}/generate/",
            self.api_base_url, xray_id
        );

        let response = self
            .client
            .get(&url)
            .query(&request.query())
            .send()
            .await
            .context("Failed to start interpretability run")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Interpretability run for {} failed with status {}: {}",
                xray_id,
                status,
                body
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = RemoteClient::new("https://xray.example.com".to_string());
        assert!(client.is_ok());
    }

    #[test]
    fn test_results_url_trims_trailing_slash() {
        let client = RemoteClient::new("https://xray.example.com/".to_string()).unwrap();
        assert_eq!(client.base_url(), "https://xray.example.com");
        assert_eq!(
            client.results_url(ResultsView::Xray, "99"),
            "https://xray.example.com/xray/99/"
        );
    }
}

// ABOUTME: Data structures for upload submission and progress responses
// ABOUTME: Identifiers arrive as JSON strings or integers and are kept opaque

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Classifier the server runs on an uploaded image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelType {
    #[default]
    Densenet,
    Resnet,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Densenet => "densenet",
            ModelType::Resnet => "resnet",
        }
    }
}

/// Visualization produced by an interpretability run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InterpretationMethod {
    #[default]
    Gradcam,
    Pli,
}

impl InterpretationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpretationMethod::Gradcam => "gradcam",
            InterpretationMethod::Pli => "pli",
        }
    }
}

/// Fields of the analysis upload form.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub image: PathBuf,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub patient_id: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>, // YYYY-MM-DD
    pub date_of_xray: Option<String>,  // YYYY-MM-DD
    pub additional_info: Option<String>,
    pub model_type: ModelType,
}

impl UploadForm {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Bytes of the image to upload.
    pub async fn read_image(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.image)
            .await
            .with_context(|| format!("Failed to read image {}", self.image.display()))
    }

    pub fn image_file_name(&self) -> String {
        self.image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string())
    }

    /// Text fields sent alongside the image, skipping blanks.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let optional = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("patient_id", &self.patient_id),
            ("gender", &self.gender),
            ("date_of_birth", &self.date_of_birth),
            ("date_of_xray", &self.date_of_xray),
            ("additional_info", &self.additional_info),
        ];

        let mut fields: Vec<(&'static str, String)> = optional
            .into_iter()
            .filter_map(|(name, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (name, v.to_string()))
            })
            .collect();
        fields.push(("model_type", self.model_type.as_str().to_string()));
        fields
    }
}

/// Parameters for re-running interpretability on an existing upload.
#[derive(Debug, Clone, Default)]
pub struct InterpretRequest {
    pub method: InterpretationMethod,
    pub model_type: ModelType,
    pub target_class: Option<String>,
}

impl InterpretRequest {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("method", self.method.as_str().to_string()),
            ("model_type", self.model_type.as_str().to_string()),
        ];
        if let Some(target) = self.target_class.as_deref().filter(|t| !t.is_empty()) {
            query.push(("target_class", target.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(default, deserialize_with = "deserialize_opaque_id")]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressResponse {
    pub progress: i64,
    #[serde(default, deserialize_with = "deserialize_opaque_id")]
    pub xray_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>, // "pending", "processing", "complete", "error"
}

/// Page the client navigates to once a job completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultsView {
    #[default]
    Xray,
    Interpretability,
}

impl ResultsView {
    pub fn path(&self, xray_id: &str) -> String {
        match self {
            ResultsView::Xray => format!("/xray/{}/", xray_id),
            ResultsView::Interpretability => format!("/interpretability/{}/view/", xray_id),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OpaqueId {
    Text(String),
    Number(i64),
}

fn deserialize_opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<OpaqueId>::deserialize(deserializer)?;
    Ok(raw
        .map(|id| match id {
            OpaqueId::Text(text) => text,
            OpaqueId::Number(number) => number.to_string(),
        })
        .filter(|id| !id.is_empty()))
}

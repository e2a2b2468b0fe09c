// ABOUTME: Remote analysis service module
// ABOUTME: HTTP client and wire models for the upload and progress endpoints

pub mod client;
pub mod models;

pub use client::RemoteClient;
pub use models::{
    InterpretRequest, InterpretationMethod, ModelType, ProgressResponse, ResultsView,
    SubmitResponse, UploadForm,
};

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("No image provided")]
    NoImage,

    #[error("No selected file")]
    EmptyFilename,

    #[error("No image selected")]
    NoImageSelected,

    #[error("Diagnosis not found")]
    DiagnosisNotFound,

    #[error("Diagnosis not yet completed")]
    DiagnosisNotCompleted,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl DiagnosisError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DiagnosisError::NoImage
            | DiagnosisError::EmptyFilename
            | DiagnosisError::NoImageSelected
            | DiagnosisError::DiagnosisNotCompleted
            | DiagnosisError::InvalidInput(_)
            | DiagnosisError::Json(_) => StatusCode::BAD_REQUEST,
            DiagnosisError::DiagnosisNotFound => StatusCode::NOT_FOUND,
            DiagnosisError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            DiagnosisError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DiagnosisError::Multipart(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DiagnosisError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            DiagnosisError::ModelNotLoaded => "MODEL_NOT_LOADED",
            DiagnosisError::ImageProcessing(_) => "IMAGE_PROCESSING_ERROR",
            DiagnosisError::Inference(_) => "INFERENCE_ERROR",
            DiagnosisError::NoImage => "NO_IMAGE",
            DiagnosisError::EmptyFilename | DiagnosisError::NoImageSelected => "EMPTY_FILENAME",
            DiagnosisError::DiagnosisNotFound => "DIAGNOSIS_NOT_FOUND",
            DiagnosisError::DiagnosisNotCompleted => "DIAGNOSIS_NOT_COMPLETED",
            DiagnosisError::InvalidInput(_) => "INVALID_INPUT",
            DiagnosisError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            DiagnosisError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            DiagnosisError::Config(_) => "CONFIG_ERROR",
            DiagnosisError::Multipart(_) => "MULTIPART_ERROR",
            DiagnosisError::Io(_) => "IO_ERROR",
            DiagnosisError::Json(_) => "JSON_ERROR",
            DiagnosisError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            DiagnosisError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn log(&self, status: StatusCode) {
        if status.is_server_error() {
            tracing::error!("Request failed: {} ({})", self, status);
        } else {
            tracing::warn!("Request rejected: {} ({})", self, status);
        }
    }
}

/// 默认错误格式：`{"error": "...", "code": "..."}`
impl IntoResponse for DiagnosisError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        self.log(status);

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.error_code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// `/api/diagnose` 与 `/api/load-model` 使用的错误格式：
/// `{"status": "error", "message": "..."}`
#[derive(Debug)]
pub struct StatusError(pub DiagnosisError);

impl From<DiagnosisError> for StatusError {
    fn from(err: DiagnosisError) -> Self {
        StatusError(err)
    }
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        self.0.log(status);

        let body = serde_json::json!({
            "status": "error",
            "message": self.0.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

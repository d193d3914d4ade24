use crate::{
    models::ImageClassifier,
    utils::error::{DiagnosisError, StatusError},
    web::{extractors::UploadForm, AppState},
    Result,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `/api/diagnose` 响应：小写标签，百分比分数
#[derive(Debug, Serialize)]
pub struct DiagnoseResponse {
    pub status: &'static str,
    pub prediction: String,
    pub confidence: f32,
    pub all_predictions: BTreeMap<String, f32>,
}

/// `/classify` 响应：配置中的标签，[0, 1] 分数
#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub result: String,
    pub confidence: f32,
    pub predictions: BTreeMap<String, f32>,
}

fn join_error(e: tokio::task::JoinError) -> DiagnosisError {
    DiagnosisError::Internal(format!("Model loading task failed: {}", e))
}

/// 模型加载是阻塞操作，放到阻塞线程池执行
async fn ensure_classifier(state: &AppState) -> Result<Arc<dyn ImageClassifier>> {
    if let Some(classifier) = state.models.classifier() {
        return Ok(classifier);
    }
    let models = Arc::clone(&state.models);
    tokio::task::spawn_blocking(move || models.ensure_loaded())
        .await
        .map_err(join_error)?
}

/// 显式（重新）加载模型
pub async fn load_model_handler(State(state): State<AppState>) -> Response {
    let models = Arc::clone(&state.models);
    let loaded = tokio::task::spawn_blocking(move || models.load())
        .await
        .map_err(join_error)
        .and_then(|r| r);

    match loaded {
        Ok(classifier) => {
            tracing::info!("Model '{}' loaded successfully", classifier.name());
            Json(json!({
                "status": "success",
                "message": "Model loaded successfully",
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!("Error loading model: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "Failed to load model",
                })),
            )
                .into_response()
        }
    }
}

/// 上传图像并分类，模型未加载时按需加载
pub async fn diagnose_handler(
    State(state): State<AppState>,
    form: std::result::Result<UploadForm, DiagnosisError>,
) -> std::result::Result<Json<DiagnoseResponse>, StatusError> {
    let classifier = ensure_classifier(&state).await.map_err(|e| {
        tracing::error!("Error loading model: {}", e);
        StatusError(DiagnosisError::ModelNotLoaded)
    })?;

    let form = form?;
    let image = form.require_image()?;

    tracing::info!(
        "Processing diagnose request: file={}, bytes={}",
        image.file_name,
        image.bytes.len()
    );

    let prediction = state
        .pipeline
        .classify_upload(classifier, &image.file_name, image.bytes.clone())
        .await?;

    Ok(Json(DiagnoseResponse {
        status: "success",
        prediction: prediction.label.to_lowercase(),
        confidence: prediction.confidence * 100.0,
        all_predictions: prediction.score_map(100.0, true),
    }))
}

/// 上传图像并分类，要求模型已加载
pub async fn classify_handler(
    State(state): State<AppState>,
    form: UploadForm,
) -> Result<Json<ClassifyResponse>> {
    let image = form.require_image()?;
    let classifier = state.models.classifier().ok_or(DiagnosisError::ModelNotLoaded)?;

    tracing::info!(
        "Processing classify request: file={}, bytes={}",
        image.file_name,
        image.bytes.len()
    );

    let prediction = state
        .pipeline
        .classify_upload(classifier, &image.file_name, image.bytes.clone())
        .await?;

    Ok(Json(ClassifyResponse {
        predictions: prediction.score_map(1.0, false),
        result: prediction.label,
        confidence: prediction.confidence,
    }))
}

use crate::{
    diagnosis::{DiagnosisRecord, DiagnosisStore, HistoryEntry, Symptoms},
    utils::error::DiagnosisError,
    web::{extractors::UploadForm, AppState},
    Result,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisAck {
    pub success: bool,
    pub diagnosis_id: String,
    pub message: &'static str,
}

impl DiagnosisAck {
    fn new(diagnosis_id: String, message: &'static str) -> Self {
        Self {
            success: true,
            diagnosis_id,
            message,
        }
    }
}

/// 上传图像，创建一条 uploaded 状态的诊断记录
pub async fn upload_handler(
    State(state): State<AppState>,
    form: UploadForm,
) -> Result<Json<DiagnosisAck>> {
    let image = form.require_image().map_err(|e| match e {
        DiagnosisError::EmptyFilename => DiagnosisError::NoImageSelected,
        other => other,
    })?;

    let diagnosis_id = DiagnosisStore::new_id();
    let path = state
        .storage
        .save_for_diagnosis(&diagnosis_id, &image.file_name, &image.bytes)
        .await?;

    state.store.insert_uploaded(diagnosis_id.clone(), &path);

    tracing::info!(
        "Diagnosis created: id={}, image={}, bytes={}",
        diagnosis_id,
        path.display(),
        image.bytes.len()
    );

    Ok(Json(DiagnosisAck::new(diagnosis_id, "Image uploaded successfully")))
}

/// 分析：可重新上传图像，其余表单字段作为症状
pub async fn analyze_handler(
    State(state): State<AppState>,
    Path(diagnosis_id): Path<String>,
    form: UploadForm,
) -> Result<Json<DiagnosisAck>> {
    if !state.store.contains(&diagnosis_id) {
        return Err(DiagnosisError::DiagnosisNotFound);
    }

    let new_image_path = match form.optional_image()? {
        Some(image) => Some(
            state
                .storage
                .save_for_diagnosis(&diagnosis_id, &image.file_name, &image.bytes)
                .await?,
        ),
        None => None,
    };

    let symptoms = Symptoms::from_form_fields(form.fields);
    let record = state.store.complete(&diagnosis_id, symptoms, new_image_path)?;

    tracing::info!(
        "Diagnosis analyzed: id={}, primary={}",
        record.id,
        record.primary_condition()
    );

    Ok(Json(DiagnosisAck::new(diagnosis_id, "Analysis completed")))
}

/// JSON方式提交症状
pub async fn symptoms_handler(
    State(state): State<AppState>,
    Path(diagnosis_id): Path<String>,
    body: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<DiagnosisAck>> {
    if !state.store.contains(&diagnosis_id) {
        return Err(DiagnosisError::DiagnosisNotFound);
    }

    let object = match body {
        Ok(Json(serde_json::Value::Object(object))) => object,
        Ok(Json(_)) => {
            return Err(DiagnosisError::InvalidInput(
                "Symptoms must be a JSON object".to_string(),
            ))
        }
        Err(rejection) => return Err(DiagnosisError::InvalidInput(rejection.body_text())),
    };

    let record = state
        .store
        .complete(&diagnosis_id, Symptoms::from_json(object), None)?;

    tracing::info!(
        "Symptoms submitted: id={}, primary={}",
        record.id,
        record.primary_condition()
    );

    Ok(Json(DiagnosisAck::new(
        diagnosis_id,
        "Symptoms submitted successfully",
    )))
}

pub async fn results_handler(
    State(state): State<AppState>,
    Path(diagnosis_id): Path<String>,
) -> Result<Json<DiagnosisRecord>> {
    Ok(Json(state.store.results(&diagnosis_id)?))
}

pub async fn history_handler(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.store.history())
}

pub mod auth;
pub mod diagnosis;
pub mod extractors;
pub mod handlers;
pub mod middleware;

use crate::{
    diagnosis::{ClassificationPipeline, DiagnosisStore, UploadStorage},
    models::ModelManager,
    utils::error::DiagnosisError,
    Config, Result,
};
use axum::{
    extract::{DefaultBodyLimit, State},
    middleware::from_fn,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, timeout::TimeoutLayer,
};

/// 各处理器共享的状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub models: Arc<ModelManager>,
    pub pipeline: ClassificationPipeline,
    pub store: Arc<DiagnosisStore>,
    pub storage: UploadStorage,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let models = ModelManager::new(config.clone());
        Self::with_models(config, models)
    }

    pub fn with_models(config: Config, models: ModelManager) -> Self {
        Self {
            pipeline: ClassificationPipeline::new(&config),
            storage: UploadStorage::new(&config.upload_dir),
            store: Arc::new(DiagnosisStore::new()),
            models: Arc::new(models),
            config: Arc::new(config),
        }
    }
}

pub async fn serve(config: Config) -> Result<()> {
    config.ensure_upload_dir()?;

    let state = AppState::new(config.clone());

    // 启动时尝试加载模型，失败不影响服务启动
    let models = Arc::clone(&state.models);
    tokio::task::spawn_blocking(move || models.init())
        .await
        .map_err(|e| DiagnosisError::Internal(format!("Model initialization task failed: {}", e)))?;

    let app = create_app(state);

    // 解析绑定地址
    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        DiagnosisError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /api/load-model              - Load or reload the classifier");
    tracing::info!("  POST /api/diagnose                - Classify an uploaded image");
    tracing::info!("  POST /classify                    - Classify an uploaded image");
    tracing::info!("  POST /api/diagnosis/upload        - Start a diagnosis");
    tracing::info!("  POST /api/diagnosis/:id/analyze   - Analyze with symptoms");
    tracing::info!("  GET  /api/diagnosis/:id/results   - Diagnosis results");
    tracing::info!("  GET  /api/diagnosis/history       - Completed diagnoses");
    tracing::info!("  POST /api/diagnosis/:id/symptoms  - Submit symptoms as JSON");
    tracing::info!("  POST /api/auth/*                  - Mock authentication");
    tracing::info!("  GET  /uploads/*                   - Uploaded images");
    tracing::info!("  GET  /health                      - Health check");
    tracing::info!("  GET  /api/info                    - Service information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        DiagnosisError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DiagnosisError::Internal(format!("Server failed to start: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let server_config = &state.config.server_config;
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        // 分类接口
        .route("/api/load-model", get(handlers::load_model_handler))
        .route("/api/diagnose", post(handlers::diagnose_handler))
        .route("/classify", post(handlers::classify_handler))
        // 诊断记录接口
        .route("/api/diagnosis/upload", post(diagnosis::upload_handler))
        .route("/api/diagnosis/history", get(diagnosis::history_handler))
        .route("/api/diagnosis/:id/analyze", post(diagnosis::analyze_handler))
        .route("/api/diagnosis/:id/symptoms", post(diagnosis::symptoms_handler))
        .route("/api/diagnosis/:id/results", get(diagnosis::results_handler))
        // 认证占位接口
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/user", get(auth::current_user_handler))
        // 系统路由
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .nest_service("/uploads", uploads)
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn(middleware::request_logging))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(server_config.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(server_config.request_timeout)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 健康检查端点
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "model_loaded": state.models.is_loaded(),
    }))
}

/// 服务信息端点
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "service": "Derma Diagnosis Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model": state.models.stats(),
        "diagnoses": state.store.len(),
    }))
}

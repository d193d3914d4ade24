use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// 请求日志中间件，为每个请求分配 `x-request-id`
pub async fn request_logging(req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let content_length = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start_time = Instant::now();
    tracing::debug!(
        "[{}] {} {} started, content-length={}",
        request_id,
        method,
        path,
        content_length
    );

    let mut response = next.run(req).await;

    let status = response.status();
    let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    if status.is_server_error() {
        tracing::warn!("[{}] {} {} - {} - {:.3}ms", request_id, method, path, status, elapsed_ms);
    } else {
        tracing::info!("[{}] {} {} - {} - {:.3}ms", request_id, method, path, status, elapsed_ms);
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// 安全头中间件
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

    response
}

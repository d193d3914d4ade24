//! 认证占位接口：不校验请求体，始终返回固定的令牌和用户。

use axum::response::Json;
use serde::Serialize;
use serde_json::json;

const MOCK_TOKEN: &str = "mock-token";

#[derive(Debug, Clone, Serialize)]
pub struct MockUser {
    pub id: &'static str,
    pub name: &'static str,
    pub email: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: &'static str,
    pub user: MockUser,
}

fn mock_user() -> MockUser {
    MockUser {
        id: "123",
        name: "Test User",
        email: "test@example.com",
    }
}

fn mock_session() -> Json<AuthResponse> {
    Json(AuthResponse {
        token: MOCK_TOKEN,
        user: mock_user(),
    })
}

pub async fn login_handler() -> Json<AuthResponse> {
    tracing::debug!("Mock login");
    mock_session()
}

pub async fn register_handler() -> Json<AuthResponse> {
    tracing::debug!("Mock registration");
    mock_session()
}

pub async fn logout_handler() -> Json<serde_json::Value> {
    Json(json!({ "message": "Logged out successfully" }))
}

pub async fn current_user_handler() -> Json<MockUser> {
    Json(mock_user())
}

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use derma_diagnosis::{
    models::{ClassifierLoader, ImageClassifier, ModelManager},
    web::{create_app, AppState},
    Config, DiagnosisError, Result,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::Array4;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const BOUNDARY: &str = "----dermaTestBoundary7MA4YWxk";

/// 返回固定输出的分类器
pub struct FixedClassifier(pub Vec<f32>);

impl ImageClassifier for FixedClassifier {
    fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed-test-model"
    }
}

/// `None` 表示模型加载失败
pub struct FixedLoader(pub Option<Vec<f32>>);

impl ClassifierLoader for FixedLoader {
    fn load(&self, _config: &Config) -> Result<Arc<dyn ImageClassifier>> {
        match &self.0 {
            Some(scores) => Ok(Arc::new(FixedClassifier(scores.clone()))),
            None => Err(DiagnosisError::ModelLoad(
                "skin_model.onnx not found".to_string(),
            )),
        }
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub upload_dir: TempDir,
}

impl TestApp {
    /// `scores` 为 None 时模型无法加载；`preload` 控制是否在启动时加载
    pub fn new(scores: Option<Vec<f32>>, preload: bool) -> Self {
        let upload_dir = tempfile::tempdir().expect("create temp upload dir");
        let config = Config::with_upload_dir(upload_dir.path());
        let models = ModelManager::with_loader(config.clone(), Box::new(FixedLoader(scores)));
        if preload {
            models.init();
        }
        let state = AppState::with_models(config, models);
        let app = create_app(state.clone());
        Self {
            app,
            state,
            upload_dir,
        }
    }

    pub fn upload_files(&self) -> Vec<String> {
        list_dir(self.upload_dir.path())
    }
}

pub fn list_dir(path: &Path) -> Vec<String> {
    match std::fs::read_dir(path) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

pub fn png_bytes() -> Vec<u8> {
    let img = ImageBuffer::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, (y * 8) as u8, 128u8]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub enum Part<'a> {
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn image_part<'a>(bytes: &'a [u8]) -> Part<'a> {
    Part::File {
        name: "image",
        file_name: "lesion.png",
        content_type: "image/png",
        bytes,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("response is JSON")
}

use crate::utils::error::DiagnosisError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
};

/// multipart中的图像文件字段名
pub const IMAGE_FIELD: &str = "image";

/// 上传的图像文件
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// 解析后的multipart表单：可选的图像文件 + 其余文本字段（按出现顺序）
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub image: Option<ImageUpload>,
    pub fields: Vec<(String, String)>,
}

impl UploadForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, DiagnosisError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(|s| s.to_string());
            let content_type = field.content_type().map(|s| s.to_string());

            match file_name {
                // 只有带文件名的字段才视为文件
                Some(file_name) if name == IMAGE_FIELD => {
                    let bytes = field.bytes().await?;
                    if form.image.is_some() {
                        tracing::debug!("Ignoring additional image field '{}'", file_name);
                        continue;
                    }
                    tracing::debug!("Received file '{}': {} bytes", file_name, bytes.len());
                    form.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                Some(file_name) => {
                    tracing::debug!("Ignoring file field '{}' ({})", name, file_name);
                }
                None => {
                    let value = field.text().await?;
                    form.fields.push((name, value));
                }
            }
        }

        Ok(form)
    }

    /// 取出必需的图像文件：缺失 -> NoImage，文件名为空 -> EmptyFilename，非图像类型 -> UnsupportedFormat
    pub fn require_image(&self) -> Result<&ImageUpload, DiagnosisError> {
        let image = self.image.as_ref().ok_or(DiagnosisError::NoImage)?;
        if image.file_name.is_empty() {
            return Err(DiagnosisError::EmptyFilename);
        }
        image.check_content_type()?;
        Ok(image)
    }

    /// 可选的图像文件：文件名为空时视为未上传
    pub fn optional_image(&self) -> Result<Option<&ImageUpload>, DiagnosisError> {
        match &self.image {
            Some(image) if !image.file_name.is_empty() => {
                image.check_content_type()?;
                Ok(Some(image))
            }
            _ => Ok(None),
        }
    }
}

impl ImageUpload {
    fn check_content_type(&self) -> Result<(), DiagnosisError> {
        match self.content_type.as_deref() {
            Some(ct) if !ct.starts_with("image/") && ct != "application/octet-stream" => {
                Err(DiagnosisError::UnsupportedFormat(ct.to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// 非multipart请求视为空表单，由处理器返回 "No image provided"
#[async_trait]
impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = DiagnosisError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Multipart::from_request(req, state).await {
            Ok(multipart) => UploadForm::from_multipart(multipart).await,
            Err(rejection) => {
                tracing::debug!("Request is not multipart: {}", rejection);
                Ok(UploadForm::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(file_name: &str, content_type: Option<&str>) -> UploadForm {
        UploadForm {
            image: Some(ImageUpload {
                file_name: file_name.to_string(),
                content_type: content_type.map(str::to_string),
                bytes: Bytes::from_static(b"x"),
            }),
            fields: Vec::new(),
        }
    }

    #[test]
    fn require_image_checks_presence_and_name() {
        assert!(matches!(
            UploadForm::default().require_image(),
            Err(DiagnosisError::NoImage)
        ));
        assert!(matches!(
            upload("", Some("image/png")).require_image(),
            Err(DiagnosisError::EmptyFilename)
        ));
        assert!(upload("a.png", Some("image/png")).require_image().is_ok());
        assert!(upload("a.bin", None).require_image().is_ok());
    }

    #[test]
    fn rejects_non_image_content_type() {
        assert!(matches!(
            upload("notes.txt", Some("text/plain")).require_image(),
            Err(DiagnosisError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn optional_image_treats_empty_name_as_absent() {
        assert!(upload("", None).optional_image().unwrap().is_none());
        assert!(upload("a.jpg", Some("image/jpeg"))
            .optional_image()
            .unwrap()
            .is_some());
    }
}

//! Multipart media uploads for the file conversion service.

use std::path::Path;

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

use crate::client::RestClient;
use crate::error::{RestError, RestResult};

const DEFAULT_MIME: &str = "application/octet-stream";

/// One file plus the metadata the conversion service stores with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    /// Original file name.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// MIME type of the file.
    pub mime: String,
    /// Media record id; a fresh one is generated when the record has none yet.
    pub uuid: Uuid,
    /// Media type label.
    pub media_type: Option<String>,
    /// Media type term id.
    pub media_type_uuid: Option<String>,
    /// Creator actor id.
    pub creator: Option<String>,
    /// Capture date.
    pub captured_at: Option<String>,
    /// License term (the record's `copyright` field).
    pub license: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Kind of the record the media belongs to.
    pub parent_type: Option<String>,
    /// Id of the record the media belongs to.
    pub parent: Option<String>,
}

/// Reply of the conversion service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    /// Status text.
    #[serde(default)]
    pub message: Option<String>,
    /// Public path of the stored (converted) file.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Name the file was uploaded with.
    #[serde(default)]
    pub file_originalname: Option<String>,
    /// Name the file was stored under.
    #[serde(default)]
    pub file_filename: Option<String>,
}

impl UploadResponse {
    /// `"<message> <original> --> <stored>"`, the text shown after an upload.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} {} --> {}",
            self.message.as_deref().unwrap_or_default(),
            self.file_originalname.as_deref().unwrap_or_default(),
            self.file_filename.as_deref().unwrap_or_default()
        )
    }
}

impl MediaUpload {
    /// Upload of in-memory bytes with no metadata beyond the id.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>, uuid: Option<Uuid>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime: DEFAULT_MIME.to_string(),
            uuid: uuid.unwrap_or_else(Uuid::new_v4),
            media_type: None,
            media_type_uuid: None,
            creator: None,
            captured_at: None,
            license: None,
            description: None,
            parent_type: None,
            parent: None,
        }
    }

    /// Read a local file, guessing its MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Io`] when the file cannot be read.
    pub async fn from_path(path: &Path, uuid: Option<Uuid>) -> RestResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|source| RestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let mut upload = Self::new(file_name, bytes, uuid);
        upload.mime = mime_for(path).to_string();
        Ok(upload)
    }

    /// Metadata fields in form order; absent values are skipped.
    #[must_use]
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let optional = [
            ("media_type", &self.media_type),
            ("media_type_uuid", &self.media_type_uuid),
            ("creator", &self.creator),
            ("captured_at", &self.captured_at),
            ("license", &self.license),
            ("description", &self.description),
            ("parent_type", &self.parent_type),
            ("parent", &self.parent),
        ];
        let mut fields = vec![("uuid", self.uuid.to_string())];
        fields.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.clone().map(|value| (name, value))),
        );
        fields
    }

    fn into_form(self) -> RestResult<Form> {
        let fields = self.text_fields();
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)
            .map_err(|source| RestError::Multipart {
                field: "file",
                source,
            })?;
        let form = fields
            .into_iter()
            .fold(Form::new().part("file", part), |form, (name, value)| {
                form.text(name, value)
            });
        Ok(form)
    }
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("tif" | "tiff") => "image/tiff",
        Some("pdf") => "application/pdf",
        Some("jp2") => "image/jp2",
        _ => DEFAULT_MIME,
    }
}

impl RestClient {
    /// Post `upload` as `multipart/form-data` to the conversion endpoint.
    ///
    /// # Errors
    ///
    /// Returns the multipart, transport, status, or decode failure.
    pub async fn upload_media(
        &self,
        endpoint: &Url,
        upload: MediaUpload,
    ) -> RestResult<UploadResponse> {
        let file_name = upload.file_name.clone();
        let form = upload.into_form()?;
        let response = match self
            .http_client()
            .post(endpoint.clone())
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(source) => {
                error!(url = %endpoint, error = %source, "upload failed");
                return Err(RestError::Transport {
                    method: Method::POST,
                    url: endpoint.to_string(),
                    source,
                });
            }
        };
        let value = self.finish(Method::POST, endpoint.clone(), response).await?;
        info!(file = %file_name, "file uploaded");
        if value.is_null() {
            return Ok(UploadResponse::default());
        }
        serde_json::from_value::<UploadResponse>(value).map_err(|source| {
            error!(url = %endpoint, error = %source, "unexpected upload response");
            RestError::Decode {
                url: endpoint.to_string(),
                source,
            }
        })
    }
}

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use mime_guess::mime;
use tracing::debug;

use crate::error::UploadError;
use crate::remote::SubmissionKind;

/// Default cap on an upload's size (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// The file types the solver accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Jpeg,
    Png,
}

impl MediaType {
    /// Declared type of a file, guessed from its extension the way a browser would.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let guessed = mime_guess::from_path(path).first();
        match guessed {
            Some(ref m) if *m == mime::APPLICATION_PDF => Ok(MediaType::Pdf),
            Some(ref m) if *m == mime::IMAGE_JPEG => Ok(MediaType::Jpeg),
            Some(ref m) if *m == mime::IMAGE_PNG => Ok(MediaType::Png),
            other => Err(UploadError::UnsupportedType {
                declared: other.map(|m| m.essence_str().to_string()),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }

    /// Primary category of the media type, sent as the request's `type`.
    pub fn kind(&self) -> SubmissionKind {
        match self {
            MediaType::Pdf => SubmissionKind::Application,
            MediaType::Jpeg | MediaType::Png => SubmissionKind::Image,
        }
    }
}

/// A file read fully into memory and encoded for transport.
#[derive(Debug, Clone)]
pub struct EncodedFile {
    pub name: String,
    pub media_type: MediaType,
    /// `data:<mime>;base64,<payload>`
    pub data_uri: String,
}

/// Validate, read and encode the file at `path`.
///
/// Type is checked before the file is opened and size before it is read, so a
/// rejected upload never touches the file contents.
pub async fn read_upload(path: &Path, max_bytes: u64) -> Result<EncodedFile, UploadError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let media_type = MediaType::from_path(path)?;

    let size = tokio::fs::metadata(path).await?.len();
    if size > max_bytes {
        return Err(UploadError::TooLarge {
            name,
            size,
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await?;
    // The file may have grown since the metadata call
    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(UploadError::TooLarge {
            name,
            size,
            limit: max_bytes,
        });
    }

    debug!(file = %name, media_type = media_type.as_str(), size, "encoded upload");

    Ok(EncodedFile {
        name,
        media_type,
        data_uri: data_uri(media_type, &bytes),
    })
}

fn data_uri(media_type: MediaType, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type.as_str(), STANDARD.encode(bytes))
}

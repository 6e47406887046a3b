//! Error types for submissions.
//!
//! Every variant here ends up either as an `error` entry in the conversation or
//! as a [`Rejection`] handed back to the caller. None of them are fatal.

use std::time::Duration;

use thiserror::Error;

/// Why an upload was refused before any network call was made.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Declared media type is not PDF, JPEG or PNG.
    #[error("Please upload a PDF or image file (JPG/PNG)")]
    UnsupportedType {
        /// The guessed media type, if the extension mapped to one.
        declared: Option<String>,
    },

    /// File exceeds the configured upload limit.
    #[error("File \"{name}\" is too large ({size} bytes, limit {limit} bytes)")]
    TooLarge { name: String, size: u64, limit: u64 },

    /// The file could not be read into memory.
    #[error("Error uploading file: {0}")]
    Read(#[from] std::io::Error),
}

/// A failed exchange with the remote endpoint.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Endpoint answered with a non-2xx status.
    #[error("Server responded with {0}")]
    Status(u16),

    /// Request did not settle within the configured timeout.
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Connection or I/O failure.
    #[error("{0}")]
    Transport(#[source] reqwest::Error),

    /// Body was not JSON or lacked a string `response` field.
    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The task carrying the request died before it settled.
    #[error("Request was interrupted: {0}")]
    Interrupted(String),
}

/// A submission the pipeline declined without touching the conversation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("nothing to submit")]
    Empty,

    #[error("a request is already in flight")]
    Pending,

    /// The upload failed validation; an error entry was appended.
    #[error("upload refused")]
    Invalid,
}

pub mod config;
pub mod error;
pub mod message;
pub mod pipeline;
pub mod remote;
pub mod render;
pub mod upload;

// Re-export main types for convenience
pub use config::{Config, Settings};
pub use error::{Rejection, RemoteError, UploadError};
pub use message::{Content, Conversation, FileDescriptor, Message, MessageId, Role};
pub use pipeline::Pipeline;
pub use remote::{HttpRemote, Remote, RemoteRequest, SubmissionKind};
pub use render::{render, Rendered, Segment};
pub use upload::{EncodedFile, MediaType};

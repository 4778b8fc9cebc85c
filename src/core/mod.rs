//! Core client types: configuration, errors, identifiers and data model.

pub mod config;
pub mod document;
pub mod errors;
pub mod ids;
pub mod message;

pub use config::ClientConfig;
pub use document::{Document, PDF_MIME, UploadFile};
pub use errors::{ClientError, ClientResult};
pub use ids::{DocumentId, NoticeId, QuestionId};
pub use message::{Message, MessageKind};

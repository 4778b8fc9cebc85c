//! UI-facing projections and notices.

pub mod notices;
pub mod projection;

pub use notices::{Notice, NoticeBoard, NoticeKind};
pub use projection::{DocumentEntry, ViewProjection, ViewSnapshot};

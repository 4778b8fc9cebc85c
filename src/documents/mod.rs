//! Document registry and upload validation.

pub mod registry;
pub mod upload;

pub use registry::DocumentRegistry;
pub use upload::{MULTIPLE_FILES_MESSAGE, NOT_PDF_MESSAGE, validate_selection};

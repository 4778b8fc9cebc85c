//! Local validation of upload selections.

use crate::core::document::UploadFile;
use crate::gateway::{GatewayError, GatewayResult};

/// Shown when the selection is not a PDF.
pub const NOT_PDF_MESSAGE: &str = "Please upload only PDF files";
/// Shown when more than one file is selected.
pub const MULTIPLE_FILES_MESSAGE: &str = "Please upload one PDF file at a time";

/// Accept exactly one PDF.
///
/// An empty selection is not an error and yields `Ok(None)`.
///
/// # Errors
/// Returns a validation error for multiple files or a non-PDF type.
pub fn validate_selection(mut files: Vec<UploadFile>) -> GatewayResult<Option<UploadFile>> {
    if files.len() > 1 {
        return Err(GatewayError::Validation(MULTIPLE_FILES_MESSAGE.to_string()));
    }
    let Some(file) = files.pop() else {
        return Ok(None);
    };
    if !file.is_pdf() {
        return Err(GatewayError::Validation(NOT_PDF_MESSAGE.to_string()));
    }
    Ok(Some(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_pdf() {
        let file = UploadFile::new("a.pdf", "application/pdf", vec![1]);
        assert_eq!(validate_selection(vec![file.clone()]).unwrap(), Some(file));
    }

    #[test]
    fn empty_selection_is_noop() {
        assert_eq!(validate_selection(vec![]).unwrap(), None);
    }

    #[test]
    fn rejects_other_types_and_multiple_files() {
        let text = UploadFile::new("a.txt", "text/plain", vec![]);
        assert_eq!(
            validate_selection(vec![text]).unwrap_err(),
            GatewayError::Validation(NOT_PDF_MESSAGE.to_string())
        );

        let pdf = UploadFile::new("a.pdf", "application/pdf", vec![]);
        let err = validate_selection(vec![pdf.clone(), pdf]).unwrap_err();
        assert_eq!(err.user_message(), Some(MULTIPLE_FILES_MESSAGE));
    }
}

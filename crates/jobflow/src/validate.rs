//! Basic format checks for values entering the workflow.

use crate::media::{self, DocumentKind};
use crate::workflow::{DocumentRef, NewJob, WorkflowError};

/// File extensions accepted for completion photos.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

fn invalid(field: &'static str, reason: impl Into<String>) -> WorkflowError {
    WorkflowError::Validation {
        field,
        reason: reason.into(),
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// True if the file name ends in `.pdf` (any case).
pub fn is_pdf_name(file_name: &str) -> bool {
    extension_of(file_name).as_deref() == Some("pdf")
}

/// True if the file name has one of [`IMAGE_EXTENSIONS`] (any case).
pub fn is_image_name(file_name: &str) -> bool {
    extension_of(file_name)
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn non_blank(field: &'static str, value: &str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be blank"));
    }
    Ok(())
}

/// Accepts `http://` and `https://` links without whitespace.
pub fn gps_link(value: &str) -> Result<(), WorkflowError> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(|| invalid("gps_link", "must be an http or https URL"))?;
    if rest.is_empty() || rest.chars().any(char::is_whitespace) {
        return Err(invalid("gps_link", "must be an http or https URL"));
    }
    Ok(())
}

pub fn new_job(details: &NewJob) -> Result<(), WorkflowError> {
    non_blank("address_details", &details.address_details)?;
    non_blank("quote_request_details", &details.quote_request_details)?;
    gps_link(&details.gps_link)
}

/// A document must live in the media directory for its kind, as
/// `<kind directory>/<file name>`, with the extension that kind accepts
/// (PDF, or an image for completion photos).
pub fn document(
    kind: DocumentKind,
    field: &'static str,
    document: &DocumentRef,
) -> Result<(), WorkflowError> {
    non_blank(field, document.as_str())?;
    match media::classify(document.as_str()) {
        Some((found, _)) if found == kind => Ok(()),
        Some((found, _)) => Err(invalid(
            field,
            format!(
                "'{}' is under {}/, expected {}/",
                document,
                found.directory(),
                kind.directory()
            ),
        )),
        None if !kind.accepts(document.file_name()) => Err(invalid(
            field,
            format!("'{}' is not a supported {} file", document, kind),
        )),
        None => Err(invalid(
            field,
            format!("'{}' must be stored under {}/", document, kind.directory()),
        )),
    }
}

/// Blank comments are treated as no comments.
pub fn normalize_comments(comments: Option<String>) -> Option<String> {
    comments
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

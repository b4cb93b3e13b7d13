//! Uploaded documents and photos on disk.
//!
//! Every file lives at `<media_directory>/<kind directory>/<file name>` and is
//! referenced from jobs by the relative part (`quotes/q.pdf`).

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::validate;
use crate::workflow::DocumentRef;

/// The kinds of uploaded file a job can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Quote,
    DepositProofOfPayment,
    Invoice,
    FinalPaymentPop,
    CompletionPhoto,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Quote,
        DocumentKind::DepositProofOfPayment,
        DocumentKind::Invoice,
        DocumentKind::FinalPaymentPop,
        DocumentKind::CompletionPhoto,
    ];

    /// Directory under the media root.
    pub fn directory(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "quotes",
            DocumentKind::DepositProofOfPayment => "deposit_pops",
            DocumentKind::Invoice => "invoices",
            DocumentKind::FinalPaymentPop => "final_payment_pops",
            DocumentKind::CompletionPhoto => "completion_photos",
        }
    }

    pub fn from_directory(directory: &str) -> Option<Self> {
        DocumentKind::ALL
            .into_iter()
            .find(|k| k.directory() == directory)
    }

    /// Whether a file with this name may be stored as this kind.
    pub fn accepts(&self, file_name: &str) -> bool {
        match self {
            DocumentKind::CompletionPhoto => validate::is_image_name(file_name),
            _ => validate::is_pdf_name(file_name),
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DocumentKind::Quote => "quote",
            DocumentKind::DepositProofOfPayment => "deposit proof of payment",
            DocumentKind::Invoice => "invoice",
            DocumentKind::FinalPaymentPop => "final payment proof of payment",
            DocumentKind::CompletionPhoto => "completion photo",
        };
        f.write_str(label)
    }
}

/// Splits a media path into its kind and file name.
///
/// Only `<kind directory>/<file name>` with an accepted extension qualifies.
/// Absolute paths, `..` and `.` components, and unknown directories give
/// `None`.
pub fn classify(path: &str) -> Option<(DocumentKind, &str)> {
    if path.is_empty() || path.contains('\\') {
        return None;
    }
    let candidate = Path::new(path);
    if candidate
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let (directory, file_name) = path.split_once('/')?;
    if file_name.is_empty() || file_name.contains('/') {
        return None;
    }
    let kind = DocumentKind::from_directory(directory)?;
    kind.accepts(file_name).then_some((kind, file_name))
}

/// Stores uploaded files under a media root directory.
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `content` as `file_name` for the given kind and returns its
    /// reference. Existing files are never overwritten; a clashing name gets
    /// a numeric suffix (`q_2.pdf`).
    pub fn store(
        &self,
        kind: DocumentKind,
        file_name: &str,
        content: &[u8],
    ) -> Result<DocumentRef, StorageError> {
        check_file_name(file_name)?;
        if !kind.accepts(file_name) {
            return Err(StorageError::UnsupportedFile {
                name: file_name.to_string(),
                kind: kind.to_string(),
            });
        }

        let dir_path = self.root.join(kind.directory());
        self.ensure_directory(&dir_path)?;

        let stored = self.store_with_atomic_creation(&dir_path, file_name, content)?;
        let reference = DocumentRef::new(format!("{}/{}", kind.directory(), stored));
        log::info!("Stored {} as {}", kind, reference);
        Ok(reference)
    }

    /// Absolute location of a valid media path.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        classify(path).ok_or_else(|| StorageError::InvalidFileName(path.to_string()))?;
        Ok(self.root.join(path))
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        std::fs::read(&full).map_err(|e| StorageError::ReadFile {
            path: full,
            source: e,
        })
    }

    /// Creates the file exclusively, trying numbered variants on conflict.
    /// Returns the file name actually used.
    fn store_with_atomic_creation(
        &self,
        dir_path: &Path,
        file_name: &str,
        content: &[u8],
    ) -> Result<String, StorageError> {
        let (base, ext) = match file_name.rfind('.') {
            Some(dot_pos) => (&file_name[..dot_pos], Some(&file_name[dot_pos..])),
            None => (file_name, None),
        };

        for counter in 1..=1000 {
            let try_name = if counter == 1 {
                file_name.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };
            let try_path = dir_path.join(&try_name);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_name);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(dir_path.join(file_name)))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Plain file names only: no separators, no leading dot.
fn check_file_name(file_name: &str) -> Result<(), StorageError> {
    let bad = file_name.trim().is_empty()
        || file_name.starts_with('.')
        || file_name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StorageError::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

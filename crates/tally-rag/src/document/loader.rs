//! PDF directory loading.
//!
//! One unreadable file never aborts the batch: extraction failures are
//! logged and the file skipped.

use std::fs;
use std::path::{Path, PathBuf};

use crate::TRACING_TARGET;

/// Loads extracted text for every readable PDF in `directory`.
///
/// Returns `(filename, text)` pairs in filename order so downstream
/// chunking is deterministic. A missing directory or a directory without
/// PDFs yields an empty vec; callers treat emptiness as ingestion failure.
pub(super) fn load_pdf_texts(directory: &Path) -> Vec<(String, String)> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::error!(
                target: TRACING_TARGET,
                directory = %directory.display(),
                error = %error,
                "Directory not found"
            );
            return Vec::new();
        }
    };

    let mut pdf_files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if pdf_files.is_empty() {
        tracing::warn!(
            target: TRACING_TARGET,
            directory = %directory.display(),
            "No PDF files found"
        );
        return Vec::new();
    }

    pdf_files.sort();

    tracing::info!(
        target: TRACING_TARGET,
        directory = %directory.display(),
        count = %pdf_files.len(),
        "Found PDF files"
    );

    let mut documents = Vec::with_capacity(pdf_files.len());

    for path in pdf_files {
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match pdf_extract::extract_text(&path) {
            Ok(text) => documents.push((source, text)),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    source = %source,
                    error = %error,
                    "Skipping unreadable PDF"
                );
            }
        }
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_yields_nothing() {
        let documents = load_pdf_texts(Path::new("/does/not/exist"));
        assert!(documents.is_empty());
    }

    #[test]
    fn directory_without_pdfs_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "not a pdf").unwrap();

        let documents = load_pdf_texts(dir.path());
        assert!(documents.is_empty());
    }

    #[test]
    fn corrupt_pdf_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.pdf"), b"definitely not a pdf").unwrap();

        let documents = load_pdf_texts(dir.path());
        assert!(documents.is_empty());
    }
}

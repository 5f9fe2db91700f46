//! Reading files from disk into uploads.

use crate::error::{IngestError, IngestResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A file ready to be handed to the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub content: String,
}

/// Guess a MIME type from the file extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "txt" | "text" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "json" => "application/json",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "rtf" => "application/rtf",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Read a single file as text.
///
/// Files that are not valid UTF-8 are rejected; no format conversion is done.
pub fn read_file(path: &Path) -> IngestResult<UploadedFile> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let content = String::from_utf8(bytes).map_err(|_| {
        IngestError::UnsupportedFileType(format!("{} is not a text file", path.display()))
    })?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read {} ({} bytes)", name, content.len());

    Ok(UploadedFile {
        name,
        mime_type: guess_mime_type(path).to_string(),
        content,
    })
}

/// Read every text file under a directory, skipping hidden and binary files.
pub fn read_dir(path: &Path) -> IngestResult<Vec<UploadedFile>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_str()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        match read_file(entry.path()) {
            Ok(file) => files.push(file),
            Err(IngestError::UnsupportedFileType(reason)) => {
                warn!("Skipping {}", reason);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(files)
}

/// Read a file or directory, expanding a leading `~`.
pub fn read_path(path: &str) -> IngestResult<Vec<UploadedFile>> {
    let expanded = PathBuf::from(shellexpand::tilde(path).as_ref());

    if expanded.is_dir() {
        read_dir(&expanded)
    } else if expanded.exists() {
        Ok(vec![read_file(&expanded)?])
    } else {
        Err(IngestError::FileNotFound(expanded))
    }
}

fn is_hidden(name: Option<&str>) -> bool {
    name.map(|n| n.starts_with('.')).unwrap_or(false)
}

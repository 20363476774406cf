//! Loading `.txt` files from a directory into [`Document`]s.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// List the `.txt` files directly inside `dir`, sorted by path.
///
/// Subdirectories are not descended into. Symlinks are followed, so a link
/// to a `.txt` file is loaded like the file itself.
///
/// # Errors
///
/// Returns [`RagError::MissingDirectory`] if `dir` does not exist or is not
/// a directory, and [`RagError::Io`] if an entry cannot be read (including a
/// dangling symlink).
pub fn discover_text_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(RagError::MissingDirectory(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            RagError::io(path, e.into())
        })?;
        let is_txt = entry.path().extension().is_some_and(|ext| ext == "txt");
        if entry.file_type().is_file() && is_txt {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Read every `.txt` file in `dir` as UTF-8 and tag it with its filename.
///
/// Each document's id and `source` metadata are the bare filename; `type` is
/// derived via [`DocumentKind::from_filename`](crate::DocumentKind::from_filename).
///
/// # Errors
///
/// Returns [`RagError::MissingDirectory`] if `dir` is absent and
/// [`RagError::Io`] if a file cannot be read or is not valid UTF-8.
pub fn load_text_documents(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let files = discover_text_files(dir)?;
    let mut documents = Vec::with_capacity(files.len());

    for path in files {
        let text = fs::read_to_string(&path).map_err(|e| RagError::io(&path, e))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(file = %filename, bytes = text.len(), "loaded text file");
        let uri = path.display().to_string();
        documents.push(Document::from_file(filename, text).with_source_uri(uri));
    }

    Ok(documents)
}

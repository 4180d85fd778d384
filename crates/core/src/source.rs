//! Source provider abstraction and source-set parsing.
//!
//! The [`SourceProvider`] trait abstracts file I/O so parsing can run over
//! the filesystem or over in-memory text in tests.

use crate::document::Document;
use crate::error::{ParseAnomaly, SourceError};
use crate::lexer::strip_bom;
use crate::parser;
use crate::policy::SourceOptions;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub trait SourceProvider {
    /// Read the source text for a given path.
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;

    fn is_dir(&self, path: &Path) -> bool;

    /// Direct children of a directory, in any order.
    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, std::io::Error>;
}

/// Default filesystem-backed source provider.
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
        std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}

/// In-memory source provider for testing.
///
/// Maps paths to source text. A path is a directory when some stored file
/// lives beneath it.
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    pub fn new(files: HashMap<PathBuf, String>) -> Self {
        Self { files }
    }
}

impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found in memory: {}", path.display()),
            )
        })
    }

    fn is_dir(&self, path: &Path) -> bool {
        !self.files.contains_key(path) && self.files.keys().any(|k| k.starts_with(path))
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
        Ok(self
            .files
            .keys()
            .filter(|k| k.parent() == Some(dir))
            .cloned()
            .collect())
    }
}

/// One parsed source file. `text` is the BOM-stripped original, kept for
/// span location and splicing.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub id: String,
    pub text: String,
    pub document: Document,
    pub anomalies: Vec<ParseAnomaly>,
}

impl ParsedFile {
    pub fn parse(id: impl Into<String>, text: &str) -> Self {
        let text = strip_bom(text).to_owned();
        let (document, anomalies) = parser::parse_str(&text);
        let id = id.into();
        for anomaly in &anomalies {
            tracing::warn!(file = %id, ?anomaly, "structural anomaly");
        }
        ParsedFile {
            id,
            text,
            document,
            anomalies,
        }
    }
}

/// A family of parsed files, in load order.
#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
    pub files: Vec<ParsedFile>,
}

impl ParsedSource {
    /// Parse in-memory `(id, text)` pairs.
    pub fn from_texts<I, S, T>(texts: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        ParsedSource {
            files: texts
                .into_iter()
                .map(|(id, text)| ParsedFile::parse(id, text.as_ref()))
                .collect(),
        }
    }

    pub fn file(&self, id: &str) -> Option<&ParsedFile> {
        self.files.iter().find(|f| f.id == id)
    }

    /// Raw text of every file, keyed by file id.
    pub fn raw_text_by_file(&self) -> HashMap<&str, &str> {
        self.files
            .iter()
            .map(|f| (f.id.as_str(), f.text.as_str()))
            .collect()
    }

    pub fn anomaly_count(&self) -> usize {
        self.files.iter().map(|f| f.anomalies.len()).sum()
    }
}

/// Expand directories into their matching files (sorted by name, skip list
/// applied); plain file paths pass through unchanged.
pub fn expand_paths(
    paths: &[PathBuf],
    provider: &dyn SourceProvider,
    options: &SourceOptions,
) -> Result<Vec<PathBuf>, SourceError> {
    let mut out = Vec::new();
    for path in paths {
        if !provider.is_dir(path) {
            out.push(path.clone());
            continue;
        }
        let mut children: Vec<PathBuf> = provider
            .list_dir(path)
            .map_err(|source| SourceError::Read {
                path: path.display().to_string(),
                source,
            })?
            .into_iter()
            .filter(|p| {
                let name = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                p.extension().and_then(|e| e.to_str()) == Some(options.extension.as_str())
                    && !options.skip.contains(&*name)
            })
            .collect();
        children.sort();
        out.extend(children);
    }
    Ok(out)
}

/// Read and parse every source (directories expanded), keeping raw text by
/// file.
pub fn parse_source(
    paths: &[PathBuf],
    provider: &dyn SourceProvider,
    options: &SourceOptions,
) -> Result<ParsedSource, SourceError> {
    let mut files = Vec::new();
    for path in expand_paths(paths, provider, options)? {
        let text = provider
            .read_source(&path)
            .map_err(|source| SourceError::Read {
                path: path.display().to_string(),
                source,
            })?;
        files.push(ParsedFile::parse(path.display().to_string(), &text));
    }
    tracing::info!(files = files.len(), "parsed sources");
    Ok(ParsedSource { files })
}

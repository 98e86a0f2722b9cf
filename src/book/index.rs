//! Book index resolution.
//!
//! A book is a title plus an ordered list of chapter files. The index is
//! either given explicitly or scanned from an entry document: its first
//! level-1 heading is the title and every link to a chapter file, in link
//! order, is a chapter.

use std::fs;
use std::path::{Path, PathBuf};

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::decode_text;

/// Entry documents tried, in order, when no index is given.
pub const DEFAULT_ENTRY_CANDIDATES: &[&str] = &["README.md", "index.md"];

/// Extension of chapter files.
pub const DEFAULT_CHAPTER_EXTENSION: &str = "md";

/// Title and ordered chapter list of a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookIndex {
    pub title: String,
    pub files: Vec<PathBuf>,
}

impl BookIndex {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.files.push(file.into());
        self
    }

    /// Parse an explicit index from JSON (`{"title": …, "files": […]}`).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load an explicit index from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&json)
    }
}

/// Where the index comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexSource {
    /// Title and chapters given directly.
    Explicit(BookIndex),
    /// Scan this entry document.
    Entry(String),
    /// Scan the first existing default entry document.
    #[default]
    Default,
}

/// An index together with the entry document it was scanned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIndex {
    pub index: BookIndex,
    /// `None` for explicit indexes.
    pub entry: Option<PathBuf>,
}

/// Turns an [`IndexSource`] into a [`BookIndex`].
#[derive(Debug, Clone)]
pub struct IndexResolver {
    base_dir: PathBuf,
    candidates: Vec<String>,
    extension: String,
}

impl IndexResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            candidates: DEFAULT_ENTRY_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extension: DEFAULT_CHAPTER_EXTENSION.to_string(),
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn resolve(&self, source: &IndexSource) -> Result<ResolvedIndex> {
        match source {
            IndexSource::Explicit(index) => Ok(ResolvedIndex {
                index: index.clone(),
                entry: None,
            }),
            IndexSource::Entry(name) => self.resolve_candidates(std::slice::from_ref(name)),
            IndexSource::Default => self.resolve_candidates(&self.candidates),
        }
    }

    /// Scan the first candidate that exists.
    ///
    /// Only a missing file moves on to the next candidate; any other read
    /// failure is returned as is.
    fn resolve_candidates(&self, candidates: &[String]) -> Result<ResolvedIndex> {
        for candidate in candidates {
            let path = self.base_dir.join(candidate);
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!("no index at {}", path.display());
                    continue;
                }
                Err(e) => return Err(Error::io(&path, e)),
            };

            log::info!("reading book index from {}", path.display());
            let index = scan_entry(&decode_text(&bytes), &self.extension);
            return Ok(ResolvedIndex {
                index,
                entry: Some(path),
            });
        }

        Err(Error::IndexNotFound {
            candidates: candidates.to_vec(),
        })
    }
}

/// Build an index from an entry document.
///
/// The first level-1 heading becomes the title; every link whose target ends
/// in `.{extension}` becomes a chapter. Chapter paths are kept as written,
/// like those of an explicit index; [`resolve_chapter`] anchors them.
pub fn scan_entry(content: &str, extension: &str) -> BookIndex {
    let suffix = format!(".{extension}");
    let mut index = BookIndex::default();
    let mut title: Option<String> = None;
    let mut in_title = false;

    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) if title.is_none() => {
                in_title = true;
                title = Some(String::new());
            }
            Event::End(TagEnd::Heading(_)) => in_title = false,
            Event::Text(text) | Event::Code(text) if in_title => {
                if let Some(title) = title.as_mut() {
                    title.push_str(&text);
                }
            }
            Event::Start(Tag::Link { dest_url, .. }) if dest_url.ends_with(suffix.as_str()) => {
                index.files.push(PathBuf::from(dest_url.as_ref()));
            }
            _ => {}
        }
    }

    index.title = title.unwrap_or_default();
    index
}

/// Resolve a chapter reference against `base_dir`, appending the chapter
/// extension when it is missing.
pub fn resolve_chapter(base_dir: &Path, file: &Path, extension: &str) -> PathBuf {
    let suffix = format!(".{extension}");
    let name = file.to_string_lossy();

    if name.ends_with(suffix.as_str()) {
        base_dir.join(file)
    } else {
        base_dir.join(format!("{name}{suffix}"))
    }
}

//! Book model: where the chapters are and how they are read.
//!
//! A [`BookIndex`] names a title and an ordered chapter list. It comes from an
//! [`IndexSource`] through an [`IndexResolver`]; the chapters are then read
//! with [`load_chapters`] and concatenated in index order.

mod index;

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

pub use index::{
    BookIndex, DEFAULT_CHAPTER_EXTENSION, DEFAULT_ENTRY_CANDIDATES, IndexResolver, IndexSource,
    ResolvedIndex, resolve_chapter, scan_entry,
};

use crate::error::{Error, Result};
use crate::util::decode_text;

/// Separator placed between concatenated chapters.
pub const CHAPTER_SEPARATOR: &str = "\n\n";

/// A chapter read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub path: PathBuf,
    pub content: String,
}

/// Read every chapter of `index`, resolving each file against `base_dir`.
///
/// Reads run in parallel; the result is in index order. The first failing
/// read aborts the whole load.
pub fn load_chapters(index: &BookIndex, base_dir: &Path, extension: &str) -> Result<Vec<Chapter>> {
    let paths: Vec<PathBuf> = index
        .files
        .iter()
        .map(|file| resolve_chapter(base_dir, file, extension))
        .collect();

    log::debug!("reading {} chapters", paths.len());

    paths
        .into_par_iter()
        .map(|path| -> Result<Chapter> {
            let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
            let content = decode_text(&bytes).into_owned();
            Ok(Chapter { path, content })
        })
        .collect()
}

/// Concatenate chapter contents in order.
pub fn join_chapters(chapters: &[Chapter]) -> String {
    chapters
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join(CHAPTER_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_chapters_in_index_order() {
        let dir = TempDir::new().unwrap();
        for i in 0..16 {
            write(dir.path(), &format!("ch{i}.md"), &format!("# Chapter {i}"));
        }

        let mut index = BookIndex::new("Book");
        for i in (0..16).rev() {
            index = index.with_file(format!("ch{i}"));
        }

        let chapters = load_chapters(&index, dir.path(), "md").unwrap();
        let titles: Vec<_> = chapters.iter().map(|c| c.content.as_str()).collect();
        let expected: Vec<_> = (0..16).rev().map(|i| format!("# Chapter {i}")).collect();
        assert_eq!(titles, expected);
        assert_eq!(chapters[0].path, dir.path().join("ch15.md"));
    }

    #[test]
    fn test_missing_chapter_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "a");
        let index = BookIndex::new("Book").with_file("a.md").with_file("missing.md");

        let err = load_chapters(&index, dir.path(), "md").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_chapters_decoded_without_bom() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), b"\xEF\xBB\xBF# Hello").unwrap();
        let index = BookIndex::new("Book").with_file("a");

        let chapters = load_chapters(&index, dir.path(), "md").unwrap();
        assert_eq!(chapters[0].content, "# Hello");
    }

    #[test]
    fn test_join_chapters() {
        let chapters = vec![
            Chapter {
                path: PathBuf::from("a.md"),
                content: "# A".into(),
            },
            Chapter {
                path: PathBuf::from("b.md"),
                content: "# B".into(),
            },
        ];
        assert_eq!(join_chapters(&chapters), "# A\n\n# B");
    }
}

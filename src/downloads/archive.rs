/**
 * Package Reader
 *
 * A translation package is a ZIP archive holding `books.json`
 * (`{"bookNames": [...]}`) and one `<book>-<chapter>.json` entry per
 * chapter containing a JSON array of verse texts. Directory prefixes
 * inside the archive are ignored.
 */
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use serde::Deserialize;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::storage::models::{is_valid_chapter, BOOK_COUNT};
use crate::storage::TranslationContent;

pub const BOOKS_ENTRY: &str = "books.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookNames {
    book_names: Vec<String>,
}

/// Parse a package on disk. Blocking; call from the blocking pool.
pub fn read_package(path: &Path) -> Result<TranslationContent> {
    let file = File::open(path)?;
    let content = read_archive(file)?;
    tracing::debug!(
        "[Archive] {:?}: {} books, {} chapters, {} verses",
        path,
        content.book_names.len(),
        content.chapters.len(),
        content.verse_count()
    );
    Ok(content)
}

pub fn read_archive<R: Read + Seek>(reader: R) -> Result<TranslationContent> {
    let mut archive = ZipArchive::new(reader)?;
    let mut book_names = None;
    let mut content = TranslationContent::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let raw_name = entry.name().to_string();
        let Some(file_name) = Path::new(&raw_name).file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if file_name == BOOKS_ENTRY {
            let mut json = String::new();
            entry.read_to_string(&mut json)?;
            let parsed: BookNames = serde_json::from_str(&json)?;
            book_names = Some(parsed.book_names);
            continue;
        }

        let Some((book_index, chapter_index)) = parse_chapter_name(file_name) else {
            tracing::debug!("[Archive] Ignoring entry {}", raw_name);
            continue;
        };
        if !is_valid_chapter(book_index, chapter_index) {
            return Err(Error::Package(format!("chapter out of range: {}", raw_name)));
        }

        let mut json = String::new();
        entry.read_to_string(&mut json)?;
        let verses: Vec<String> = serde_json::from_str(&json)
            .map_err(|e| Error::Package(format!("{}: {}", raw_name, e)))?;
        content.chapters.insert((book_index, chapter_index), verses);
    }

    let book_names = book_names.ok_or_else(|| Error::Package(format!("missing {}", BOOKS_ENTRY)))?;
    if book_names.len() != BOOK_COUNT {
        return Err(Error::Package(format!(
            "expected {} book names, found {}",
            BOOK_COUNT,
            book_names.len()
        )));
    }
    if content.verse_count() == 0 {
        return Err(Error::Package("package contains no verses".to_string()));
    }
    content.book_names = book_names;
    Ok(content)
}

/// `"3-12.json"` -> `(3, 12)`
fn parse_chapter_name(file_name: &str) -> Option<(i32, i32)> {
    let stem = file_name.strip_suffix(".json")?;
    let (book, chapter) = stem.split_once('-')?;
    if book.is_empty() || chapter.is_empty() {
        return None;
    }
    if !book.bytes().all(|b| b.is_ascii_digit()) || !chapter.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((book.parse().ok()?, chapter.parse().ok()?))
}

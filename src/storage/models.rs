use std::collections::BTreeMap;

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const BOOK_COUNT: usize = 66;
pub const OLD_TESTAMENT_COUNT: usize = 39;
pub const NEW_TESTAMENT_COUNT: usize = 27;
pub const TOTAL_CHAPTER_COUNT: usize = 1189;

/// Number of chapters in each book, in canonical order.
pub const CHAPTER_COUNT: [i32; BOOK_COUNT] = [
    50, 40, 27, 36, 34, 24, 21, 4, 31, 24, 22, 25, 29, 36, 10, 13, 10, 42, 150, 31, 12, 8, 66, 52,
    5, 48, 12, 14, 3, 9, 1, 4, 7, 3, 3, 3, 2, 14, 4, 28, 16, 24, 21, 28, 16, 16, 13, 6, 6, 4, 4, 5,
    3, 6, 4, 3, 1, 13, 5, 5, 3, 5, 1, 1, 1, 22,
];

/// Translation catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranslationInfo {
    pub short_name: String,
    pub name: String,
    pub language: String,
    pub size: i64,
    pub downloaded: bool,
}

impl TranslationInfo {
    pub fn new(short_name: &str, name: &str, language: &str, size: i64, downloaded: bool) -> Self {
        Self {
            short_name: short_name.to_string(),
            name: name.to_string(),
            language: language.to_string(),
            size,
            downloaded,
        }
    }

    pub fn with_downloaded(&self, downloaded: bool) -> Self {
        Self {
            downloaded,
            ..self.clone()
        }
    }
}

impl TryFrom<&Row<'_>> for TranslationInfo {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        Ok(TranslationInfo {
            short_name: row.get(0)?,
            name: row.get(1)?,
            language: row.get(2)?,
            size: row.get(3)?,
            downloaded: row.get::<_, i64>(4)? == 1,
        })
    }
}

/// Position of a verse: zero-based book, chapter and verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseIndex {
    pub book_index: i32,
    pub chapter_index: i32,
    pub verse_index: i32,
}

impl VerseIndex {
    pub const INVALID: VerseIndex = VerseIndex {
        book_index: -1,
        chapter_index: -1,
        verse_index: -1,
    };

    pub fn new(book_index: i32, chapter_index: i32, verse_index: i32) -> Self {
        Self {
            book_index,
            chapter_index,
            verse_index,
        }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_chapter(self.book_index, self.chapter_index) && self.verse_index >= 0
    }

    pub fn validate(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::InvalidVerseIndex {
                book: self.book_index,
                chapter: self.chapter_index,
                verse: self.verse_index,
            })
        }
    }
}

impl Default for VerseIndex {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

pub fn is_valid_chapter(book_index: i32, chapter_index: i32) -> bool {
    book_index >= 0
        && (book_index as usize) < BOOK_COUNT
        && chapter_index >= 0
        && chapter_index < CHAPTER_COUNT[book_index as usize]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub verse_index: VerseIndex,
    pub text: String,
}

impl TryFrom<&Row<'_>> for Verse {
    type Error = rusqlite::Error;

    /// Expects `bookIndex, chapterIndex, verseIndex, text`.
    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        Ok(Verse {
            verse_index: VerseIndex::new(row.get(0)?, row.get(1)?, row.get(2)?),
            text: row.get(3)?,
        })
    }
}

/// Text of another translation at the same position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelText {
    pub translation_short_name: String,
    /// Empty when that translation has no such verse
    pub text: String,
}

/// A verse of the primary translation along with its parallel texts,
/// in the order the parallel translations were requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseWithParallel {
    pub verse_index: VerseIndex,
    pub text: String,
    pub parallel: Vec<ParallelText>,
}

/// Unpacked content of a translation package, ready to be installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationContent {
    pub book_names: Vec<String>,
    /// (book index, chapter index) -> verse texts in order
    pub chapters: BTreeMap<(i32, i32), Vec<String>>,
}

impl TranslationContent {
    pub fn verse_count(&self) -> usize {
        self.chapters.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_table() {
        assert_eq!(CHAPTER_COUNT.iter().sum::<i32>() as usize, TOTAL_CHAPTER_COUNT);
        assert_eq!(OLD_TESTAMENT_COUNT + NEW_TESTAMENT_COUNT, BOOK_COUNT);
    }

    #[test]
    fn test_verse_index_validity() {
        assert!(VerseIndex::new(0, 0, 0).is_valid());
        assert!(VerseIndex::new(65, 21, 20).is_valid());
        assert!(!VerseIndex::new(65, 22, 0).is_valid());
        assert!(!VerseIndex::new(66, 0, 0).is_valid());
        assert!(!VerseIndex::new(0, 0, -1).is_valid());
        assert!(!VerseIndex::INVALID.is_valid());
        assert!(matches!(
            VerseIndex::new(18, 150, 0).validate(),
            Err(Error::InvalidVerseIndex { book: 18, chapter: 150, .. })
        ));
    }
}

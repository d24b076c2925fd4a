use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::storage::models::{
    ParallelText, TranslationContent, TranslationInfo, Verse, VerseIndex, VerseWithParallel,
};

const TABLE_METADATA: &str = "metadata";
const TABLE_TRANSLATION_INFO: &str = "translationInfo";
const TABLE_BOOK_NAMES: &str = "bookNames";
const INDEX_BOOK_NAMES: &str = "bookNamesIndex";

/// Schema objects a translation table must never shadow.
const RESERVED_NAMES: [&str; 4] = [TABLE_METADATA, TABLE_TRANSLATION_INFO, TABLE_BOOK_NAMES, INDEX_BOOK_NAMES];

/// Well-known metadata keys
pub mod keys {
    pub const CURRENT_TRANSLATION: &str = "currentTranslation";
    pub const CURRENT_BOOK_INDEX: &str = "currentBookIndex";
    pub const CURRENT_CHAPTER_INDEX: &str = "currentChapterIndex";
    pub const CURRENT_VERSE_INDEX: &str = "currentVerseIndex";
    pub const TRANSLATION_LIST_REFRESH_TIMESTAMP: &str = "translationListRefreshTimestamp";

    pub const KEEP_SCREEN_ON: &str = "keepScreenOn";
    pub const NIGHT_MODE_ON: &str = "nightModeOn";
    pub const FONT_SIZE_SCALE: &str = "fontSizeScale";
    pub const SIMPLE_READING_MODE_ON: &str = "simpleReadingModeOn";

    pub const TRANSLATION_SORT_ORDER: &str = "translationSortOrder";
}

/// Short names double as table names, so only plain identifiers that do
/// not collide with the store's own schema (or SQLite's) are accepted.
pub fn validate_short_name(short_name: &str) -> Result<&str> {
    let mut chars = short_name.chars();
    let identifier = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    let reserved = RESERVED_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(short_name))
        || short_name
            .get(..7)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sqlite_"));
    if identifier && !reserved {
        Ok(short_name)
    } else {
        Err(Error::InvalidTranslationName(short_name.to_string()))
    }
}

fn translation_table(short_name: &str) -> Result<String> {
    Ok(format!("\"{}\"", validate_short_name(short_name)?))
}

/// One SQLite connection. Cheap to open; the store opens one per operation.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database and make sure every table exists
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Self::open(db_path)?;
        db.init_tables()?;
        Ok(db)
    }

    /// Open without touching the schema
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Ok(Database { conn })
    }

    fn init_tables(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_METADATA} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS {TABLE_TRANSLATION_INFO} (
                shortName TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                language TEXT NOT NULL,
                size INTEGER NOT NULL,
                downloaded INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS {TABLE_BOOK_NAMES} (
                translationShortName TEXT NOT NULL,
                bookIndex INTEGER NOT NULL,
                bookName TEXT NOT NULL,
                PRIMARY KEY (translationShortName, bookIndex)
            );

            CREATE INDEX IF NOT EXISTS {INDEX_BOOK_NAMES} ON {TABLE_BOOK_NAMES}(translationShortName);"
        ))?;
        Ok(())
    }

    // --- Metadata ---

    pub fn read_metadata(&self, key: &str, default_value: &str) -> Result<String> {
        let value = self
            .conn
            .query_row(
                &format!("SELECT value FROM {TABLE_METADATA} WHERE key = ?1"),
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value.unwrap_or_else(|| default_value.to_string()))
    }

    /// Read several keys at once; missing keys get their default.
    pub fn read_metadata_many(&self, keys: &[(&str, &str)]) -> Result<HashMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT value FROM {TABLE_METADATA} WHERE key = ?1"))?;
        let mut values = HashMap::with_capacity(keys.len());
        for (key, default_value) in keys {
            let value = stmt
                .query_row([key], |row| row.get::<_, String>(0))
                .optional()?
                .unwrap_or_else(|| default_value.to_string());
            values.insert(key.to_string(), value);
        }
        Ok(values)
    }

    pub fn save_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            &format!("INSERT OR REPLACE INTO {TABLE_METADATA} (key, value) VALUES (?1, ?2)"),
            params![key, value],
        )?;
        Ok(())
    }

    /// All entries are written, or none.
    pub fn save_metadata_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        insert_metadata(&tx, entries)?;
        tx.commit()?;
        Ok(())
    }

    // --- Translation catalog ---

    pub fn read_translations(&self) -> Result<Vec<TranslationInfo>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT shortName, name, language, size, downloaded FROM {TABLE_TRANSLATION_INFO}
             ORDER BY shortName ASC"
        ))?;
        let translations = stmt
            .query_map([], |row| TranslationInfo::try_from(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(translations)
    }

    pub fn read_translation(&self, short_name: &str) -> Result<Option<TranslationInfo>> {
        let translation = self
            .conn
            .query_row(
                &format!(
                    "SELECT shortName, name, language, size, downloaded FROM {TABLE_TRANSLATION_INFO}
                     WHERE shortName = ?1"
                ),
                [short_name],
                |row| TranslationInfo::try_from(row),
            )
            .optional()?;
        Ok(translation)
    }

    pub fn has_downloaded_translation(&self) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {TABLE_TRANSLATION_INFO} WHERE downloaded = 1 LIMIT 1"),
                [],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Replace the whole catalog, together with `metadata`, in one transaction.
    pub fn replace_translations(
        &self,
        translations: &[TranslationInfo],
        metadata: &[(&str, String)],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&format!("DELETE FROM {TABLE_TRANSLATION_INFO}"), [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {TABLE_TRANSLATION_INFO} (shortName, name, language, size, downloaded)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            ))?;
            for t in translations {
                stmt.execute(params![t.short_name, t.name, t.language, t.size, t.downloaded as i64])?;
            }
        }
        insert_metadata(&tx, metadata)?;
        tx.commit()?;
        Ok(())
    }

    pub fn save_translation(&self, translation: &TranslationInfo) -> Result<()> {
        upsert_translation(&self.conn, translation)
    }

    /// Write verses, book names and the downloaded flag in one transaction.
    /// The flag only becomes visible if everything else was written.
    pub fn install_translation(
        &self,
        translation: &TranslationInfo,
        content: &TranslationContent,
    ) -> Result<()> {
        let table = translation_table(&translation.short_name)?;
        let tx = self.conn.unchecked_transaction()?;

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (
                bookIndex INTEGER NOT NULL,
                chapterIndex INTEGER NOT NULL,
                verseIndex INTEGER NOT NULL,
                text TEXT NOT NULL,
                PRIMARY KEY (bookIndex, chapterIndex, verseIndex)
             );"
        ))?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {table} (bookIndex, chapterIndex, verseIndex, text)
                 VALUES (?1, ?2, ?3, ?4)"
            ))?;
            for ((book_index, chapter_index), verses) in &content.chapters {
                for (verse_index, text) in verses.iter().enumerate() {
                    stmt.execute(params![book_index, chapter_index, verse_index as i64, text])?;
                }
            }
        }

        tx.execute(
            &format!("DELETE FROM {TABLE_BOOK_NAMES} WHERE translationShortName = ?1"),
            [&translation.short_name],
        )?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {TABLE_BOOK_NAMES} (translationShortName, bookIndex, bookName)
                 VALUES (?1, ?2, ?3)"
            ))?;
            for (book_index, book_name) in content.book_names.iter().enumerate() {
                stmt.execute(params![translation.short_name, book_index as i64, book_name])?;
            }
        }

        upsert_translation(&tx, &translation.with_downloaded(true))?;
        tx.commit()?;
        Ok(())
    }

    /// Drop the verse table and book names and clear the downloaded flag.
    pub fn remove_translation(&self, short_name: &str) -> Result<()> {
        let table = translation_table(short_name)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
        tx.execute(
            &format!("DELETE FROM {TABLE_BOOK_NAMES} WHERE translationShortName = ?1"),
            [short_name],
        )?;
        tx.execute(
            &format!("UPDATE {TABLE_TRANSLATION_INFO} SET downloaded = 0 WHERE shortName = ?1"),
            [short_name],
        )?;
        tx.commit()?;
        Ok(())
    }

    // --- Verses ---

    /// Replace a single chapter's verses atomically.
    pub fn save_chapter(
        &self,
        short_name: &str,
        book_index: i32,
        chapter_index: i32,
        verses: &[String],
    ) -> Result<()> {
        let table = translation_table(short_name)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!("DELETE FROM {table} WHERE bookIndex = ?1 AND chapterIndex = ?2"),
            params![book_index, chapter_index],
        )?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {table} (bookIndex, chapterIndex, verseIndex, text) VALUES (?1, ?2, ?3, ?4)"
            ))?;
            for (verse_index, text) in verses.iter().enumerate() {
                stmt.execute(params![book_index, chapter_index, verse_index as i64, text])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn read_book_names(&self, short_name: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT bookName FROM {TABLE_BOOK_NAMES} WHERE translationShortName = ?1 ORDER BY bookIndex ASC"
        ))?;
        let names = stmt
            .query_map([short_name], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn read_verses(&self, short_name: &str, book_index: i32, chapter_index: i32) -> Result<Vec<Verse>> {
        select_chapter(&self.conn, short_name, book_index, chapter_index)
    }

    /// Read a chapter of `short_name` together with the same chapter of each
    /// parallel translation, all from one snapshot. Parallel translations
    /// missing a verse contribute empty text.
    pub fn read_verses_with_parallel(
        &self,
        short_name: &str,
        parallel: &[String],
        book_index: i32,
        chapter_index: i32,
    ) -> Result<Vec<VerseWithParallel>> {
        let tx = self.conn.unchecked_transaction()?;
        let verses = select_chapter(&tx, short_name, book_index, chapter_index)?;
        let mut parallel_texts = Vec::with_capacity(parallel.len());
        for other in parallel.iter().filter(|other| other.as_str() != short_name) {
            let texts: HashMap<i32, String> = select_chapter(&tx, other, book_index, chapter_index)?
                .into_iter()
                .map(|verse| (verse.verse_index.verse_index, verse.text))
                .collect();
            parallel_texts.push((other.as_str(), texts));
        }
        tx.commit()?;

        Ok(verses
            .into_iter()
            .map(|verse| VerseWithParallel {
                parallel: parallel_texts
                    .iter()
                    .map(|(other, texts)| ParallelText {
                        translation_short_name: other.to_string(),
                        text: texts
                            .get(&verse.verse_index.verse_index)
                            .cloned()
                            .unwrap_or_default(),
                    })
                    .collect(),
                verse_index: verse.verse_index,
                text: verse.text,
            })
            .collect())
    }

    /// Single verse flavor of [`Database::read_verses_with_parallel`].
    /// `None` when the primary translation has no such verse.
    pub fn read_verse_with_parallel(
        &self,
        short_name: &str,
        parallel: &[String],
        verse_index: VerseIndex,
    ) -> Result<Option<VerseWithParallel>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(verse) = select_verse(&tx, short_name, verse_index)? else {
            return Ok(None);
        };
        let mut texts = Vec::with_capacity(parallel.len());
        for other in parallel.iter().filter(|other| other.as_str() != short_name) {
            texts.push(ParallelText {
                translation_short_name: other.clone(),
                text: select_verse(&tx, other, verse_index)?
                    .map(|verse| verse.text)
                    .unwrap_or_default(),
            });
        }
        tx.commit()?;

        Ok(Some(VerseWithParallel {
            verse_index: verse.verse_index,
            text: verse.text,
            parallel: texts,
        }))
    }

    /// Verses containing every whitespace-separated keyword of `query`,
    /// case-insensitively (ASCII), in canonical order.
    pub fn search(&self, short_name: &str, query: &str) -> Result<Vec<Verse>> {
        let table = translation_table(short_name)?;
        let patterns: Vec<String> = query
            .split_whitespace()
            .map(|keyword| format!("%{}%", escape_like(keyword)))
            .collect();
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let conditions = (1..=patterns.len())
            .map(|i| format!("text LIKE ?{i} ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT bookIndex, chapterIndex, verseIndex, text FROM {table}
             WHERE {conditions} ORDER BY bookIndex ASC, chapterIndex ASC, verseIndex ASC"
        ))?;
        let verses = stmt
            .query_map(rusqlite::params_from_iter(patterns.iter()), |row| Verse::try_from(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(verses)
    }
}

fn select_chapter(
    conn: &Connection,
    short_name: &str,
    book_index: i32,
    chapter_index: i32,
) -> Result<Vec<Verse>> {
    let table = translation_table(short_name)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT bookIndex, chapterIndex, verseIndex, text FROM {table}
         WHERE bookIndex = ?1 AND chapterIndex = ?2 ORDER BY verseIndex ASC"
    ))?;
    let verses = stmt
        .query_map(params![book_index, chapter_index], |row| Verse::try_from(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(verses)
}

fn select_verse(conn: &Connection, short_name: &str, verse_index: VerseIndex) -> Result<Option<Verse>> {
    let table = translation_table(short_name)?;
    let verse = conn
        .query_row(
            &format!(
                "SELECT bookIndex, chapterIndex, verseIndex, text FROM {table}
                 WHERE bookIndex = ?1 AND chapterIndex = ?2 AND verseIndex = ?3"
            ),
            params![verse_index.book_index, verse_index.chapter_index, verse_index.verse_index],
            |row| Verse::try_from(row),
        )
        .optional()?;
    Ok(verse)
}

fn insert_metadata(conn: &Connection, entries: &[(&str, String)]) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "INSERT OR REPLACE INTO {TABLE_METADATA} (key, value) VALUES (?1, ?2)"
    ))?;
    for (key, value) in entries {
        stmt.execute(params![key, value])?;
    }
    Ok(())
}

fn upsert_translation(conn: &Connection, t: &TranslationInfo) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO {TABLE_TRANSLATION_INFO} (shortName, name, language, size, downloaded)
             VALUES (?1, ?2, ?3, ?4, ?5)"
        ),
        params![t.short_name, t.name, t.language, t.size, t.downloaded as i64],
    )?;
    Ok(())
}

fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

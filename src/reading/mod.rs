/**
 * Reading Module
 *
 * Owns the current translation and the current reading position.
 * Built once from the store and handed to whoever needs it.
 */
use crate::error::{Error, Result};
use crate::observable::{Observable, Subscription};
use crate::storage::{keys, LocalStore, Verse, VerseIndex, VerseWithParallel};

#[derive(Clone, Debug)]
pub struct ReadingState {
    store: LocalStore,
    current_translation: Observable<String>,
    current_verse_index: Observable<VerseIndex>,
}

impl ReadingState {
    /// Read the persisted translation and position.
    pub async fn load(store: LocalStore) -> Result<Self> {
        let values = store
            .read_metadata_many(&[
                (keys::CURRENT_TRANSLATION, ""),
                (keys::CURRENT_BOOK_INDEX, "0"),
                (keys::CURRENT_CHAPTER_INDEX, "0"),
                (keys::CURRENT_VERSE_INDEX, "0"),
            ])
            .await?;

        let index_of = |key: &str| values.get(key).and_then(|v| v.parse::<i32>().ok()).unwrap_or(-1);
        let mut verse_index = VerseIndex::new(
            index_of(keys::CURRENT_BOOK_INDEX),
            index_of(keys::CURRENT_CHAPTER_INDEX),
            index_of(keys::CURRENT_VERSE_INDEX),
        );
        if !verse_index.is_valid() {
            tracing::warn!("[Reading] Stored position {:?} is invalid, resetting", verse_index);
            verse_index = VerseIndex::default();
        }

        let current_translation = values
            .get(keys::CURRENT_TRANSLATION)
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            store,
            current_translation: Observable::new(current_translation),
            current_verse_index: Observable::new(verse_index),
        })
    }

    pub fn current_translation(&self) -> String {
        self.current_translation.get()
    }

    /// Callers must make sure `short_name` is downloaded (or empty).
    pub(crate) async fn save_current_translation(&self, short_name: &str) -> Result<()> {
        if self.current_translation.get() == short_name {
            return Ok(());
        }
        self.store
            .save_metadata(keys::CURRENT_TRANSLATION, short_name)
            .await?;
        self.current_translation.set(short_name.to_string());
        Ok(())
    }

    pub fn current_verse_index(&self) -> VerseIndex {
        self.current_verse_index.get()
    }

    pub fn observe_current_verse_index(&self) -> Subscription<VerseIndex> {
        self.current_verse_index.subscribe()
    }

    /// Persist the three components together; invalid positions are rejected.
    pub async fn save_current_verse_index(&self, verse_index: VerseIndex) -> Result<()> {
        let verse_index = verse_index.validate()?;
        if self.current_verse_index.get() == verse_index {
            return Ok(());
        }
        self.store
            .save_metadata_many(vec![
                (keys::CURRENT_BOOK_INDEX, verse_index.book_index.to_string()),
                (keys::CURRENT_CHAPTER_INDEX, verse_index.chapter_index.to_string()),
                (keys::CURRENT_VERSE_INDEX, verse_index.verse_index.to_string()),
            ])
            .await?;
        self.current_verse_index.set(verse_index);
        Ok(())
    }

    fn selected_translation(&self) -> Result<String> {
        let short_name = self.current_translation();
        if short_name.is_empty() {
            Err(Error::NoTranslationSelected)
        } else {
            Ok(short_name)
        }
    }

    pub async fn read_book_names(&self) -> Result<Vec<String>> {
        self.store.read_book_names(&self.selected_translation()?).await
    }

    /// Verses of the chapter at the current position, in the current translation.
    pub async fn read_current_chapter(&self) -> Result<Vec<Verse>> {
        let verse_index = self.current_verse_index();
        self.read_chapter(verse_index.book_index, verse_index.chapter_index)
            .await
    }

    pub async fn read_chapter(&self, book_index: i32, chapter_index: i32) -> Result<Vec<Verse>> {
        VerseIndex::new(book_index, chapter_index, 0).validate()?;
        self.store
            .read_verses(&self.selected_translation()?, book_index, chapter_index)
            .await
    }

    /// Like [`ReadingState::read_chapter`], with the same chapter of each
    /// `parallel` translation alongside every verse.
    pub async fn read_chapter_with_parallel(
        &self,
        book_index: i32,
        chapter_index: i32,
        parallel: &[String],
    ) -> Result<Vec<VerseWithParallel>> {
        VerseIndex::new(book_index, chapter_index, 0).validate()?;
        self.store
            .read_verses_with_parallel(
                &self.selected_translation()?,
                parallel.to_vec(),
                book_index,
                chapter_index,
            )
            .await
    }

    /// The verse at the current position, with its parallel texts.
    pub async fn read_current_verse(&self, parallel: &[String]) -> Result<Option<VerseWithParallel>> {
        self.store
            .read_verse_with_parallel(
                &self.selected_translation()?,
                parallel.to_vec(),
                self.current_verse_index(),
            )
            .await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Verse>> {
        self.store.search(&self.selected_translation()?, query).await
    }
}

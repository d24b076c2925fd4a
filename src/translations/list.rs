use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::storage::TranslationInfo;

/// How both partitions of the translation list are ordered. Persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    LanguageThenName,
    Name,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::LanguageThenName => "languageThenName",
            SortOrder::Name => "name",
        }
    }

    pub fn compare(&self, a: &TranslationInfo, b: &TranslationInfo) -> Ordering {
        match self {
            SortOrder::LanguageThenName => a
                .language
                .cmp(&b.language)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.short_name.cmp(&b.short_name)),
            SortOrder::Name => a
                .name
                .cmp(&b.name)
                .then_with(|| a.short_name.cmp(&b.short_name)),
        }
    }

    pub fn sort(&self, translations: &mut [TranslationInfo]) {
        translations.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "languageThenName" => Ok(SortOrder::LanguageThenName),
            "name" => Ok(SortOrder::Name),
            other => Err(Error::Config(format!("unknown sort order {:?}", other))),
        }
    }
}

/// Derived view of the catalog. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TranslationList {
    /// Empty when nothing is selected
    pub current_translation: String,
    pub available_translations: Vec<TranslationInfo>,
    pub downloaded_translations: Vec<TranslationInfo>,
}

impl TranslationList {
    /// Partition `catalog` by the downloaded flag. A current translation
    /// that is not among the downloaded ones is reported as empty.
    pub fn from_catalog(current_translation: &str, catalog: &[TranslationInfo], order: SortOrder) -> Self {
        let (mut downloaded, mut available): (Vec<_>, Vec<_>) =
            catalog.iter().cloned().partition(|t| t.downloaded);
        order.sort(&mut downloaded);
        order.sort(&mut available);

        let current_translation = if downloaded.iter().any(|t| t.short_name == current_translation) {
            current_translation.to_string()
        } else {
            String::new()
        };

        Self {
            current_translation,
            available_translations: available,
            downloaded_translations: downloaded,
        }
    }

    pub fn is_downloaded(&self, short_name: &str) -> bool {
        self.downloaded_translations.iter().any(|t| t.short_name == short_name)
    }
}

mod list;
mod repository;

pub use list::{SortOrder, TranslationList};
pub use repository::{merge_catalog, TranslationRepository};

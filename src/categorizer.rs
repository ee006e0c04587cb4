use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::load_categories;
use crate::error::Result;
use crate::models::Category;
use crate::store::Categorizer;

pub const FALLBACK_CATEGORY: &str = "Other";
pub const FALLBACK_ICON: &str = "\u{1F4E6}";

/// Keyword-substring categorizer. Categories are tried in stored order and the
/// first keyword contained in the lowercased description wins.
pub struct KeywordCategorizer<'a> {
    conn: Option<&'a Connection>,
    categories: Option<Vec<Category>>,
}

impl<'a> KeywordCategorizer<'a> {
    /// Categories are read from the database on first use and cached afterwards.
    pub fn from_db(conn: &'a Connection) -> Self {
        Self { conn: Some(conn), categories: None }
    }

    #[cfg(test)]
    pub fn from_categories(categories: Vec<Category>) -> Self {
        Self { conn: None, categories: Some(categories) }
    }

    fn load(&mut self) -> Result<&[Category]> {
        if self.categories.is_none() {
            let loaded = match self.conn {
                Some(conn) => load_categories(conn)?,
                None => Vec::new(),
            };
            info!("Loaded {} categories for auto-categorization", loaded.len());
            self.categories = Some(loaded);
        }
        Ok(self.categories.as_deref().unwrap_or_default())
    }

    /// Drop the cache and read categories again. No-op for in-memory lists.
    #[cfg(test)]
    pub fn reload(&mut self) -> Result<()> {
        if self.conn.is_some() {
            self.categories = None;
        }
        self.load().map(|_| ())
    }

    pub fn icon_for(&mut self, category: &str) -> Result<String> {
        let icon = self
            .load()?
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(category))
            .map(|c| c.icon.clone());
        Ok(icon.unwrap_or_else(|| FALLBACK_ICON.to_string()))
    }
}

impl Categorizer for KeywordCategorizer<'_> {
    fn categorize(&mut self, description: &str) -> Result<String> {
        let desc_lower = description.to_lowercase();
        for cat in self.load()? {
            if let Some(keyword) = cat.keywords.iter().find(|k| desc_lower.contains(k.as_str())) {
                debug!(%description, category = %cat.name, %keyword, "matched category keyword");
                return Ok(cat.name.clone());
            }
        }
        debug!(%description, "no category match, using {FALLBACK_CATEGORY}");
        Ok(FALLBACK_CATEGORY.to_string())
    }
}

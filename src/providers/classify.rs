// src/providers/classify.rs

//! Keyword classification of events.

use crate::models::{ClassificationConfig, EventCategory, EventItem};
use crate::utils::text::normalize_words;

/// Compiled keyword rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    youth: Vec<String>,
    industries: Vec<(String, String)>,
    categories: Vec<(String, EventCategory)>,
}

impl Classifier {
    pub fn new(config: &ClassificationConfig) -> Self {
        Self {
            youth: config.youth_keywords.iter().map(|k| normalize_words(k)).collect(),
            industries: config
                .industries
                .iter()
                .map(|i| (normalize_words(&i.keyword), i.tag.clone()))
                .collect(),
            categories: config
                .categories
                .iter()
                .map(|c| (normalize_words(&c.keyword), c.category))
                .collect(),
        }
    }

    /// Set `youth_focused`, `industry_tags` and, when the adapter left it
    /// as `Other`, `category`.
    pub fn apply(&self, item: &mut EventItem) {
        let text = format!(" {} ", normalize_words(&format!("{} {}", item.title, item.description)));

        item.youth_focused = self.youth.iter().any(|k| contains_word_prefix(&text, k));

        let mut tags: Vec<String> = self
            .industries
            .iter()
            .filter(|(keyword, _)| contains_word_prefix(&text, keyword))
            .map(|(_, tag)| tag.clone())
            .collect();
        tags.extend(item.industry_tags.drain(..));
        tags.sort();
        tags.dedup();
        item.industry_tags = tags;

        if item.category == EventCategory::Other {
            if let Some((_, category)) = self
                .categories
                .iter()
                .find(|(keyword, _)| contains_word_prefix(&text, keyword))
            {
                item.category = *category;
            }
        }
    }
}

/// `text` is space-padded normalized text; `keyword` must start a word.
fn contains_word_prefix(text: &str, keyword: &str) -> bool {
    !keyword.is_empty() && text.contains(&format!(" {keyword}"))
}

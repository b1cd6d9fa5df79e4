//! The card catalog: the index space every encoded card points into.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::PromptCard;
use crate::card::normalize;

/// The serialized form of a catalog (bundled default, remote blob, cache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogData {
    /// Opaque version token. Remote refreshes compare against it.
    pub version: String,
    pub prompt_cards: Vec<PromptCard>,
    pub answer_cards: Vec<String>,
}

/// An immutable, indexed card catalog.
///
/// Card text is trimmed at construction so that index lookups (which match
/// on trimmed text) and the stored entries agree. When two entries share
/// the same text the first index wins.
#[derive(Debug, Clone)]
pub struct CardCatalog {
    version: String,
    prompts: Vec<PromptCard>,
    answers: Vec<String>,
    prompt_index: HashMap<String, usize>,
    answer_index: HashMap<String, usize>,
}

impl CardCatalog {
    /// Builds a catalog from its serialized form.
    pub fn new(data: CatalogData) -> Self {
        let prompts: Vec<PromptCard> = data
            .prompt_cards
            .into_iter()
            .map(|mut card| {
                card.text = normalize(&card.text).to_string();
                card.best_answers = card
                    .best_answers
                    .iter()
                    .map(|a| normalize(a).to_string())
                    .collect();
                card
            })
            .collect();
        let answers: Vec<String> = data
            .answer_cards
            .iter()
            .map(|a| normalize(a).to_string())
            .collect();

        let mut prompt_index = HashMap::with_capacity(prompts.len());
        for (i, card) in prompts.iter().enumerate() {
            prompt_index.entry(card.text.clone()).or_insert(i);
        }
        let mut answer_index = HashMap::with_capacity(answers.len());
        for (i, text) in answers.iter().enumerate() {
            answer_index.entry(text.clone()).or_insert(i);
        }

        Self {
            version: data.version,
            prompts,
            answers,
            prompt_index,
            answer_index,
        }
    }

    /// Returns the catalog's version token.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All prompt cards, in index order.
    pub fn prompt_cards(&self) -> &[PromptCard] {
        &self.prompts
    }

    /// All answer cards, in index order.
    pub fn answer_cards(&self) -> &[String] {
        &self.answers
    }

    /// Looks up a prompt by index. Negative or out-of-range indices miss.
    pub fn prompt(&self, index: i64) -> Option<&PromptCard> {
        usize::try_from(index).ok().and_then(|i| self.prompts.get(i))
    }

    /// Looks up an answer by index. Negative or out-of-range indices miss.
    pub fn answer(&self, index: i64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.answers.get(i))
            .map(String::as_str)
    }

    /// Finds a prompt's index by its (trimmed) text.
    pub fn prompt_index(&self, text: &str) -> Option<i64> {
        self.prompt_index.get(normalize(text)).map(|&i| i as i64)
    }

    /// Finds an answer's index by its (trimmed) text.
    pub fn answer_index(&self, text: &str) -> Option<i64> {
        self.answer_index.get(normalize(text)).map(|&i| i as i64)
    }

    /// Returns the serialized form, for caching.
    pub fn to_data(&self) -> CatalogData {
        CatalogData {
            version: self.version.clone(),
            prompt_cards: self.prompts.clone(),
            answer_cards: self.answers.clone(),
        }
    }
}

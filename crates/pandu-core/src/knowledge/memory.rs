//! In-memory knowledge source backed by plain maps. Used by tests and the
//! CLI's JSON data files.

use super::source::{KnowledgeRecord, KnowledgeSource, RecordCategory, SourceError};
use async_trait::async_trait;
use std::collections::HashMap;

/// Substring-matching source over records held in memory.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeSource {
    records: HashMap<RecordCategory, Vec<KnowledgeRecord>>,
}

impl InMemoryKnowledgeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: RecordCategory, record: KnowledgeRecord) {
        self.records.entry(category).or_default().push(record);
    }

    pub fn extend(
        &mut self,
        category: RecordCategory,
        records: impl IntoIterator<Item = KnowledgeRecord>,
    ) {
        self.records.entry(category).or_default().extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A record matches when any query token of three or more characters appears
/// in its name or summary. Short tokens ("di", "ke") would match everything.
fn matches(record: &KnowledgeRecord, query: &str) -> bool {
    let haystack = format!("{} {}", record.name, record.summary).to_lowercase();
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 3)
        .any(|token| haystack.contains(token))
}

#[async_trait]
impl KnowledgeSource for InMemoryKnowledgeSource {
    async fn search(
        &self,
        category: RecordCategory,
        query: &str,
    ) -> Result<Vec<KnowledgeRecord>, SourceError> {
        Ok(self
            .records
            .get(&category)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| matches(record, query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn snapshot(
        &self,
        category: RecordCategory,
        limit: usize,
    ) -> Result<Vec<KnowledgeRecord>, SourceError> {
        Ok(self
            .records
            .get(&category)
            .map(|records| records.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

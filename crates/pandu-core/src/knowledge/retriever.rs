//! Context retrieval: fan out to every record category, degrade gracefully,
//! and render the result as the bracketed context block the prompt composer
//! and response validator both understand.

use super::cache::{SingleSlotCache, cache_key};
use super::source::{KnowledgeRecord, KnowledgeSource, RecordCategory};
use futures::future;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Banner for a context filtered by the user's question.
pub const MODE_TARGETED: &str = "[[MODE: TERTARGET]]";
/// Banner for a context holding a full data snapshot (no search hits).
pub const MODE_FULL_SNAPSHOT: &str = "[[MODE: SELURUH-DATA]]";
/// Context text when no data could be retrieved at all.
pub const NO_CONTEXT_MARKER: &str = "[[KONTEKS TIDAK TERSEDIA]]";

/// How the context was assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalMode {
    /// Search hits for the user's question.
    Targeted,
    /// No search hits; the context is a capped snapshot of everything.
    FullSnapshot,
    /// Nothing retrievable. The model is told so explicitly.
    #[default]
    Unavailable,
}

impl RetrievalMode {
    pub fn banner(&self) -> &'static str {
        match self {
            RetrievalMode::Targeted => MODE_TARGETED,
            RetrievalMode::FullSnapshot => MODE_FULL_SNAPSHOT,
            RetrievalMode::Unavailable => NO_CONTEXT_MARKER,
        }
    }
}

/// A rendered context block plus how it came to be.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub text: String,
    pub mode: RetrievalMode,
    pub from_cache: bool,
    /// At least one category failed and was served empty.
    pub degraded: bool,
}

type Section = (RecordCategory, Vec<KnowledgeRecord>);

/// Retrieves and renders knowledge contexts, with a single-slot cache in
/// front of the source.
pub struct KnowledgeRetriever {
    source: Arc<dyn KnowledgeSource>,
    cache: SingleSlotCache<RetrievedContext>,
    snapshot_limit: usize,
}

impl KnowledgeRetriever {
    pub fn new(
        source: Arc<dyn KnowledgeSource>,
        cache_ttl: Duration,
        snapshot_limit: usize,
    ) -> Self {
        Self {
            source,
            cache: SingleSlotCache::new(cache_ttl),
            snapshot_limit,
        }
    }

    /// Build the context for a query. Never fails: categories that error are
    /// served empty, and a completely dark source yields the no-context
    /// marker so the model can refuse honestly.
    pub async fn retrieve(&self, query: &str) -> RetrievedContext {
        let key = cache_key(query);
        if let Some(mut hit) = self.cache.get(&key) {
            debug!("serving context from cache");
            hit.from_cache = true;
            return hit;
        }

        let (sections, mut degraded) = self.search_all(query).await;
        let total: usize = sections.iter().map(|(_, records)| records.len()).sum();

        let (mode, sections) = if total > 0 {
            (RetrievalMode::Targeted, sections)
        } else {
            debug!("no targeted matches, falling back to a full snapshot");
            let (snapshot, snapshot_degraded) = self.snapshot_all().await;
            degraded |= snapshot_degraded;
            let snapshot_total: usize =
                snapshot.iter().map(|(_, records)| records.len()).sum();
            if snapshot_total == 0 {
                // Not cached: the next request should get a fresh chance.
                return RetrievedContext {
                    text: NO_CONTEXT_MARKER.to_string(),
                    mode: RetrievalMode::Unavailable,
                    from_cache: false,
                    degraded,
                };
            }
            (RetrievalMode::FullSnapshot, snapshot)
        };

        let group_names = self.group_names(&sections).await;
        let context = RetrievedContext {
            text: render_context(mode, &sections, &group_names),
            mode,
            from_cache: false,
            degraded,
        };
        self.cache.put(key, context.clone());
        context
    }

    pub fn cache_is_warm(&self) -> bool {
        self.cache.is_warm()
    }

    async fn search_all(&self, query: &str) -> (Vec<Section>, bool) {
        let lookups = RecordCategory::ALL.map(|category| {
            let source = Arc::clone(&self.source);
            let query = query.to_string();
            async move {
                match source.search(category, &query).await {
                    Ok(records) => (category, records, false),
                    Err(error) => {
                        warn!(%category, %error, "search failed, serving category empty");
                        (category, Vec::new(), true)
                    }
                }
            }
        });
        collect_sections(future::join_all(lookups).await)
    }

    async fn snapshot_all(&self) -> (Vec<Section>, bool) {
        let limit = self.snapshot_limit;
        let lookups = RecordCategory::ALL.map(|category| {
            let source = Arc::clone(&self.source);
            async move {
                match source.snapshot(category, limit).await {
                    Ok(records) => (category, records, false),
                    Err(error) => {
                        warn!(%category, %error, "snapshot failed, serving category empty");
                        (category, Vec::new(), true)
                    }
                }
            }
        });
        collect_sections(future::join_all(lookups).await)
    }

    /// Map Sekbid numbers to group names, first from the retrieved group
    /// records, then from a snapshot for any person reference still
    /// unresolved.
    async fn group_names(&self, sections: &[Section]) -> HashMap<u32, String> {
        let mut names: HashMap<u32, String> = HashMap::new();
        for (category, records) in sections {
            if *category != RecordCategory::Groups {
                continue;
            }
            for record in records {
                if let Some(num) = record.group_ref {
                    names.entry(num).or_insert_with(|| record.name.clone());
                }
            }
        }

        let unresolved = sections
            .iter()
            .filter(|(category, _)| *category == RecordCategory::People)
            .flat_map(|(_, records)| records.iter().filter_map(|r| r.group_ref))
            .any(|num| !names.contains_key(&num));
        if unresolved {
            match self
                .source
                .snapshot(RecordCategory::Groups, self.snapshot_limit)
                .await
            {
                Ok(groups) => {
                    for group in groups {
                        if let Some(num) = group.group_ref {
                            names.entry(num).or_insert(group.name);
                        }
                    }
                }
                Err(error) => {
                    debug!(%error, "group names left unresolved");
                }
            }
        }
        names
    }
}

fn collect_sections(
    results: Vec<(RecordCategory, Vec<KnowledgeRecord>, bool)>,
) -> (Vec<Section>, bool) {
    let mut degraded = false;
    let sections = results
        .into_iter()
        .map(|(category, records, failed)| {
            degraded |= failed;
            (category, records)
        })
        .collect();
    (sections, degraded)
}

fn render_context(
    mode: RetrievalMode,
    sections: &[Section],
    group_names: &HashMap<u32, String>,
) -> String {
    let mut out = String::from(mode.banner());
    for (category, records) in sections {
        if records.is_empty() {
            continue;
        }
        out.push_str("\n\n=== ");
        out.push_str(category.heading());
        out.push_str(" ===");
        for record in records {
            out.push('\n');
            out.push_str(&render_record(*category, record, group_names));
        }
    }
    out
}

fn render_record(
    category: RecordCategory,
    record: &KnowledgeRecord,
    group_names: &HashMap<u32, String>,
) -> String {
    let mut line = match (category, record.group_ref) {
        (RecordCategory::Groups, Some(num)) => format!("- Sekbid {num}: {}", record.name),
        (RecordCategory::People, Some(num)) => match group_names.get(&num) {
            Some(group) => format!("- {} | Sekbid {num} ({group})", record.name),
            None => format!("- {} | Sekbid {num}", record.name),
        },
        _ => format!("- {}", record.name),
    };
    if !record.summary.is_empty() {
        line.push_str(" | ");
        line.push_str(&record.summary);
    }
    for (key, value) in &record.extra {
        line.push_str(" | ");
        line.push_str(key);
        line.push_str(": ");
        line.push_str(value);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::memory::InMemoryKnowledgeSource;
    use crate::knowledge::source::SourceError;
    use async_trait::async_trait;

    fn sample_source() -> InMemoryKnowledgeSource {
        let mut source = InMemoryKnowledgeSource::new();
        source.insert(
            RecordCategory::People,
            KnowledgeRecord::new("p1", "Dewi Lestari")
                .with_summary("Dokumentasi acara")
                .with_group_ref(2),
        );
        source.insert(
            RecordCategory::Groups,
            KnowledgeRecord::new("g2", "Humas")
                .with_summary("Hubungan masyarakat")
                .with_group_ref(2),
        );
        source.insert(
            RecordCategory::Events,
            KnowledgeRecord::new("e1", "Pentas Seni").with_summary("Acara tahunan"),
        );
        source
    }

    fn retriever(source: impl KnowledgeSource + 'static) -> KnowledgeRetriever {
        KnowledgeRetriever::new(Arc::new(source), Duration::from_secs(60), 25)
    }

    #[tokio::test]
    async fn targeted_context_renders_sections_and_resolves_groups() {
        let retriever = retriever(sample_source());
        let context = retriever.retrieve("siapa dewi humas?").await;

        assert_eq!(context.mode, RetrievalMode::Targeted);
        assert!(!context.from_cache);
        assert!(!context.degraded);
        assert!(context.text.starts_with(MODE_TARGETED));
        assert!(context.text.contains("=== ANGGOTA ==="));
        assert!(context
            .text
            .contains("- Dewi Lestari | Sekbid 2 (Humas) | Dokumentasi acara"));
        assert!(context.text.contains("=== SEKBID ==="));
        assert!(context.text.contains("- Sekbid 2: Humas | Hubungan masyarakat"));
        // Events did not match the query, so the section is absent.
        assert!(!context.text.contains("=== ACARA ==="));
    }

    #[tokio::test]
    async fn group_names_resolve_from_snapshot_when_search_misses_groups() {
        // "dewi" matches the person but not the group record.
        let retriever = retriever(sample_source());
        let context = retriever.retrieve("dewi").await;

        assert_eq!(context.mode, RetrievalMode::Targeted);
        assert!(context.text.contains("Sekbid 2 (Humas)"));
    }

    #[tokio::test]
    async fn no_hits_falls_back_to_full_snapshot() {
        let retriever = retriever(sample_source());
        let context = retriever.retrieve("zzz tidak cocok").await;

        assert_eq!(context.mode, RetrievalMode::FullSnapshot);
        assert!(context.text.starts_with(MODE_FULL_SNAPSHOT));
        assert!(context.text.contains("- Pentas Seni | Acara tahunan"));
    }

    #[tokio::test]
    async fn empty_source_yields_the_no_context_marker_and_is_not_cached() {
        let retriever = retriever(InMemoryKnowledgeSource::new());
        let context = retriever.retrieve("apa saja?").await;

        assert_eq!(context.mode, RetrievalMode::Unavailable);
        assert_eq!(context.text, NO_CONTEXT_MARKER);
        assert!(!retriever.cache_is_warm());

        let again = retriever.retrieve("apa saja?").await;
        assert!(!again.from_cache);
    }

    #[tokio::test]
    async fn cache_hit_on_equivalent_query() {
        let retriever = retriever(sample_source());
        let first = retriever.retrieve("Siapa Dewi?").await;
        assert!(!first.from_cache);

        let second = retriever.retrieve("  siapa   dewi? ").await;
        assert!(second.from_cache);
        assert_eq!(second.text, first.text);

        let different = retriever.retrieve("pentas seni").await;
        assert!(!different.from_cache);
    }

    struct FlakySource {
        inner: InMemoryKnowledgeSource,
        failing: RecordCategory,
    }

    #[async_trait]
    impl KnowledgeSource for FlakySource {
        async fn search(
            &self,
            category: RecordCategory,
            query: &str,
        ) -> Result<Vec<KnowledgeRecord>, SourceError> {
            if category == self.failing {
                return Err(SourceError::new(category, "database offline"));
            }
            self.inner.search(category, query).await
        }

        async fn snapshot(
            &self,
            category: RecordCategory,
            limit: usize,
        ) -> Result<Vec<KnowledgeRecord>, SourceError> {
            if category == self.failing {
                return Err(SourceError::new(category, "database offline"));
            }
            self.inner.snapshot(category, limit).await
        }
    }

    #[tokio::test]
    async fn one_failing_category_degrades_instead_of_failing() {
        let retriever = retriever(FlakySource {
            inner: sample_source(),
            failing: RecordCategory::Events,
        });
        let context = retriever.retrieve("siapa dewi?").await;

        assert_eq!(context.mode, RetrievalMode::Targeted);
        assert!(context.degraded);
        assert!(context.text.contains("Dewi Lestari"));
        assert!(!context.text.contains("=== ACARA ==="));
    }

    struct DarkSource;

    #[async_trait]
    impl KnowledgeSource for DarkSource {
        async fn search(
            &self,
            category: RecordCategory,
            _query: &str,
        ) -> Result<Vec<KnowledgeRecord>, SourceError> {
            Err(SourceError::new(category, "database offline"))
        }

        async fn snapshot(
            &self,
            category: RecordCategory,
            _limit: usize,
        ) -> Result<Vec<KnowledgeRecord>, SourceError> {
            Err(SourceError::new(category, "database offline"))
        }
    }

    #[tokio::test]
    async fn total_failure_is_degraded_and_unavailable() {
        let retriever = retriever(DarkSource);
        let context = retriever.retrieve("siapa dewi?").await;

        assert_eq!(context.mode, RetrievalMode::Unavailable);
        assert!(context.degraded);
        assert_eq!(context.text, NO_CONTEXT_MARKER);
    }
}

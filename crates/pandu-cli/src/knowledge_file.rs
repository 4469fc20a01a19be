//! JSON knowledge files.
//!
//! The file is a map from category name to records:
//!
//! ```json
//! {
//!   "people": [
//!     { "id": "p1", "name": "Dewi Lestari", "summary": "Dokumentasi", "group_ref": 2 }
//!   ],
//!   "groups": [
//!     { "id": "g2", "name": "Humas", "group_ref": 2 }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use pandu_core::knowledge::{InMemoryKnowledgeSource, KnowledgeRecord, RecordCategory};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Load a knowledge file into an in-memory source.
pub fn load(path: &Path) -> Result<InMemoryKnowledgeSource> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read knowledge file {}", path.display()))?;
    let categories: HashMap<RecordCategory, Vec<KnowledgeRecord>> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid knowledge file {}", path.display()))?;

    let mut source = InMemoryKnowledgeSource::new();
    for (category, records) in categories {
        source.extend(category, records);
    }
    debug!(
        path = %path.display(),
        records = source.len(),
        "knowledge file loaded"
    );
    Ok(source)
}

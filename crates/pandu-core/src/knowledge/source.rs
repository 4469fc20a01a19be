//! Knowledge source trait and record types.
//!
//! A [`KnowledgeSource`] is the seam between the orchestrator and whatever
//! actually stores OSIS data. The site backs it with its database; tests and
//! the CLI back it with [`InMemoryKnowledgeSource`](super::InMemoryKnowledgeSource).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The record categories the assistant can ground answers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordCategory {
    People,
    Groups,
    Events,
    Announcements,
    Pages,
}

impl RecordCategory {
    pub const ALL: [RecordCategory; 5] = [
        RecordCategory::People,
        RecordCategory::Groups,
        RecordCategory::Events,
        RecordCategory::Announcements,
        RecordCategory::Pages,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RecordCategory::People => "people",
            RecordCategory::Groups => "groups",
            RecordCategory::Events => "events",
            RecordCategory::Announcements => "announcements",
            RecordCategory::Pages => "pages",
        }
    }

    /// Section heading used in the rendered context text.
    pub fn heading(&self) -> &'static str {
        match self {
            RecordCategory::People => "ANGGOTA",
            RecordCategory::Groups => "SEKBID",
            RecordCategory::Events => "ACARA",
            RecordCategory::Announcements => "PENGUMUMAN",
            RecordCategory::Pages => "HALAMAN",
        }
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for RecordCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "people" | "members" | "anggota" => Ok(RecordCategory::People),
            "groups" | "sekbid" => Ok(RecordCategory::Groups),
            "events" | "acara" => Ok(RecordCategory::Events),
            "announcements" | "pengumuman" => Ok(RecordCategory::Announcements),
            "pages" | "halaman" => Ok(RecordCategory::Pages),
            other => Err(format!("unknown record category '{other}'")),
        }
    }
}

/// One knowledge record, category-agnostic.
///
/// `group_ref` carries a person's Sekbid number; for group records the
/// number lives in `group_ref` too, with `name` holding the group's title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_ref: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

impl KnowledgeRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            summary: String::new(),
            group_ref: None,
            extra: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_group_ref(mut self, group_ref: u32) -> Self {
        self.group_ref = Some(group_ref);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }
}

/// Failure reported by a knowledge source.
///
/// Sources are queried per category; one failing category degrades the
/// context instead of failing the whole request.
#[derive(Debug, Clone, Error)]
#[error("knowledge source failed for {category}: {message}")]
pub struct SourceError {
    pub category: RecordCategory,
    pub message: String,
}

impl SourceError {
    pub fn new(category: RecordCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Where OSIS records come from.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Records in `category` relevant to the query text.
    async fn search(
        &self,
        category: RecordCategory,
        query: &str,
    ) -> Result<Vec<KnowledgeRecord>, SourceError>;

    /// Up to `limit` records of the category, unfiltered.
    async fn snapshot(
        &self,
        category: RecordCategory,
        limit: usize,
    ) -> Result<Vec<KnowledgeRecord>, SourceError>;
}

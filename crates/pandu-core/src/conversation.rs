//! Conversation types exchanged with the LLM providers.

use crate::error::{PanduError, PanduResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a single conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::System => write!(f, "system"),
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// An inline image carried by a user turn, already base64-encoded.
///
/// The first attachment on a turn is the query image; any further
/// attachments are reference material the model may compare against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data_base64: String,
    /// Human label shown to the model next to reference images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ImageAttachment {
    pub fn new(mime_type: impl Into<String>, data_base64: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data_base64: data_base64.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Data-URL form used by the OpenAI-dialect providers.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_base64)
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn user_with_images(content: impl Into<String>, images: Vec<ImageAttachment>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            images,
        }
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

/// An ordered list of turns; answerable conversations end with a user turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    pub turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// The most recent user turn, if any.
    pub fn last_user_turn(&self) -> Option<&ChatTurn> {
        self.turns.iter().rev().find(|t| t.role == TurnRole::User)
    }

    /// Check the shape invariants required before a conversation is answered:
    /// non-empty, ending in a user turn, images only on user turns.
    pub fn ensure_answerable(&self) -> PanduResult<()> {
        let Some(last) = self.turns.last() else {
            return Err(PanduError::invalid_conversation("conversation is empty"));
        };
        if last.role != TurnRole::User {
            return Err(PanduError::invalid_conversation(format!(
                "conversation must end with a user turn, found {}",
                last.role
            )));
        }
        if let Some(turn) = self
            .turns
            .iter()
            .find(|t| t.has_images() && t.role != TurnRole::User)
        {
            return Err(PanduError::invalid_conversation(format!(
                "images are only allowed on user turns, found one on a {} turn",
                turn.role
            )));
        }
        Ok(())
    }
}

impl From<&str> for Conversation {
    fn from(question: &str) -> Self {
        Self {
            turns: vec![ChatTurn::user(question)],
        }
    }
}

impl From<String> for Conversation {
    fn from(question: String) -> Self {
        Self {
            turns: vec![ChatTurn::user(question)],
        }
    }
}

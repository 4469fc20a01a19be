//! Public entry points: the `Assistant` facade and its builder.
//!
//! One `Assistant` owns the whole pipeline: retrieve knowledge, compose the
//! prompt, route across providers, validate the answer. Sites construct it
//! once and share it; everything inside is `Send + Sync`.

use crate::config::OrchestratorConfig;
use crate::conversation::{ChatTurn, Conversation, ImageAttachment};
use crate::credentials::CredentialStore;
use crate::error::{PanduError, PanduResult};
use crate::knowledge::{KnowledgeRetriever, KnowledgeSource, RetrievalMode};
use crate::llm::adapter::ProviderAdapter;
use crate::llm::provider_types::{ProviderAttempt, ProviderKind};
use crate::llm::router::{ProviderPreference, ProviderRouter, RouteOptions};
use crate::llm::providers::{GeminiAdapter, GroqAdapter, OpenRouterAdapter};
use crate::prompts::PromptComposer;
use crate::types::{CallerPrivilege, QueryClass};
use crate::validation::ResponseValidator;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct AnswerOptions {
    pub preference: ProviderPreference,
    pub privilege: CallerPrivilege,
    /// Overall wall-clock budget for the provider chain.
    pub deadline: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

/// A validated answer plus everything observable about how it was produced.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub attempts: Vec<ProviderAttempt>,
    pub retrieval: RetrievalMode,
    pub from_cache: bool,
    pub rejected: bool,
    pub corrected: bool,
    pub redacted: bool,
}

/// The orchestration facade.
pub struct Assistant {
    router: ProviderRouter,
    retriever: KnowledgeRetriever,
    composer: PromptComposer,
    validator: ResponseValidator,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant").finish_non_exhaustive()
    }
}

impl Assistant {
    /// Start building an assistant.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pandu_core::{AnswerOptions, Assistant, Conversation, StaticCredentialStore};
    /// use pandu_core::knowledge::InMemoryKnowledgeSource;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let assistant = Assistant::builder()
    ///     .knowledge_source(Arc::new(InMemoryKnowledgeSource::new()))
    ///     .credentials(Arc::new(StaticCredentialStore::from_pairs([
    ///         ("groq_api_key", "gsk_your_key_here_0000000000"),
    ///     ])))
    ///     .build()?;
    ///
    /// let answer = assistant
    ///     .answer_text(&Conversation::from("Siapa ketua OSIS?"), &AnswerOptions::default())
    ///     .await?;
    /// println!("{}", answer.text);
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> AssistantBuilder {
        AssistantBuilder::default()
    }

    /// Answer a text conversation. The final turn must be from the user.
    pub async fn answer_text(
        &self,
        conversation: &Conversation,
        opts: &AnswerOptions,
    ) -> PanduResult<Answer> {
        conversation.ensure_answerable()?;
        let question = conversation
            .last_user_turn()
            .map(|turn| turn.content.clone())
            .unwrap_or_default();
        let class = QueryClass::classify(&question);
        self.answer(conversation.clone(), question, class, opts).await
    }

    /// Answer a question about an image. The primary image is the one being
    /// asked about; reference images (labeled) are comparison material.
    /// Reference images force the identification pipeline.
    pub async fn answer_vision(
        &self,
        primary: ImageAttachment,
        references: Vec<ImageAttachment>,
        question: &str,
        opts: &AnswerOptions,
    ) -> PanduResult<Answer> {
        let class = if references.is_empty() {
            QueryClass::classify(question)
        } else {
            QueryClass::Identification
        };

        let mut images = Vec::with_capacity(1 + references.len());
        images.push(primary);
        images.extend(references);

        let mut conversation = Conversation::new();
        conversation.push(ChatTurn::user_with_images(question, images));
        self.answer(conversation, question.to_string(), class, opts).await
    }

    #[tracing::instrument(
        name = "answer",
        skip_all,
        fields(request_id = %Uuid::new_v4(), class = %class, privilege = %opts.privilege)
    )]
    async fn answer(
        &self,
        conversation: Conversation,
        question: String,
        class: QueryClass,
        opts: &AnswerOptions,
    ) -> PanduResult<Answer> {
        let retrieval = self.retriever.retrieve(&question).await;
        if retrieval.degraded {
            warn!(mode = ?retrieval.mode, "answering with a degraded knowledge context");
        }
        debug!(
            mode = ?retrieval.mode,
            from_cache = retrieval.from_cache,
            "knowledge context ready"
        );

        let composed = self.composer.compose(&retrieval.text, &conversation)?;

        let route_opts = RouteOptions {
            preference: opts.preference,
            class,
            deadline: opts.deadline,
            cancel: opts.cancel.clone().unwrap_or_default(),
        };
        let success = self.router.route(&composed, &route_opts).await?;

        let report = self.validator.validate(
            &success.completion.text,
            &retrieval.text,
            class,
            opts.privilege,
        );
        info!(
            provider = %success.completion.provider,
            model = %success.completion.model,
            providers_tried = success.attempts.len(),
            rejected = report.rejected,
            corrected = report.corrected,
            redacted = report.redacted,
            "answer produced"
        );

        Ok(Answer {
            text: report.text,
            provider: Some(success.completion.provider),
            model: Some(success.completion.model),
            attempts: success.attempts,
            retrieval: retrieval.mode,
            from_cache: retrieval.from_cache,
            rejected: report.rejected,
            corrected: report.corrected,
            redacted: report.redacted,
        })
    }
}

/// Wires an [`Assistant`] together. A knowledge source and a credential
/// store are required; everything else has defaults.
#[derive(Default)]
pub struct AssistantBuilder {
    knowledge_source: Option<Arc<dyn KnowledgeSource>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    adapters: Option<Vec<Arc<dyn ProviderAdapter>>>,
    config: OrchestratorConfig,
    composer: PromptComposer,
}

impl AssistantBuilder {
    pub fn knowledge_source(mut self, source: Arc<dyn KnowledgeSource>) -> Self {
        self.knowledge_source = Some(source);
        self
    }

    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Replace the real provider adapters. Lets tests drive the full
    /// pipeline without HTTP.
    pub fn with_adapters(mut self, adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        self.adapters = Some(adapters);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn build(self) -> PanduResult<Assistant> {
        self.config.validate()?;
        let source = self
            .knowledge_source
            .ok_or_else(|| PanduError::config("a knowledge source is required"))?;
        let credentials = self
            .credentials
            .ok_or_else(|| PanduError::config("a credential store is required"))?;
        let adapters = match self.adapters {
            Some(adapters) if adapters.is_empty() => {
                return Err(PanduError::config("adapter list must not be empty"));
            }
            Some(adapters) => adapters,
            None => default_adapters()?,
        };

        let retriever = KnowledgeRetriever::new(
            source,
            self.config.cache_ttl,
            self.config.snapshot_limit,
        );
        let router = ProviderRouter::new(adapters, credentials, &self.config);

        Ok(Assistant {
            router,
            retriever,
            composer: self.composer,
            validator: ResponseValidator::new(),
        })
    }
}

/// The three real adapters over one shared HTTP client. Request timeouts
/// are enforced per attempt by the retry policy, so the client only caps
/// connection setup.
fn default_adapters() -> PanduResult<Vec<Arc<dyn ProviderAdapter>>> {
    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| PanduError::config(format!("failed to build HTTP client: {e}")))?;

    Ok(vec![
        Arc::new(GroqAdapter::new(http_client.clone())),
        Arc::new(GeminiAdapter::new(http_client.clone())),
        Arc::new(OpenRouterAdapter::new(http_client)),
    ])
}

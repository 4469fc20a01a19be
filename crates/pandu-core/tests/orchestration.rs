//! End-to-end orchestration tests
//!
//! Drives the public [`Assistant`] API through scripted provider adapters,
//! covering fallback order, retry budgets, explicit preference, validation,
//! redaction, and the knowledge cache without touching the network.

use async_trait::async_trait;
use pandu_core::knowledge::SourceError;
use pandu_core::llm::{AttemptOutcome, ProviderError, ProviderRequest};
use pandu_core::prompts::{CONTEXT_BEGIN, CONTEXT_END};
use pandu_core::validation::PRIVACY_NOTICE;
use pandu_core::{
    AnswerOptions, Assistant, CallerPrivilege, Completion, Conversation, ImageAttachment,
    InMemoryKnowledgeSource, KnowledgeRecord, KnowledgeSource, OrchestratorConfig, PanduError,
    ProviderAdapter, ProviderKind, ProviderPreference, QueryClass, RecordCategory,
    REFUSAL_UNKNOWN_PERSON, ResponseValidator, RetrievalMode, RetryConfig, StaticCredentialStore,
    PUBLIC_UNAVAILABLE_MESSAGE,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// One scripted reaction to a `complete()` call.
enum Step {
    Reply(&'static str),
    RateLimited,
    Rejected,
}

/// Provider fake that replays a script and records what it was asked.
struct ScriptedAdapter {
    kind: ProviderKind,
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
    fn new(kind: ProviderKind, steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            steps: Mutex::new(steps.into_iter().collect()),
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn replying(kind: ProviderKind, text: &'static str) -> Arc<Self> {
        Self::new(kind, [Step::Reply(text)])
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn resolve_model(&self, requested: Option<&str>) -> String {
        requested.unwrap_or("scripted-model").to_string()
    }

    fn supports_multi_image(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        request: &ProviderRequest<'_>,
    ) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(turn) = request.conversation.last_user_turn() {
            self.prompts.lock().push(turn.content.clone());
        }
        match self.steps.lock().pop_front() {
            Some(Step::Reply(text)) => Ok(Completion {
                text: text.to_string(),
                model: request.model.clone(),
                provider: self.kind,
                usage: None,
            }),
            Some(Step::RateLimited) => Err(ProviderError::transient(format!(
                "{} returned HTTP 429: slow down",
                self.kind
            ))
            .with_status(429)),
            Some(Step::Rejected) => Err(ProviderError::permanent(format!(
                "{} returned HTTP 401: invalid key",
                self.kind
            ))
            .with_status(401)),
            None => Err(ProviderError::permanent("script exhausted")),
        }
    }
}

fn adapters(list: impl IntoIterator<Item = Arc<ScriptedAdapter>>) -> Vec<Arc<dyn ProviderAdapter>> {
    list.into_iter()
        .map(|adapter| adapter as Arc<dyn ProviderAdapter>)
        .collect()
}

/// Small OSIS dataset: three members, their sekbid, one event.
fn school_source() -> InMemoryKnowledgeSource {
    let mut source = InMemoryKnowledgeSource::new();
    source.extend(
        RecordCategory::People,
        [
            KnowledgeRecord::new("p1", "Dewi Lestari")
                .with_summary("Dokumentasi acara sekolah")
                .with_group_ref(2),
            KnowledgeRecord::new("p2", "Budi Santoso")
                .with_summary("Ketua OSIS")
                .with_group_ref(1),
            KnowledgeRecord::new("p3", "Alice Wijaya")
                .with_summary("Atlet basket")
                .with_group_ref(3),
        ],
    );
    source.extend(
        RecordCategory::Groups,
        [
            KnowledgeRecord::new("g1", "Keagamaan").with_group_ref(1),
            KnowledgeRecord::new("g2", "Humas").with_group_ref(2),
            KnowledgeRecord::new("g3", "Olahraga").with_group_ref(3),
        ],
    );
    source.insert(
        RecordCategory::Events,
        KnowledgeRecord::new("e1", "Pentas Seni").with_summary("Panggung tahunan seluruh sekbid"),
    );
    source
}

fn full_store() -> Arc<StaticCredentialStore> {
    Arc::new(StaticCredentialStore::from_pairs([
        ("groq_api_key", "gsk_0123456789abcdef0000"),
        ("gemini_api_key", "AIzaSyExample000000000000"),
        ("openrouter_api_key", "sk-or-v1-0123456789abcdef"),
    ]))
}

/// Default config with backoff zeroed so failing tests don't sleep.
fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        retry: RetryConfig {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            attempt_timeout: Duration::from_secs(5),
        },
        ..OrchestratorConfig::default()
    }
}

fn assistant_with(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Assistant {
    assistant_with_config(adapters, fast_config())
}

fn assistant_with_config(
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    config: OrchestratorConfig,
) -> Assistant {
    Assistant::builder()
        .knowledge_source(Arc::new(school_source()))
        .credentials(full_store())
        .with_adapters(adapters)
        .config(config)
        .build()
        .expect("assistant should build")
}

#[tokio::test]
async fn generic_question_falls_back_in_table_order() {
    // Gemini (first for generic questions) burns its whole retry budget,
    // then Groq answers on its first attempt.
    let gemini = ScriptedAdapter::new(
        ProviderKind::Gemini,
        [Step::RateLimited, Step::RateLimited, Step::RateLimited],
    );
    let groq = ScriptedAdapter::replying(ProviderKind::Groq, "Pentas Seni digelar di aula utama.");
    let openrouter = ScriptedAdapter::replying(ProviderKind::OpenRouter, "tidak dipakai");
    let assistant = assistant_with(adapters([gemini.clone(), groq.clone(), openrouter.clone()]));

    let answer = assistant
        .answer_text(
            &Conversation::from("kapan pentas seni diadakan?"),
            &AnswerOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(answer.text, "Pentas Seni digelar di aula utama.");
    assert_eq!(answer.provider, Some(ProviderKind::Groq));
    assert_eq!(gemini.calls(), 3);
    assert_eq!(groq.calls(), 1);
    assert_eq!(openrouter.calls(), 0);
    assert_eq!(answer.attempts.len(), 2);
    assert_eq!(
        answer.attempts[0].outcome,
        AttemptOutcome::TransientExhausted { attempts: 3 }
    );
    assert_eq!(answer.attempts[1].outcome, AttemptOutcome::Success);
    assert_eq!(answer.retrieval, RetrievalMode::Targeted);
}

#[tokio::test]
async fn first_healthy_provider_answers_alone() {
    let gemini = ScriptedAdapter::replying(ProviderKind::Gemini, "Aula sudah dipesan.");
    let groq = ScriptedAdapter::replying(ProviderKind::Groq, "tidak dipakai");
    let openrouter = ScriptedAdapter::replying(ProviderKind::OpenRouter, "tidak dipakai");
    let assistant = assistant_with(adapters([gemini.clone(), groq.clone(), openrouter.clone()]));

    let answer = assistant
        .answer_text(
            &Conversation::from("kapan pentas seni diadakan?"),
            &AnswerOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(answer.provider, Some(ProviderKind::Gemini));
    assert_eq!(gemini.calls(), 1);
    assert_eq!(groq.calls(), 0);
    assert_eq!(openrouter.calls(), 0);
    assert_eq!(answer.attempts.len(), 1);
}

#[tokio::test]
async fn identification_questions_use_their_own_provider_order() {
    // "siapa" flips the class to identification, where Groq leads.
    let gemini = ScriptedAdapter::replying(ProviderKind::Gemini, "tidak dipakai");
    let groq = ScriptedAdapter::replying(ProviderKind::Groq, "Dia adalah anggota OSIS.");
    let assistant = assistant_with(adapters([gemini.clone(), groq.clone()]));

    let answer = assistant
        .answer_text(
            &Conversation::from("siapa alice ini?"),
            &AnswerOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(answer.provider, Some(ProviderKind::Groq));
    assert_eq!(groq.calls(), 1);
    assert_eq!(gemini.calls(), 0);
}

#[tokio::test]
async fn transient_retries_back_off_linearly() {
    let gemini = ScriptedAdapter::new(
        ProviderKind::Gemini,
        [
            Step::RateLimited,
            Step::RateLimited,
            Step::Reply("Jadwalnya belum final."),
        ],
    );
    let config = OrchestratorConfig {
        retry: RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(25),
            attempt_timeout: Duration::from_secs(5),
        },
        ..OrchestratorConfig::default()
    };
    let assistant = assistant_with_config(adapters([gemini.clone()]), config);

    let started = Instant::now();
    let answer = assistant
        .answer_text(
            &Conversation::from("kapan pentas seni diadakan?"),
            &AnswerOptions::default(),
        )
        .await
        .unwrap();

    // Two failures wait 25ms then 50ms before the third attempt succeeds.
    assert!(started.elapsed() >= Duration::from_millis(75));
    assert_eq!(gemini.calls(), 3);
    assert_eq!(answer.provider, Some(ProviderKind::Gemini));
}

#[tokio::test]
async fn explicit_provider_with_malformed_key_fails_without_calling() {
    let groq = ScriptedAdapter::replying(ProviderKind::Groq, "tidak dipakai");
    let store = Arc::new(StaticCredentialStore::from_pairs([
        // OpenRouter-shaped key in the Groq slot.
        ("groq_api_key", "sk-or-v1-0123456789abcdef"),
    ]));
    let assistant = Assistant::builder()
        .knowledge_source(Arc::new(school_source()))
        .credentials(store)
        .with_adapters(adapters([groq.clone()]))
        .config(fast_config())
        .build()
        .unwrap();

    let opts = AnswerOptions {
        preference: ProviderPreference::Explicit(ProviderKind::Groq),
        ..AnswerOptions::default()
    };
    let err = assistant
        .answer_text(&Conversation::from("kapan pentas seni diadakan?"), &opts)
        .await
        .unwrap_err();

    assert_eq!(groq.calls(), 0);
    assert!(matches!(
        err,
        PanduError::CredentialMalformed {
            provider: ProviderKind::Groq,
            ..
        }
    ));

    // Admins see the expected key shape; the public gets the generic line.
    let admin = err.user_message(CallerPrivilege::Admin);
    assert!(admin.contains("Groq"));
    assert!(admin.contains("gsk_"));
    assert_eq!(
        err.user_message(CallerPrivilege::Public),
        PUBLIC_UNAVAILABLE_MESSAGE
    );
}

#[tokio::test]
async fn explicit_provider_failure_is_never_hidden_by_fallback() {
    let gemini = ScriptedAdapter::replying(ProviderKind::Gemini, "tidak dipakai");
    let groq = ScriptedAdapter::new(ProviderKind::Groq, [Step::Rejected]);
    let assistant = assistant_with(adapters([gemini.clone(), groq.clone()]));

    let opts = AnswerOptions {
        preference: ProviderPreference::Explicit(ProviderKind::Groq),
        ..AnswerOptions::default()
    };
    let err = assistant
        .answer_text(&Conversation::from("kapan pentas seni diadakan?"), &opts)
        .await
        .unwrap_err();

    let PanduError::PermanentProvider {
        provider, status, ..
    } = err
    else {
        panic!("expected PermanentProvider");
    };
    assert_eq!(provider, ProviderKind::Groq);
    assert_eq!(status, Some(401));
    assert_eq!(groq.calls(), 1);
    assert_eq!(gemini.calls(), 0);
}

#[tokio::test]
async fn missing_keys_exhaust_with_one_skip_per_provider() {
    let gemini = ScriptedAdapter::replying(ProviderKind::Gemini, "x");
    let groq = ScriptedAdapter::replying(ProviderKind::Groq, "x");
    let openrouter = ScriptedAdapter::replying(ProviderKind::OpenRouter, "x");
    let assistant = Assistant::builder()
        .knowledge_source(Arc::new(school_source()))
        .credentials(Arc::new(StaticCredentialStore::new()))
        .with_adapters(adapters([gemini.clone(), groq.clone(), openrouter.clone()]))
        .config(fast_config())
        .build()
        .unwrap();

    let err = assistant
        .answer_text(
            &Conversation::from("kapan pentas seni diadakan?"),
            &AnswerOptions::default(),
        )
        .await
        .unwrap_err();

    let PanduError::AllProvidersExhausted { attempts } = err else {
        panic!("expected AllProvidersExhausted");
    };
    assert_eq!(attempts.len(), 3);
    assert!(
        attempts
            .iter()
            .all(|a| a.outcome == AttemptOutcome::SkippedMissingCredential)
    );
    assert_eq!(gemini.calls() + groq.calls() + openrouter.calls(), 0);
}

#[tokio::test]
async fn misattributed_group_is_corrected_from_context() {
    // The context lists Alice Wijaya under Sekbid 3; the model says 2.
    let groq = ScriptedAdapter::replying(ProviderKind::Groq, "This is Alice, group 2.");
    let assistant = assistant_with(adapters([groq]));

    let answer = assistant
        .answer_text(
            &Conversation::from("siapa alice ini?"),
            &AnswerOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(answer.text, "This is Alice, group 3 ✅ (dikoreksi otomatis).");
    assert!(answer.corrected);
    assert!(!answer.rejected);
}

#[tokio::test]
async fn unknown_person_answer_becomes_a_refusal() {
    let groq = ScriptedAdapter::replying(
        ProviderKind::Groq,
        "Ini adalah Charlie Van Houten dari Sekbid 4.",
    );
    let assistant = assistant_with(adapters([groq]));

    let answer = assistant
        .answer_text(&Conversation::from("siapa ini?"), &AnswerOptions::default())
        .await
        .unwrap();

    assert_eq!(answer.text, REFUSAL_UNKNOWN_PERSON);
    assert!(answer.rejected);
    // Nothing in the data matches the question, so the model saw a snapshot.
    assert_eq!(answer.retrieval, RetrievalMode::FullSnapshot);
}

#[tokio::test]
async fn vision_identification_corrects_the_claimed_group() {
    let groq = ScriptedAdapter::replying(ProviderKind::Groq, "Ini adalah Dewi, Sekbid 5");
    let assistant = assistant_with(adapters([groq.clone()]));

    let primary = ImageAttachment::new("image/jpeg", "Zm90by11dGFtYQ==");
    let reference =
        ImageAttachment::new("image/jpeg", "a2FydHU=").with_label("kartu pelajar Dewi");

    let answer = assistant
        .answer_vision(
            primary,
            vec![reference],
            "siapa orang di foto ini?",
            &AnswerOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(answer.text, "Ini adalah Dewi, Sekbid 2 ✅ (dikoreksi otomatis)");
    assert!(answer.corrected);
    assert!(!answer.rejected);

    // The composed turn kept both images for the provider.
    let prompt = groq.last_prompt().expect("provider saw a prompt");
    assert!(prompt.contains("siapa orang di foto ini?"));
}

#[tokio::test]
async fn revalidating_validated_output_changes_nothing() {
    let retriever = pandu_core::knowledge::KnowledgeRetriever::new(
        Arc::new(school_source()),
        Duration::from_secs(60),
        25,
    );
    let context = retriever.retrieve("siapa ini?").await;

    let raw = "Ini adalah Dewi, Sekbid 5.\nTinggi badan: 160 cm.\nFoto: https://supabase.co/storage/osis/dewi.jpg";
    let validator = ResponseValidator::new();
    let first = validator.validate(
        raw,
        &context.text,
        QueryClass::Identification,
        CallerPrivilege::Public,
    );
    assert!(first.corrected);
    assert!(first.redacted);
    assert!(first.text.contains("Sekbid 2 ✅ (dikoreksi otomatis)"));
    assert!(!first.text.contains("160"));
    assert!(!first.text.contains("supabase"));

    let second = validator.validate(
        &first.text,
        &context.text,
        QueryClass::Identification,
        CallerPrivilege::Public,
    );
    assert_eq!(second.text, first.text);
    assert!(!second.corrected);
    assert!(!second.redacted);
    assert!(!second.rejected);
}

struct CountingSource {
    inner: InMemoryKnowledgeSource,
    searches: AtomicU32,
}

#[async_trait]
impl KnowledgeSource for CountingSource {
    async fn search(
        &self,
        category: RecordCategory,
        query: &str,
    ) -> Result<Vec<KnowledgeRecord>, SourceError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(category, query).await
    }

    async fn snapshot(
        &self,
        category: RecordCategory,
        limit: usize,
    ) -> Result<Vec<KnowledgeRecord>, SourceError> {
        self.inner.snapshot(category, limit).await
    }
}

#[tokio::test]
async fn equivalent_questions_reuse_the_cached_context_until_expiry() {
    let source = Arc::new(CountingSource {
        inner: school_source(),
        searches: AtomicU32::new(0),
    });
    let gemini = ScriptedAdapter::new(
        ProviderKind::Gemini,
        [
            Step::Reply("satu"),
            Step::Reply("dua"),
            Step::Reply("tiga"),
            Step::Reply("empat"),
        ],
    );
    let config = OrchestratorConfig {
        cache_ttl: Duration::from_millis(200),
        ..fast_config()
    };
    let assistant = Assistant::builder()
        .knowledge_source(source.clone())
        .credentials(full_store())
        .with_adapters(adapters([gemini]))
        .config(config)
        .build()
        .unwrap();
    let opts = AnswerOptions::default();

    // 1. Cold: one search per record category.
    let first = assistant
        .answer_text(&Conversation::from("kapan pentas seni diadakan?"), &opts)
        .await
        .unwrap();
    assert!(!first.from_cache);
    assert_eq!(source.searches.load(Ordering::SeqCst), 5);

    // 2. Same words, different case and spacing: served from the slot.
    let second = assistant
        .answer_text(
            &Conversation::from("  Kapan   PENTAS seni diadakan?"),
            &opts,
        )
        .await
        .unwrap();
    assert!(second.from_cache);
    assert_eq!(source.searches.load(Ordering::SeqCst), 5);

    // 3. Past the TTL the slot is stale.
    tokio::time::sleep(Duration::from_millis(250)).await;
    let third = assistant
        .answer_text(&Conversation::from("kapan pentas seni diadakan?"), &opts)
        .await
        .unwrap();
    assert!(!third.from_cache);
    assert_eq!(source.searches.load(Ordering::SeqCst), 10);

    // 4. A different question misses the single slot.
    let fourth = assistant
        .answer_text(&Conversation::from("apa itu humas?"), &opts)
        .await
        .unwrap();
    assert!(!fourth.from_cache);
}

#[tokio::test]
async fn public_answers_hide_internal_links_admin_answers_keep_them() {
    let raw = "Profil Dewi ada di https://supabase.co/storage/v1/object/osis/dewi.jpg";
    let gemini = ScriptedAdapter::new(ProviderKind::Gemini, [Step::Reply(raw), Step::Reply(raw)]);
    let assistant = assistant_with(adapters([gemini]));
    let conversation = Conversation::from("di mana profil dewi?");

    let public = assistant
        .answer_text(&conversation, &AnswerOptions::default())
        .await
        .unwrap();
    assert!(public.text.contains("[tautan internal disembunyikan]"));
    assert!(public.text.contains(PRIVACY_NOTICE));
    assert!(!public.text.contains("supabase"));
    assert!(public.redacted);

    let opts = AnswerOptions {
        privilege: CallerPrivilege::Admin,
        ..AnswerOptions::default()
    };
    let admin = assistant.answer_text(&conversation, &opts).await.unwrap();
    assert!(admin.text.contains("supabase"));
    assert!(!admin.redacted);
}

#[tokio::test]
async fn composed_prompt_carries_context_rules_and_question() {
    let groq = ScriptedAdapter::replying(ProviderKind::Groq, "Alice Wijaya adalah anggota Sekbid 3.");
    let assistant = assistant_with(adapters([groq.clone()]));

    let answer = assistant
        .answer_text(
            &Conversation::from("siapa alice ini?"),
            &AnswerOptions::default(),
        )
        .await
        .unwrap();
    // The claim agrees with the context, so the text passes unchanged.
    assert!(!answer.corrected);

    let prompt = groq.last_prompt().expect("provider saw a prompt");
    assert!(prompt.starts_with(CONTEXT_BEGIN));
    assert!(prompt.contains("[[MODE: TERTARGET]]"));
    assert!(prompt.contains("- Alice Wijaya | Sekbid 3 (Olahraga) | Atlet basket"));
    assert!(prompt.contains(CONTEXT_END));
    assert!(prompt.contains("ATURAN MENJAWAB"));
    assert!(prompt.ends_with("Pertanyaan: siapa alice ini?"));
}

#[tokio::test]
async fn expired_deadline_fails_before_any_provider_call() {
    let gemini = ScriptedAdapter::replying(ProviderKind::Gemini, "x");
    let assistant = assistant_with(adapters([gemini.clone()]));

    let opts = AnswerOptions {
        deadline: Some(Duration::ZERO),
        ..AnswerOptions::default()
    };
    let err = assistant
        .answer_text(&Conversation::from("kapan pentas seni diadakan?"), &opts)
        .await
        .unwrap_err();

    assert!(matches!(err, PanduError::DeadlineExceeded { .. }));
    assert_eq!(gemini.calls(), 0);
}

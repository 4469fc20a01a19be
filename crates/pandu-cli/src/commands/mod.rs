//! CLI commands

pub mod ask;
pub mod providers;
pub mod vision;

use crate::args::CommonArgs;
use crate::knowledge_file;
use crate::store::EnvCredentialStore;
use anyhow::{Result, anyhow};
use colored::*;
use pandu_core::{
    Answer, AnswerOptions, Assistant, CallerPrivilege, InMemoryKnowledgeSource, PanduError,
    ProviderPreference,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Wire an assistant from the shared flags: knowledge from the JSON file
/// (or empty), credentials from the environment.
pub(crate) fn build_assistant(common: &CommonArgs) -> Result<Assistant> {
    let source = match &common.knowledge {
        Some(path) => knowledge_file::load(path)?,
        None => InMemoryKnowledgeSource::new(),
    };
    let assistant = Assistant::builder()
        .knowledge_source(Arc::new(source))
        .credentials(Arc::new(EnvCredentialStore))
        .build()?;
    Ok(assistant)
}

/// Per-request options from the shared flags. Ctrl-C cancels the in-flight
/// provider call instead of killing the process mid-request.
pub(crate) fn answer_options(common: &CommonArgs) -> Result<AnswerOptions> {
    let preference = match &common.provider {
        Some(name) => ProviderPreference::Explicit(name.parse().map_err(|e: String| anyhow!(e))?),
        None => ProviderPreference::Auto,
    };

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    Ok(AnswerOptions {
        preference,
        privilege: if common.admin {
            CallerPrivilege::Admin
        } else {
            CallerPrivilege::Public
        },
        deadline: common.deadline.map(Duration::from_secs),
        cancel: Some(cancel),
    })
}

/// Print the answer to stdout; diagnostics go to stderr so the answer text
/// stays pipeable.
pub(crate) fn print_answer(answer: &Answer, verbose: bool) {
    println!("{}", answer.text);
    if !verbose {
        return;
    }
    eprintln!();
    if let (Some(provider), Some(model)) = (answer.provider, answer.model.as_deref()) {
        eprintln!(
            "{}",
            format!("provider: {} ({model})", provider.display_name()).dimmed()
        );
    }
    eprintln!(
        "{}",
        format!(
            "retrieval: {:?}{}",
            answer.retrieval,
            if answer.from_cache { " (cached)" } else { "" }
        )
        .dimmed()
    );
    for attempt in &answer.attempts {
        eprintln!(
            "{}",
            format!("attempt: {} -> {:?}", attempt.provider, attempt.outcome).dimmed()
        );
    }
    if answer.rejected {
        eprintln!("{}", "validator: response rejected".yellow());
    }
    if answer.corrected {
        eprintln!("{}", "validator: claims auto-corrected".yellow());
    }
    if answer.redacted {
        eprintln!("{}", "validator: sensitive details redacted".yellow());
    }
}

/// Render a pipeline failure the way the caller is allowed to see it.
pub(crate) fn user_error(err: PanduError, privilege: CallerPrivilege) -> anyhow::Error {
    anyhow!(err.user_message(privilege))
}

//! One-shot text question command.

use crate::args::CommonArgs;
use anyhow::Result;
use pandu_core::Conversation;

pub async fn execute(question: &str, common: &CommonArgs, verbose: bool) -> Result<()> {
    let assistant = super::build_assistant(common)?;
    let opts = super::answer_options(common)?;
    let conversation = Conversation::from(question);

    match assistant.answer_text(&conversation, &opts).await {
        Ok(answer) => {
            super::print_answer(&answer, verbose);
            Ok(())
        }
        Err(err) => Err(super::user_error(err, opts.privilege)),
    }
}

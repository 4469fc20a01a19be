//! Photo identification command.

use crate::args::CommonArgs;
use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pandu_core::ImageAttachment;
use std::path::{Path, PathBuf};

pub async fn execute(
    image: &Path,
    question: &str,
    references: &[String],
    common: &CommonArgs,
    verbose: bool,
) -> Result<()> {
    let primary = load_image(image)?;
    let mut labeled = Vec::with_capacity(references.len());
    for spec in references {
        let (label, path) = parse_reference(spec)?;
        labeled.push(load_image(&path)?.with_label(label));
    }

    let assistant = super::build_assistant(common)?;
    let opts = super::answer_options(common)?;

    match assistant
        .answer_vision(primary, labeled, question, &opts)
        .await
    {
        Ok(answer) => {
            super::print_answer(&answer, verbose);
            Ok(())
        }
        Err(err) => Err(super::user_error(err, opts.privilege)),
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

fn load_image(path: &Path) -> Result<ImageAttachment> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("cannot read image {}", path.display()))?;
    Ok(ImageAttachment::new(mime_for(path), STANDARD.encode(bytes)))
}

/// A reference spec is `NAME=PATH`; the name is the label the model sees
/// next to the reference photo.
fn parse_reference(spec: &str) -> Result<(String, PathBuf)> {
    match spec.split_once('=') {
        Some((label, path)) if !label.trim().is_empty() && !path.trim().is_empty() => {
            Ok((label.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => bail!("reference must be NAME=PATH, got '{spec}'"),
    }
}

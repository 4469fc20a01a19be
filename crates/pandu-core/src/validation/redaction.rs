//! Privilege redaction and formatting normalization for public answers.
//!
//! Public callers never see biometric descriptors, internal storage links,
//! or opaque tokens, even when the model volunteers them from the context.
//! Admin callers skip redaction entirely. Both passes are idempotent so a
//! response can be validated more than once without piling up notices.

use once_cell::sync::Lazy;
use regex::Regex;

/// Appended once to any answer that had details removed.
pub const PRIVACY_NOTICE: &str = "ℹ️ Sebagian detail disembunyikan untuk menjaga privasi.";

const HIDDEN_LINK: &str = "[tautan internal disembunyikan]";
const HIDDEN_TOKEN: &str = "[token disembunyikan]";

/// Whole lines carrying physical or biometric descriptors.
static BIOMETRIC_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^.*\b(tinggi badan|berat badan|ciri fisik|warna kulit|bentuk wajah|bentuk rambut|golongan darah)\b.*\n?",
    )
    .unwrap()
});

/// Links into internal object storage, never meant for public eyes.
static STORAGE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"https?://[^\s)\]]*(?:supabase|firebase|amazonaws|blob\.core|storage\.googleapis|cdn-internal)[^\s)\]]*",
    )
    .unwrap()
});

/// Opaque identifiers: access tokens, signed-URL fragments, hashes.
static OPAQUE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9+/=_-]{32,}\b").unwrap());

static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^([ \t]*)[*•]\s+").unwrap());

static EXTRA_NEWLINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip sensitive material from an answer bound for a public caller.
/// Returns the cleaned text and whether anything was removed.
pub fn redact_sensitive(text: &str) -> (String, bool) {
    let mut out = text.to_string();
    let mut redacted = false;

    if BIOMETRIC_LINE_RE.is_match(&out) {
        out = BIOMETRIC_LINE_RE.replace_all(&out, "").into_owned();
        redacted = true;
    }
    if STORAGE_URL_RE.is_match(&out) {
        out = STORAGE_URL_RE.replace_all(&out, HIDDEN_LINK).into_owned();
        redacted = true;
    }
    if OPAQUE_TOKEN_RE.is_match(&out) {
        out = OPAQUE_TOKEN_RE.replace_all(&out, HIDDEN_TOKEN).into_owned();
        redacted = true;
    }

    if redacted && !out.contains(PRIVACY_NOTICE) {
        let body = out.trim_end();
        out = format!("{body}\n\n{PRIVACY_NOTICE}");
    }
    (out, redacted)
}

/// Normalize model formatting tics: emphasis markers, foreign bullets,
/// runaway blank lines, trailing whitespace.
pub fn normalize_formatting(text: &str) -> String {
    let text = text.replace("**", "").replace("__", "");
    let text = BULLET_RE.replace_all(&text, "${1}- ");
    let text = EXTRA_NEWLINES_RE.replace_all(&text, "\n\n");
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    lines.join("\n").trim().to_string()
}

//! Fact-checks a model answer against the context it was grounded in.
//!
//! Pure string work, no I/O. The validator parses the rendered context back
//! into facts, then runs the answer through up to four passes: identity
//! hallucination guard, group-claim cross-check, privilege redaction, and
//! formatting normalization. The first two run only for identification
//! queries; redaction is skipped for admins; normalization always runs.

use super::redaction::{normalize_formatting, redact_sensitive};
use crate::types::{CallerPrivilege, QueryClass};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use tracing::{debug, info};

/// Canned refusal when an identification answer names someone the context
/// does not know. A successful refusal, not an error.
pub const REFUSAL_UNKNOWN_PERSON: &str = "Maaf, saya tidak dapat mengenali orang pada pertanyaan \
atau foto ini berdasarkan data OSIS yang tersedia.";

/// Byte distance between a name mention and the group claim it anchors.
const CLAIM_WINDOW: usize = 80;

/// Words that appear next to names without being names: roles, unit words,
/// honorifics. A "name" made only of these is not an identity claim.
const NON_NAME_WORDS: &[&str] = &[
    "ketua",
    "wakil",
    "osis",
    "sekbid",
    "anggota",
    "seksi",
    "bidang",
    "pembina",
    "sekretaris",
    "bendahara",
    "koordinator",
    "kak",
    "pak",
    "bu",
    "bang",
    "mbak",
    "mas",
];

static SEKBID_NUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsekbid\s+(\d{1,2})\b").unwrap());

/// Identity assertions followed by a capitalized name. The phrase list is
/// case-insensitive; the name capture is not, so it only grabs proper nouns.
static IDENTITY_CLAIM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?i:namanya adalah|ini adalah|itu adalah|dia adalah|namanya|bernama|this is)\s+(?P<name>[A-Z][A-Za-z]*(?:\s+[A-Z][A-Za-z]*)*)",
    )
    .unwrap()
});

/// A group membership claim: a label word plus a small number.
static GROUP_CLAIM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?P<label>sekbid|seksi bidang|grup|group|kelompok)\s*[:.]?\s*(?P<num>\d{1,2})\b")
        .unwrap()
});

/// One person as stated by the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonFact {
    pub name: String,
    pub group: Option<u32>,
}

/// Everything the validator trusts: the people list and the set of group
/// numbers that exist.
#[derive(Debug, Clone, Default)]
pub struct ContextFacts {
    pub people: Vec<PersonFact>,
    pub valid_groups: BTreeSet<u32>,
}

impl ContextFacts {
    /// Parse the rendered context block. Works the same on targeted and
    /// full-snapshot contexts; the unavailable marker yields empty facts.
    pub fn parse(context_text: &str) -> Self {
        let mut facts = ContextFacts::default();
        let mut section: Option<&str> = None;

        for line in context_text.lines() {
            let line = line.trim();
            if let Some(heading) = line
                .strip_prefix("=== ")
                .and_then(|rest| rest.strip_suffix(" ==="))
            {
                section = Some(heading);
                continue;
            }
            let Some(body) = line.strip_prefix("- ") else {
                continue;
            };
            match section {
                Some("ANGGOTA") => {
                    // Only the second field carries the membership; a summary
                    // mentioning some Sekbid must not become this person's group.
                    let mut fields = body.split(" | ");
                    let name = fields.next().unwrap_or(body).trim().to_string();
                    let group = fields.next().and_then(parse_sekbid_number);
                    if let Some(num) = group {
                        facts.valid_groups.insert(num);
                    }
                    facts.people.push(PersonFact { name, group });
                }
                Some("SEKBID") => {
                    if let Some(num) = parse_sekbid_number(body) {
                        facts.valid_groups.insert(num);
                    }
                }
                _ => {}
            }
        }
        facts
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.valid_groups.is_empty()
    }

    /// Token-subset match: "Dewi" finds "Dewi Lestari", and vice versa.
    /// Role words and honorifics are ignored on both sides.
    pub fn find_person(&self, mention: &str) -> Option<&PersonFact> {
        let mention_tokens = significant_tokens(mention);
        if mention_tokens.is_empty() {
            return None;
        }
        self.people.iter().find(|person| {
            let name_tokens = significant_tokens(&person.name);
            !name_tokens.is_empty()
                && (mention_tokens.iter().all(|t| name_tokens.contains(t))
                    || name_tokens.iter().all(|t| mention_tokens.contains(t)))
        })
    }
}

fn parse_sekbid_number(text: &str) -> Option<u32> {
    SEKBID_NUM_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn significant_tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|token| token.to_lowercase())
        .filter(|token| !token.is_empty() && !NON_NAME_WORDS.contains(&token.as_str()))
        .collect()
}

/// Audit record for one checked claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    /// The claim as the model wrote it.
    pub claimed_name: String,
    /// The context person the claim resolved to, if any.
    pub matched_name: Option<String>,
    /// The rewritten claim, when a correction was applied.
    pub corrected: Option<String>,
    pub rejected: bool,
}

/// Outcome of validating one answer.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub text: String,
    pub verdicts: Vec<ValidationVerdict>,
    /// The whole answer was replaced with the refusal.
    pub rejected: bool,
    /// At least one group claim was rewritten.
    pub corrected: bool,
    /// At least one sensitive detail was removed.
    pub redacted: bool,
}

/// Validates answers against context facts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(
        &self,
        raw: &str,
        context_text: &str,
        class: QueryClass,
        privilege: CallerPrivilege,
    ) -> ValidationReport {
        let facts = ContextFacts::parse(context_text);
        let mut verdicts = Vec::new();
        let mut text = raw.to_string();
        let mut rejected = false;
        let mut corrected = false;

        if class == QueryClass::Identification {
            rejected = check_identity_claims(&text, &facts, &mut verdicts);
            if rejected {
                text = REFUSAL_UNKNOWN_PERSON.to_string();
            } else {
                let (checked, did_correct) =
                    cross_check_group_claims(&text, &facts, &mut verdicts);
                text = checked;
                corrected = did_correct;
            }
        }

        let mut redacted = false;
        if !privilege.is_admin() && !rejected {
            let (cleaned, did_redact) = redact_sensitive(&text);
            text = cleaned;
            redacted = did_redact;
        }

        text = normalize_formatting(&text);
        debug!(rejected, corrected, redacted, "answer validated");
        ValidationReport {
            text,
            verdicts,
            rejected,
            corrected,
            redacted,
        }
    }
}

/// Returns true when any asserted identity has no match in the context.
fn check_identity_claims(
    text: &str,
    facts: &ContextFacts,
    verdicts: &mut Vec<ValidationVerdict>,
) -> bool {
    let mut rejected = false;
    for caps in IDENTITY_CLAIM_RE.captures_iter(text) {
        let claimed = caps["name"].trim().to_string();
        if significant_tokens(&claimed).is_empty() {
            // Role words only ("Ketua OSIS"), not a person.
            continue;
        }
        let matched = facts.find_person(&claimed);
        let unknown = matched.is_none();
        verdicts.push(ValidationVerdict {
            claimed_name: claimed.clone(),
            matched_name: matched.map(|person| person.name.clone()),
            corrected: None,
            rejected: unknown,
        });
        if unknown {
            info!(claimed = %claimed, "identity claim has no grounding, refusing");
            rejected = true;
        }
    }
    rejected
}

struct Mention {
    end: usize,
    person: usize,
}

/// Every place a context person is mentioned, located by full name or by an
/// unambiguous first name.
fn person_mentions(text: &str, facts: &ContextFacts) -> Vec<Mention> {
    let mut first_name_counts: HashMap<String, usize> = HashMap::new();
    for person in &facts.people {
        if let Some(first) = first_name(&person.name) {
            *first_name_counts.entry(first).or_insert(0) += 1;
        }
    }

    let mut mentions = Vec::new();
    for (index, person) in facts.people.iter().enumerate() {
        let mut needles = vec![person.name.clone()];
        if let Some(first) = first_name(&person.name) {
            if first_name_counts.get(&first) == Some(&1) && first != person.name.to_lowercase() {
                needles.push(first);
            }
        }
        for needle in needles {
            let Ok(pattern) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&needle))) else {
                continue;
            };
            for found in pattern.find_iter(text) {
                mentions.push(Mention {
                    end: found.end(),
                    person: index,
                });
            }
        }
    }
    mentions
}

fn first_name(name: &str) -> Option<String> {
    name.split_whitespace().next().map(|t| t.to_lowercase())
}

/// Rewrite group claims that disagree with the context. Claims are anchored
/// to the nearest preceding person mention; unanchored claims are checked
/// against the set of valid group numbers instead.
fn cross_check_group_claims(
    text: &str,
    facts: &ContextFacts,
    verdicts: &mut Vec<ValidationVerdict>,
) -> (String, bool) {
    let mentions = person_mentions(text, facts);
    let claims: Vec<(Range<usize>, String, u32)> = GROUP_CLAIM_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps["label"].to_string();
            let num: u32 = caps["num"].parse().ok()?;
            Some((whole.range(), label, num))
        })
        .collect();

    let mut out = text.to_string();
    let mut corrected = false;
    let mut new_verdicts = Vec::new();

    // Right to left so earlier ranges stay valid after a rewrite.
    for (range, label, num) in claims.into_iter().rev() {
        let anchor = mentions
            .iter()
            .filter(|m| m.end <= range.start && range.start - m.end <= CLAIM_WINDOW)
            .max_by_key(|m| m.end);

        match anchor {
            Some(mention) => {
                let person = &facts.people[mention.person];
                let Some(true_group) = person.group else {
                    continue;
                };
                if true_group != num {
                    let replacement = format!("{label} {true_group} ✅ (dikoreksi otomatis)");
                    info!(
                        person = %person.name,
                        claimed = num,
                        actual = true_group,
                        "corrected a group claim"
                    );
                    new_verdicts.push(ValidationVerdict {
                        claimed_name: format!("{label} {num}"),
                        matched_name: Some(person.name.clone()),
                        corrected: Some(replacement.clone()),
                        rejected: false,
                    });
                    out.replace_range(range, &replacement);
                    corrected = true;
                }
            }
            None => {
                if !facts.valid_groups.is_empty() && !facts.valid_groups.contains(&num) {
                    let replacement = format!("{label} (tidak valid)");
                    new_verdicts.push(ValidationVerdict {
                        claimed_name: format!("{label} {num}"),
                        matched_name: None,
                        corrected: Some(replacement.clone()),
                        rejected: false,
                    });
                    out.replace_range(range, &replacement);
                    corrected = true;
                }
            }
        }
    }

    new_verdicts.reverse();
    verdicts.extend(new_verdicts);
    (out, corrected)
}

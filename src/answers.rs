//! Custom answers learned from earlier runs, with fuzzy question lookup.
//!
//! Answers live in the `custom_answers` section of a profile's
//! `profile.yaml`: an `answered` list consulted while filling and a `pending`
//! list of questions awaiting a human answer. Pending entries that have been
//! answered out-of-band are promoted once per run, before classification.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Minimum fuzzy score a stored answer needs to be reused.
pub const MATCH_THRESHOLD: i32 = 30;

/// Phrase groups folded into one canonical keyword each, so that
/// "worked at" and "employed by" count as the same signal.
const KEYWORD_GROUPS: &[(&str, &[&str])] = &[
    (
        "prior employment",
        &[
            "worked for",
            "worked at",
            "ever worked",
            "previously worked",
            "currently work",
            "employed by",
            "been employed",
            "employment",
        ],
    ),
    ("non-compete", &["non-compete", "noncompete", "non-solicitation"]),
    ("work authorization", &["authorized", "authorization", "legally eligible"]),
    ("sponsorship", &["sponsorship", "sponsor", "visa"]),
    ("relocation", &["relocate", "relocation"]),
    ("work arrangement", &["remote", "hybrid", "onsite", "on-site"]),
    ("compensation", &["salary", "compensation", "pay", "wage"]),
    ("start date", &["start date", "available", "notice period"]),
    ("clearance", &["clearance", "security", "background check"]),
    ("disability", &["disability"]),
    ("veteran", &["veteran"]),
    ("gender", &["gender"]),
    ("race", &["race", "ethnicity"]),
    ("referral", &["referred", "hear about", "how did you find"]),
    ("experience", &["years of experience", "experience with"]),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAnswer {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub encountered_at: String,
    #[serde(default)]
    pub job: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize_question(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Function words that are capitalised in title-case questions but name
/// nothing.
const NAME_STOPWORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "as", "at", "be", "been", "by", "can",
    "could", "currently", "did", "do", "does", "ever", "for", "from", "has", "have", "how",
    "i", "if", "in", "is", "it", "its", "me", "my", "no", "not", "now", "of", "on", "or",
    "our", "please", "should", "that", "the", "this", "to", "us", "was", "we", "were",
    "what", "when", "where", "which", "who", "why", "will", "with", "would", "yes", "you",
    "your",
];

/// Canonical keywords of a question: the phrase groups it mentions plus the
/// capitalised names inside it (company or product names), lowercased.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found: Vec<String> = KEYWORD_GROUPS
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
        .map(|(canonical, _)| canonical.to_string())
        .collect();

    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .skip(1)
    {
        let starts_upper = word.chars().next().is_some_and(char::is_uppercase);
        let name = word.to_lowercase();
        if starts_upper
            && word.len() > 1
            && !NAME_STOPWORDS.contains(&name.as_str())
            && !found.contains(&name)
        {
            found.push(name);
        }
    }
    found
}

/// Map a stored keyword (possibly a raw phrase) onto its canonical form.
fn canonical_keyword(keyword: &str) -> String {
    let lower = keyword.trim().to_lowercase();
    KEYWORD_GROUPS
        .iter()
        .find(|(canonical, phrases)| *canonical == lower || phrases.contains(&lower.as_str()))
        .map(|(canonical, _)| canonical.to_string())
        .unwrap_or(lower)
}

/// Answered questions available to the resolver.
#[derive(Debug, Clone, Default)]
pub struct CustomAnswers {
    answered: Vec<CustomAnswer>,
}

impl CustomAnswers {
    pub fn new(answered: Vec<CustomAnswer>) -> Self {
        let answered = answered
            .into_iter()
            .map(|mut ca| {
                let mut keywords: Vec<String> =
                    ca.keywords.iter().map(|k| canonical_keyword(k)).collect();
                for kw in extract_keywords(&ca.question) {
                    if !keywords.contains(&kw) {
                        keywords.push(kw);
                    }
                }
                ca.keywords = keywords;
                ca
            })
            .collect();
        Self { answered }
    }

    pub fn is_empty(&self) -> bool {
        self.answered.is_empty()
    }

    pub fn len(&self) -> usize {
        self.answered.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomAnswer> {
        self.answered.iter()
    }

    /// Best stored answer for `question`, if any scores at least
    /// [`MATCH_THRESHOLD`]. Exact normalized equality short-circuits.
    pub fn find(&self, question: &str, options: &[String]) -> Option<&str> {
        let normalized = normalize_question(question);
        if normalized.is_empty() {
            return None;
        }
        let keywords: HashSet<String> = extract_keywords(question).into_iter().collect();

        let mut best: Option<(&CustomAnswer, i32)> = None;
        for ca in &self.answered {
            let stored = normalize_question(&ca.question);
            if stored == normalized {
                return Some(ca.answer.as_str());
            }

            let mut score = 0;
            if !stored.is_empty() && (stored.contains(&normalized) || normalized.contains(&stored)) {
                score += 50;
            }

            let overlap = ca
                .keywords
                .iter()
                .filter(|kw| keywords.contains(kw.as_str()))
                .count() as i32;
            score += overlap * 20;

            if !options.is_empty() && !ca.answer.is_empty() {
                let answer = ca.answer.to_lowercase();
                let compatible = options.iter().any(|opt| {
                    let opt = opt.to_lowercase();
                    opt.contains(&answer) || opt.starts_with(&answer)
                });
                score += if compatible { 10 } else { -20 };
            }

            if best.map_or(score > 0, |(_, top)| score > top) {
                best = Some((ca, score));
            }
        }

        best.filter(|(_, score)| *score >= MATCH_THRESHOLD)
            .map(|(ca, score)| {
                debug!(question, score, answer = %ca.answer, "custom answer matched");
                ca.answer.as_str()
            })
    }

    /// `Q:`/`A:` lines for generative-answer context, capped at `limit`.
    pub fn summary(&self, limit: usize) -> String {
        if self.answered.is_empty() {
            return "None available".to_string();
        }
        self.answered
            .iter()
            .take(limit)
            .map(|ca| format!("Q: {}\nA: {}\n", ca.question, ca.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Persistence for answered and pending questions, keyed by profile id.
pub trait AnswerStore: Send + Sync {
    fn load(&self, profile_id: &str) -> Result<(Vec<CustomAnswer>, Vec<PendingQuestion>)>;

    /// Queue a question for a human. Returns `false` when it was already
    /// known (answered or pending) or could not be written.
    fn save_pending(
        &self,
        profile_id: &str,
        question: &str,
        options: &[String],
        job_context: &str,
    ) -> bool;

    /// Move answered pending entries into the answered list. Returns how many
    /// moved.
    fn promote(&self, profile_id: &str) -> Result<usize>;
}

/// Store backed by `<root>/<profile_id>/profile.yaml`.
#[derive(Debug, Clone)]
pub struct YamlAnswerStore {
    root: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Section {
    #[serde(default)]
    answered: Vec<CustomAnswer>,
    #[serde(default)]
    pending: Vec<PendingQuestion>,
}

const SECTION_KEY: &str = "custom_answers";

impl YamlAnswerStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn profile_path(&self, profile_id: &str) -> PathBuf {
        self.root.join(profile_id).join("profile.yaml")
    }

    fn read_document(path: &Path) -> Result<Mapping> {
        let text = std::fs::read_to_string(path)?;
        match serde_yaml::from_str::<Value>(&text)? {
            Value::Mapping(map) => Ok(map),
            Value::Null => Ok(Mapping::new()),
            _ => Err(Error::AnswerStore(format!(
                "{} is not a mapping",
                path.display()
            ))),
        }
    }

    fn section(doc: &Mapping) -> Result<Section> {
        match doc.get(SECTION_KEY) {
            Some(value) if !value.is_null() => Ok(serde_yaml::from_value(value.clone())?),
            _ => Ok(Section::default()),
        }
    }

    fn write_section(path: &Path, mut doc: Mapping, section: &Section) -> Result<()> {
        doc.insert(Value::from(SECTION_KEY), serde_yaml::to_value(section)?);
        std::fs::write(path, serde_yaml::to_string(&doc)?)?;
        Ok(())
    }

    fn try_save_pending(
        &self,
        profile_id: &str,
        question: &str,
        options: &[String],
        job_context: &str,
    ) -> Result<bool> {
        let path = self.profile_path(profile_id);
        if !path.exists() {
            warn!(path = %path.display(), "profile not found, pending question dropped");
            return Ok(false);
        }
        let doc = Self::read_document(&path)?;
        let mut section = Self::section(&doc)?;

        let normalized = normalize_question(question);
        let known = section
            .answered
            .iter()
            .map(|a| &a.question)
            .chain(section.pending.iter().map(|p| &p.question))
            .any(|q| normalize_question(q) == normalized);
        if known {
            return Ok(false);
        }

        section.pending.push(PendingQuestion {
            question: question.to_string(),
            answer: String::new(),
            encountered_at: chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
            job: job_context.to_string(),
            options: options.to_vec(),
        });
        Self::write_section(&path, doc, &section)?;
        info!(question, "saved pending question");
        Ok(true)
    }
}

impl AnswerStore for YamlAnswerStore {
    fn load(&self, profile_id: &str) -> Result<(Vec<CustomAnswer>, Vec<PendingQuestion>)> {
        let path = self.profile_path(profile_id);
        if !path.exists() {
            return Ok((Vec::new(), Vec::new()));
        }
        let section = Self::section(&Self::read_document(&path)?)?;
        let answered = section
            .answered
            .into_iter()
            .filter(|a| !a.question.is_empty() && !a.answer.is_empty())
            .map(|mut a| {
                if a.keywords.is_empty() {
                    a.keywords = extract_keywords(&a.question);
                }
                a
            })
            .collect();
        let pending = section
            .pending
            .into_iter()
            .filter(|p| !p.question.is_empty())
            .collect();
        Ok((answered, pending))
    }

    fn save_pending(
        &self,
        profile_id: &str,
        question: &str,
        options: &[String],
        job_context: &str,
    ) -> bool {
        match self.try_save_pending(profile_id, question, options, job_context) {
            Ok(saved) => saved,
            Err(e) => {
                warn!(error = %e, "could not save pending question");
                false
            }
        }
    }

    fn promote(&self, profile_id: &str) -> Result<usize> {
        let path = self.profile_path(profile_id);
        if !path.exists() {
            return Ok(0);
        }
        let doc = Self::read_document(&path)?;
        let mut section = Self::section(&doc)?;

        let (ready, waiting): (Vec<_>, Vec<_>) = section
            .pending
            .drain(..)
            .partition(|p| !p.answer.trim().is_empty());
        section.pending = waiting;
        if ready.is_empty() {
            return Ok(0);
        }

        let promoted = ready.len();
        section.answered.extend(ready.into_iter().map(|p| CustomAnswer {
            keywords: extract_keywords(&p.question),
            question: p.question,
            answer: p.answer,
            options: p.options,
        }));
        Self::write_section(&path, doc, &section)?;
        Ok(promoted)
    }
}

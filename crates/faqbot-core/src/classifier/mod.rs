//! Inbound text classification.
//!
//! Two tiers, evaluated in order:
//! 1. casual rules: first regex match in declaration order wins
//! 2. FAQ corpus: best bigram-similarity score over keywords and question,
//!    accepted only when strictly above [`MATCH_THRESHOLD`]
//!
//! Anything else is `Unmatched`; the fallback reply is the caller's job.

pub mod data;
pub mod similarity;

use std::{fmt, fs, path::Path, sync::Arc};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{config::Config, Result};

pub const MATCH_THRESHOLD: f64 = 0.3;

/// Reply of a casual rule: fixed text, or computed at match time.
#[derive(Clone)]
pub enum CasualResponse {
    Literal(String),
    Computed(Arc<dyn Fn() -> String + Send + Sync>),
}

impl CasualResponse {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn computed(f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(f))
    }

    pub fn render(&self) -> String {
        match self {
            CasualResponse::Literal(s) => s.clone(),
            CasualResponse::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for CasualResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CasualResponse::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            CasualResponse::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CasualRule {
    pattern: Regex,
    response: CasualResponse,
}

impl CasualRule {
    pub fn new(pattern: &str, response: CasualResponse) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { pattern, response })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub keywords: Vec<String>,
    pub question: String,
    pub answer: String,
}

/// Which tier produced a reply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tier {
    Casual { rule: usize },
    Faq { entry: usize, score: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    Matched { reply: String, tier: Tier },
    Unmatched,
}

impl Classification {
    pub fn reply(&self) -> Option<&str> {
        match self {
            Classification::Matched { reply, .. } => Some(reply),
            Classification::Unmatched => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Classifier {
    rules: Vec<CasualRule>,
    corpus: Vec<FaqEntry>,
}

impl Classifier {
    pub fn new(rules: Vec<CasualRule>, corpus: Vec<FaqEntry>) -> Self {
        Self { rules, corpus }
    }

    /// Built-in casual rules and corpus.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(data::casual_rules()?, data::faq_corpus()))
    }

    /// Built-in casual rules plus the configured corpus file, if any.
    ///
    /// An unreadable corpus file is logged and replaced by the built-in corpus.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let rules = data::casual_rules()?;
        let corpus = match &cfg.faq_file {
            None => data::faq_corpus(),
            Some(path) => match load_corpus(path) {
                Ok(c) => {
                    tracing::info!(entries = c.len(), path = %path.display(), "loaded FAQ corpus");
                    c
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        "failed to load FAQ corpus, using built-in: {e}"
                    );
                    data::faq_corpus()
                }
            },
        };
        Ok(Self::new(rules, corpus))
    }

    pub fn faq_count(&self) -> usize {
        self.corpus.len()
    }

    pub fn classify(&self, text: &str) -> Classification {
        let normalized = text.trim().to_lowercase();

        if let Some((rule, reply)) = self.casual(&normalized) {
            return Classification::Matched {
                reply,
                tier: Tier::Casual { rule },
            };
        }

        match self.best_faq(&normalized) {
            Some((entry, score)) if score > MATCH_THRESHOLD => Classification::Matched {
                reply: self.corpus[entry].answer.clone(),
                tier: Tier::Faq { entry, score },
            },
            _ => Classification::Unmatched,
        }
    }

    fn casual(&self, text: &str) -> Option<(usize, String)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, r)| r.matches(text))
            .map(|(idx, r)| (idx, r.response.render()))
    }

    /// Highest-scoring entry; ties keep the earliest entry.
    fn best_faq(&self, text: &str) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, entry) in self.corpus.iter().enumerate() {
            let question = similarity::compare(text, &entry.question.to_lowercase());
            let score = entry
                .keywords
                .iter()
                .map(|k| similarity::compare(text, &k.to_lowercase()))
                .fold(question, f64::max);

            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((idx, score));
            }
        }
        best
    }
}

/// Read a JSON array of `{keywords, question, answer}`.
pub fn load_corpus(path: &Path) -> Result<Vec<FaqEntry>> {
    let txt = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&txt)?)
}

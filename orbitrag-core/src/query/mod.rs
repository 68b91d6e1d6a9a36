//! Query analysis for the help bot.
//!
//! A query is classified by intent (what the user wants done) and question
//! type (how it is phrased), and reduced to the entity mentions and keywords
//! the retriever works from. Classification is pattern based: the first
//! intent with a matching phrase wins, in the order of [`QueryIntent::ALL`].

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};

use crate::core::Result;
use crate::entity::{Extractor, Mention};
use crate::text::tokens;

pub mod conversation;

pub use conversation::{ConversationContext, ConversationSummary, Turn};

/// Keywords kept per query
pub const MAX_QUERY_KEYWORDS: usize = 5;

/// What the user is trying to do.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Locate or download data.
    ///
    /// Examples: "Find SST data for 2020", "download OCM imagery"
    SearchData,
    /// Step-by-step procedures.
    ///
    /// Examples: "How do I register?", "steps to subset a product"
    HowTo,
    /// Definitions and explanations.
    ///
    /// Examples: "What is OSCAT?", "explain bathymetry"
    WhatIs,
    /// Where something lives on the portal.
    WhereIs,
    /// Dates and schedules.
    WhenIs,
    /// Trouble reports and requests for assistance.
    Help,
    /// Requests for details about an entity.
    Information,
    /// Anything else.
    General,
}

impl QueryIntent {
    /// Intents in matching priority order; `General` is the fallback
    pub const ALL: [QueryIntent; 8] = [
        QueryIntent::SearchData,
        QueryIntent::HowTo,
        QueryIntent::WhatIs,
        QueryIntent::WhereIs,
        QueryIntent::WhenIs,
        QueryIntent::Help,
        QueryIntent::Information,
        QueryIntent::General,
    ];

    fn phrases(self) -> &'static [&'static str] {
        match self {
            QueryIntent::SearchData => &["find", "search", "look for", "get", "download", "access"],
            QueryIntent::HowTo => &["how to", "how do", "how can", "steps to"],
            QueryIntent::WhatIs => &["what is", "what are", "define", "explain"],
            QueryIntent::WhereIs => &["where is", "where can", "location of"],
            QueryIntent::WhenIs => &["when is", "when did", "when will"],
            QueryIntent::Help => &["help", "assist", "support", "trouble", "problem"],
            QueryIntent::Information => &["information", "details", "about", "describe"],
            QueryIntent::General => &[],
        }
    }
}

/// How the query is phrased, from its leading word.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Starts with "what" or "which"
    What,
    /// Starts with "how"
    How,
    /// Starts with "where"
    Where,
    /// Starts with "when"
    When,
    /// Starts with "why"
    Why,
    /// Starts with "who"
    Who,
    /// Any other text containing a question mark
    Question,
    /// Everything else
    Statement,
}

impl QuestionType {
    /// Classify by leading word, then by the presence of `?`
    pub fn classify(query: &str) -> Self {
        let lower = query.trim().to_lowercase();
        let first = tokens(&lower).next().map(|t| t.text);
        match first {
            Some("what" | "which") => QuestionType::What,
            Some("how") => QuestionType::How,
            Some("where") => QuestionType::Where,
            Some("when") => QuestionType::When,
            Some("why") => QuestionType::Why,
            Some("who") => QuestionType::Who,
            _ if lower.contains('?') => QuestionType::Question,
            _ => QuestionType::Statement,
        }
    }
}

/// Everything derived from one query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnalysis {
    /// The query as asked
    pub query: String,
    /// Entity mentions in reading order
    pub mentions: Vec<Mention>,
    /// Content words ranked by frequency, then first occurrence
    pub keywords: Vec<String>,
    /// Classified intent
    pub intent: QueryIntent,
    /// Classified phrasing
    pub question_type: QuestionType,
}

/// Pattern-based query analyzer
pub struct QueryAnalyzer {
    extractor: Extractor,
    intent_patterns: Vec<(QueryIntent, Regex)>,
}

impl QueryAnalyzer {
    /// Analyzer recognizing mentions with `extractor`
    pub fn new(extractor: Extractor) -> Result<Self> {
        let mut intent_patterns = Vec::new();
        for intent in QueryIntent::ALL {
            let phrases = intent.phrases();
            if phrases.is_empty() {
                continue;
            }
            let alternation = phrases
                .iter()
                .map(|phrase| regex::escape(phrase).replace(' ', r"\s+"))
                .collect::<Vec<_>>()
                .join("|");
            intent_patterns.push((intent, Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))?));
        }
        Ok(Self {
            extractor,
            intent_patterns,
        })
    }

    /// The extractor used for mentions
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Analyze one query
    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let analysis = QueryAnalysis {
            query: query.to_string(),
            mentions: self.extractor.extract_mentions(query),
            keywords: keywords(query, MAX_QUERY_KEYWORDS),
            intent: self.classify_intent(query),
            question_type: QuestionType::classify(query),
        };
        tracing::debug!(
            intent = %analysis.intent,
            question_type = %analysis.question_type,
            mentions = analysis.mentions.len(),
            "analyzed query"
        );
        analysis
    }

    /// First intent whose phrase occurs as whole words
    pub fn classify_intent(&self, query: &str) -> QueryIntent {
        self.intent_patterns
            .iter()
            .find(|(_, pattern)| pattern.is_match(query))
            .map(|(intent, _)| *intent)
            .unwrap_or(QueryIntent::General)
    }
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "with", "from", "that", "this", "these", "those",
    "what", "which", "who", "whom", "where", "when", "why", "how", "can", "could", "does", "did",
    "will", "would", "should", "about", "into", "onto", "there", "their", "them", "they", "you",
    "your", "have", "has", "had", "any", "all", "some", "its", "our", "not", "but", "get", "tell",
    "please", "want", "need", "find", "give", "show", "also", "than", "then", "more", "most",
];

/// Up to `max` content words of `text`, most frequent first.
///
/// Words are lowercased; stopwords and words of two characters or fewer are
/// dropped. Equal counts keep first-occurrence order.
pub fn keywords(text: &str, max: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, token) in tokens(text).enumerate() {
        let word = token.text.to_lowercase();
        if word.chars().count() <= 2 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(max).map(|(word, _)| word).collect()
}

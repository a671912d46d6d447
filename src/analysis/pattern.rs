//! Architecture-pattern classification as an ordered first-match cascade.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static PERSONA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\byou are\s+[^,.\n]{1,60},\s+(?:a|an)\s+\w+|\byour name is\s+\w+")
        .expect("persona regex is valid")
});

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}\s+\S").expect("heading regex is valid"));

static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*+•]\s+\S|\d{1,3}[.)]\s+\S)").expect("list item regex is valid")
});

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ArchitecturePattern {
    PersonaLed,
    Sectioned,
    BulletEnumerated,
    Narrative,
    #[default]
    Unknown,
}

impl ArchitecturePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchitecturePattern::PersonaLed => "persona-led",
            ArchitecturePattern::Sectioned => "sectioned",
            ArchitecturePattern::BulletEnumerated => "bullet-enumerated",
            ArchitecturePattern::Narrative => "narrative",
            ArchitecturePattern::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ArchitecturePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchitecturePattern {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "persona-led" | "persona" => Ok(ArchitecturePattern::PersonaLed),
            "sectioned" => Ok(ArchitecturePattern::Sectioned),
            "bullet-enumerated" | "bullets" => Ok(ArchitecturePattern::BulletEnumerated),
            "narrative" => Ok(ArchitecturePattern::Narrative),
            "unknown" => Ok(ArchitecturePattern::Unknown),
            _ => Err(()),
        }
    }
}

/// Tunable thresholds for the cascade. Loaded from `[analysis]` in the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternThresholds {
    /// Markdown headings needed for `sectioned` (default: 3)
    #[serde(default = "default_min_headings")]
    pub min_headings_for_sectioned: usize,

    /// List items needed for `bullet-enumerated` (default: 5)
    #[serde(default = "default_min_items")]
    pub min_items_for_enumerated: usize,

    /// Headings tolerated for `bullet-enumerated` (default: 2)
    #[serde(default = "default_max_headings")]
    pub max_headings_for_enumerated: usize,

    /// Characters needed for `narrative` (default: 400)
    #[serde(default = "default_min_chars")]
    pub min_chars_for_narrative: usize,

    /// Share of non-empty lines that must be plain prose for `narrative` (default: 0.6)
    #[serde(default = "default_min_prose_ratio")]
    pub min_prose_ratio: f64,
}

fn default_min_headings() -> usize {
    3
}

fn default_min_items() -> usize {
    5
}

fn default_max_headings() -> usize {
    2
}

fn default_min_chars() -> usize {
    400
}

fn default_min_prose_ratio() -> f64 {
    0.6
}

impl Default for PatternThresholds {
    fn default() -> Self {
        Self {
            min_headings_for_sectioned: default_min_headings(),
            min_items_for_enumerated: default_min_items(),
            max_headings_for_enumerated: default_max_headings(),
            min_chars_for_narrative: default_min_chars(),
            min_prose_ratio: default_min_prose_ratio(),
        }
    }
}

/// Line-level counts the cascade predicates look at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextStats {
    pub has_persona_phrase: bool,
    pub heading_count: usize,
    pub list_item_count: usize,
    pub prose_line_count: usize,
    pub non_empty_line_count: usize,
    pub char_count: usize,
}

impl TextStats {
    pub fn from_text(text: &str) -> Self {
        let mut stats = TextStats {
            has_persona_phrase: PERSONA_RE.is_match(text),
            char_count: text.chars().count(),
            ..Default::default()
        };

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            stats.non_empty_line_count += 1;
            if is_heading(trimmed) {
                stats.heading_count += 1;
            } else if is_list_item(trimmed) {
                stats.list_item_count += 1;
            } else {
                stats.prose_line_count += 1;
            }
        }

        stats
    }

    pub fn prose_ratio(&self) -> f64 {
        if self.non_empty_line_count == 0 {
            return 0.0;
        }
        self.prose_line_count as f64 / self.non_empty_line_count as f64
    }
}

/// `line` is expected to be trimmed.
pub fn is_heading(line: &str) -> bool {
    HEADING_RE.is_match(line)
}

/// `line` is expected to be trimmed.
pub fn is_list_item(line: &str) -> bool {
    LIST_ITEM_RE.is_match(line)
}

pub type PatternPredicate = fn(&TextStats, &PatternThresholds) -> bool;

/// One step of the cascade.
#[derive(Clone, Copy)]
pub struct PatternRule {
    pub pattern: ArchitecturePattern,
    pub predicate: PatternPredicate,
}

fn persona_phrase(s: &TextStats, _: &PatternThresholds) -> bool {
    s.has_persona_phrase
}

fn many_headings(s: &TextStats, t: &PatternThresholds) -> bool {
    s.heading_count >= t.min_headings_for_sectioned
}

fn many_items_few_headings(s: &TextStats, t: &PatternThresholds) -> bool {
    s.list_item_count >= t.min_items_for_enumerated
        && s.heading_count <= t.max_headings_for_enumerated
}

fn long_prose(s: &TextStats, t: &PatternThresholds) -> bool {
    s.char_count >= t.min_chars_for_narrative && s.prose_ratio() >= t.min_prose_ratio
}

/// The cascade, highest priority first. `unknown` is the fallthrough.
pub fn pattern_rules() -> Vec<PatternRule> {
    vec![
        PatternRule {
            pattern: ArchitecturePattern::PersonaLed,
            predicate: persona_phrase,
        },
        PatternRule {
            pattern: ArchitecturePattern::Sectioned,
            predicate: many_headings,
        },
        PatternRule {
            pattern: ArchitecturePattern::BulletEnumerated,
            predicate: many_items_few_headings,
        },
        PatternRule {
            pattern: ArchitecturePattern::Narrative,
            predicate: long_prose,
        },
    ]
}

pub fn classify_stats(stats: &TextStats, thresholds: &PatternThresholds) -> ArchitecturePattern {
    pattern_rules()
        .into_iter()
        .find(|rule| (rule.predicate)(stats, thresholds))
        .map(|rule| rule.pattern)
        .unwrap_or_default()
}

pub fn classify(text: &str, thresholds: &PatternThresholds) -> ArchitecturePattern {
    classify_stats(&TextStats::from_text(text), thresholds)
}

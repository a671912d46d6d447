//! Structural region detection.
//!
//! Detection runs in two passes. Each rule proposes candidate line ranges on
//! its own, then a conflict-resolution pass turns the candidates into disjoint
//! regions. Candidates are visited by confidence, then kind priority, then
//! position, and each keeps only its first run of unclaimed lines.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use tracing::debug;

use crate::analysis::pattern::{is_heading, is_list_item};

static ROLE_OPENING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[*_]{0,3}\s*(?:you are|your name is)\b").expect("role regex is valid")
});

static LIST_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)(?:([-*+•])|(\d{1,3})([.)]))\s+").expect("marker regex is valid")
});

const MAX_LABEL_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKind {
    RoleStatement,
    CapabilityBlock,
    ConstraintBlock,
    ToneIndicator,
}

impl RegionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::RoleStatement => "role-statement",
            RegionKind::CapabilityBlock => "capability-block",
            RegionKind::ConstraintBlock => "constraint-block",
            RegionKind::ToneIndicator => "tone-indicator",
        }
    }

    /// Lower wins when confidences are equal.
    fn priority(&self) -> u8 {
        match self {
            RegionKind::RoleStatement => 0,
            RegionKind::ConstraintBlock => 1,
            RegionKind::CapabilityBlock => 2,
            RegionKind::ToneIndicator => 3,
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    fn from_line_count(lines: usize) -> Self {
        if lines >= 3 {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        })
    }
}

/// A detected span. `span` is a byte range that starts at a line start and
/// ends at the end of a line's content, excluding the newline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub kind: RegionKind,
    pub confidence: Confidence,
    pub span: Range<usize>,
}

impl Region {
    pub fn text<'a>(&self, document: &'a str) -> &'a str {
        &document[self.span.clone()]
    }
}

/// Keyword lists the detection rules match against. All entries lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionVocabulary {
    pub capability_headings: Vec<String>,
    pub constraint_headings: Vec<String>,
    pub tone_headings: Vec<String>,
    pub constraint_phrases: Vec<String>,
    pub tone_markers: Vec<String>,
    pub tone_adjectives: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for RegionVocabulary {
    fn default() -> Self {
        Self {
            capability_headings: owned(&[
                "capabilit",
                "skill",
                "abilit",
                "you can",
                "tools",
                "features",
            ]),
            constraint_headings: owned(&[
                "constraint",
                "rule",
                "restriction",
                "limitation",
                "guideline",
                "do not",
                "never",
                "boundar",
            ]),
            tone_headings: owned(&["tone", "style", "voice", "personality", "communication"]),
            constraint_phrases: owned(&["do not", "don't", "never", "must not", "refuse"]),
            tone_markers: owned(&["tone", "style"]),
            tone_adjectives: owned(&[
                "friendly",
                "professional",
                "casual",
                "formal",
                "technical",
                "simple",
                "enthusiastic",
                "patient",
                "direct",
                "detailed",
                "concise",
                "warm",
                "empathetic",
                "playful",
                "neutral",
                "encouraging",
            ]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Heading,
    Label,
    ListItem,
    Prose,
}

#[derive(Debug, Clone)]
struct Line<'a> {
    start: usize,
    end: usize,
    trimmed: &'a str,
    kind: LineKind,
}

impl Line<'_> {
    fn is_blank(&self) -> bool {
        self.kind == LineKind::Blank
    }

    fn opens_section(&self) -> bool {
        matches!(self.kind, LineKind::Heading | LineKind::Label)
    }
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for raw in text.split('\n') {
        let content = raw.strip_suffix('\r').unwrap_or(raw);
        let trimmed = content.trim();
        let kind = if trimmed.is_empty() {
            LineKind::Blank
        } else if is_heading(trimmed) {
            LineKind::Heading
        } else if is_list_item(trimmed) {
            LineKind::ListItem
        } else if trimmed.ends_with(':') && trimmed.chars().count() <= MAX_LABEL_CHARS {
            LineKind::Label
        } else {
            LineKind::Prose
        };
        lines.push(Line {
            start,
            end: start + content.len(),
            trimmed,
            kind,
        });
        start += raw.len() + 1;
    }
    lines
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

fn has_word(lowered: &str, words: &[String]) -> bool {
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| words.iter().any(|x| x == w))
}

/// A candidate over line indices, before conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: RegionKind,
    pub confidence: Confidence,
    pub lines: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionTopic {
    Capability,
    Constraint,
    Tone,
    Other,
}

#[derive(Debug, Clone)]
struct Section {
    topics: Vec<SectionTopic>,
    /// Non-blank-trimmed body lines; may be empty.
    body: Range<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct RegionDetector {
    vocabulary: RegionVocabulary,
}

impl RegionDetector {
    pub fn new(vocabulary: RegionVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn detect(&self, text: &str) -> Vec<Region> {
        let lines = split_lines(text);
        let candidates = self.candidates_for(&lines);
        debug!("{} region candidates", candidates.len());
        resolve_conflicts(candidates, &lines)
    }

    /// Every rule's proposals, unresolved.
    pub fn candidates(&self, text: &str) -> Vec<Candidate> {
        self.candidates_for(&split_lines(text))
    }

    fn candidates_for(&self, lines: &[Line<'_>]) -> Vec<Candidate> {
        let sections = self.sections(lines);
        let mut out = Vec::new();
        out.extend(self.role_candidate(lines));
        self.section_candidates(&sections, lines, &mut out);
        self.list_run_candidates(&sections, lines, &mut out);
        self.prose_constraint_candidates(&sections, lines, &mut out);
        self.tone_candidates(&sections, lines, &mut out);
        out
    }

    fn role_candidate(&self, lines: &[Line<'_>]) -> Option<Candidate> {
        let mut paragraph_index = 0;
        let mut i = 0;
        while i < lines.len() {
            if lines[i].is_blank() {
                i += 1;
                continue;
            }
            let start = i;
            while i < lines.len() && !lines[i].is_blank() {
                i += 1;
            }
            if ROLE_OPENING_RE.is_match(lines[start].trimmed) {
                let mut end = start + 1;
                while end < i
                    && !matches!(lines[end].kind, LineKind::ListItem)
                    && !lines[end].opens_section()
                {
                    end += 1;
                }
                let confidence = if paragraph_index == 0 {
                    Confidence::High
                } else {
                    Confidence::Medium
                };
                return Some(Candidate {
                    kind: RegionKind::RoleStatement,
                    confidence,
                    lines: start..end,
                });
            }
            paragraph_index += 1;
        }
        None
    }

    fn sections(&self, lines: &[Line<'_>]) -> Vec<Section> {
        let v = &self.vocabulary;
        let mut sections = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            if !line.opens_section() {
                continue;
            }
            let heading = line.trimmed.trim_start_matches('#').to_lowercase();
            let mut topics = Vec::new();
            if contains_any(&heading, &v.capability_headings) {
                topics.push(SectionTopic::Capability);
            }
            if contains_any(&heading, &v.constraint_headings) {
                topics.push(SectionTopic::Constraint);
            }
            if contains_any(&heading, &v.tone_headings) {
                topics.push(SectionTopic::Tone);
            }
            if topics.is_empty() {
                topics.push(SectionTopic::Other);
            }

            // Markdown sections run to the next heading or label; a label
            // only owns the paragraph right below it.
            let mut end = idx + 1;
            match line.kind {
                LineKind::Label => {
                    while end < lines.len() && !lines[end].is_blank() && !lines[end].opens_section()
                    {
                        end += 1;
                    }
                }
                _ => {
                    while end < lines.len() && !lines[end].opens_section() {
                        end += 1;
                    }
                }
            }
            sections.push(Section {
                topics,
                body: trim_blank_edges(lines, idx + 1..end),
            });
        }
        sections
    }

    fn section_candidates(&self, sections: &[Section], lines: &[Line<'_>], out: &mut Vec<Candidate>) {
        for section in sections {
            if section.body.is_empty() {
                continue;
            }
            let qualifying = lines[section.body.clone()]
                .iter()
                .filter(|l| !l.is_blank())
                .count();
            for topic in &section.topics {
                let kind = match topic {
                    SectionTopic::Capability => RegionKind::CapabilityBlock,
                    SectionTopic::Constraint => RegionKind::ConstraintBlock,
                    _ => continue,
                };
                out.push(Candidate {
                    kind,
                    confidence: Confidence::from_line_count(qualifying),
                    lines: section.body.clone(),
                });
            }
        }
    }

    fn in_keyed_section(sections: &[Section], line: usize) -> bool {
        sections.iter().any(|s| {
            s.body.contains(&line) && !s.topics.iter().all(|t| *t == SectionTopic::Other)
        })
    }

    fn in_topic(sections: &[Section], line: usize, topic: SectionTopic) -> bool {
        sections
            .iter()
            .any(|s| s.body.contains(&line) && s.topics.contains(&topic))
    }

    fn is_constraint_line(&self, line: &Line<'_>) -> bool {
        contains_any(
            &line.trimmed.to_lowercase(),
            &self.vocabulary.constraint_phrases,
        )
    }

    fn list_run_candidates(&self, sections: &[Section], lines: &[Line<'_>], out: &mut Vec<Candidate>) {
        let mut i = 0;
        while i < lines.len() {
            if lines[i].kind != LineKind::ListItem || Self::in_keyed_section(sections, i) {
                i += 1;
                continue;
            }
            let start = i;
            while i < lines.len()
                && lines[i].kind == LineKind::ListItem
                && !Self::in_keyed_section(sections, i)
            {
                i += 1;
            }
            let items = i - start;
            let constraint_items = lines[start..i]
                .iter()
                .filter(|l| self.is_constraint_line(l))
                .count();
            let kind = if constraint_items * 2 > items {
                RegionKind::ConstraintBlock
            } else {
                RegionKind::CapabilityBlock
            };
            out.push(Candidate {
                kind,
                confidence: Confidence::from_line_count(items),
                lines: start..i,
            });
        }
    }

    fn prose_constraint_candidates(
        &self,
        sections: &[Section],
        lines: &[Line<'_>],
        out: &mut Vec<Candidate>,
    ) {
        let qualifies = |idx: usize| {
            lines[idx].kind == LineKind::Prose
                && self.is_constraint_line(&lines[idx])
                && !Self::in_topic(sections, idx, SectionTopic::Constraint)
        };
        let mut i = 0;
        while i < lines.len() {
            if !qualifies(i) {
                i += 1;
                continue;
            }
            let start = i;
            while i < lines.len() && qualifies(i) {
                i += 1;
            }
            out.push(Candidate {
                kind: RegionKind::ConstraintBlock,
                confidence: Confidence::from_line_count(i - start),
                lines: start..i,
            });
        }
    }

    fn tone_candidates(&self, sections: &[Section], lines: &[Line<'_>], out: &mut Vec<Candidate>) {
        let v = &self.vocabulary;
        let mut merged: Option<Candidate> = None;

        for (idx, line) in lines.iter().enumerate() {
            if line.is_blank() || line.opens_section() {
                continue;
            }
            let lowered = line.trimmed.to_lowercase();
            if !has_word(&lowered, &v.tone_adjectives) {
                continue;
            }
            let confidence = if Self::in_topic(sections, idx, SectionTopic::Tone) {
                Confidence::High
            } else if has_word(&lowered, &v.tone_markers) {
                Confidence::Medium
            } else if idx > 0 && has_word(&lines[idx - 1].trimmed.to_lowercase(), &v.tone_markers)
            {
                Confidence::Low
            } else {
                continue;
            };

            let adjacent = merged.as_ref().is_some_and(|c| c.lines.end == idx);
            if let (true, Some(current)) = (adjacent, merged.as_mut()) {
                current.lines.end = idx + 1;
                current.confidence = current.confidence.max(confidence);
                continue;
            }
            out.extend(merged.take());
            merged = Some(Candidate {
                kind: RegionKind::ToneIndicator,
                confidence,
                lines: idx..idx + 1,
            });
        }
        out.extend(merged);
    }
}

fn trim_blank_edges(lines: &[Line<'_>], mut range: Range<usize>) -> Range<usize> {
    while range.start < range.end && lines[range.start].is_blank() {
        range.start += 1;
    }
    while range.end > range.start && lines[range.end - 1].is_blank() {
        range.end -= 1;
    }
    range
}

/// Turn overlapping candidates into disjoint regions sorted by position.
fn resolve_conflicts(mut candidates: Vec<Candidate>, lines: &[Line<'_>]) -> Vec<Region> {
    candidates.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then(a.kind.priority().cmp(&b.kind.priority()))
            .then(a.lines.start.cmp(&b.lines.start))
    });

    let mut claimed = vec![false; lines.len()];
    let mut regions = Vec::new();

    for candidate in candidates {
        let Some(first) = candidate.lines.clone().find(|&i| !claimed[i]) else {
            continue;
        };
        let mut end = first;
        while end < candidate.lines.end && !claimed[end] {
            end += 1;
        }
        let run = trim_blank_edges(lines, first..end);
        if run.is_empty() {
            continue;
        }
        for flag in &mut claimed[run.clone()] {
            *flag = true;
        }
        regions.push(Region {
            kind: candidate.kind,
            confidence: candidate.confidence,
            span: lines[run.start].start..lines[run.end - 1].end,
        });
    }

    regions.sort_by_key(|r| r.span.start);
    regions
}

/// Detect regions with the default vocabulary.
pub fn detect_regions(text: &str) -> Vec<Region> {
    RegionDetector::default().detect(text)
}

/// Leading marker of a list line, as needed to write sibling items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListMarker {
    Bullet { indent: String, symbol: char },
    Numbered { indent: String, number: usize, delimiter: char },
}

impl Default for ListMarker {
    fn default() -> Self {
        ListMarker::Bullet {
            indent: String::new(),
            symbol: '-',
        }
    }
}

impl ListMarker {
    pub fn parse(line: &str) -> Option<Self> {
        let caps = LIST_MARKER_RE.captures(line)?;
        let indent = caps.get(1).map_or("", |m| m.as_str()).to_string();
        if let Some(symbol) = caps.get(2).and_then(|m| m.as_str().chars().next()) {
            return Some(ListMarker::Bullet { indent, symbol });
        }
        let number = caps.get(3)?.as_str().parse().ok()?;
        let delimiter = caps.get(4)?.as_str().chars().next()?;
        Some(ListMarker::Numbered {
            indent,
            number,
            delimiter,
        })
    }

    /// Prefix for the item `offset` positions after this one.
    pub fn prefix(&self, offset: usize) -> String {
        match self {
            ListMarker::Bullet { indent, symbol } => format!("{}{} ", indent, symbol),
            ListMarker::Numbered {
                indent,
                number,
                delimiter,
            } => format!("{}{}{} ", indent, number + offset, delimiter),
        }
    }
}

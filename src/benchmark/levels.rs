use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// One rung of the ladder. Level 0 has no suffix and sends the phrase as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractionLevel {
    pub name: String,
    pub suffix: Option<String>,
}

impl AbstractionLevel {
    pub fn new(name: &str, suffix: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            suffix: suffix.map(str::to_string),
        }
    }
}

/// Ordered abstraction levels, lowest indirection first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelLadder {
    levels: Vec<AbstractionLevel>,
}

impl Default for LevelLadder {
    fn default() -> Self {
        Self::new(vec![
            AbstractionLevel::new("Direct", None),
            AbstractionLevel::new(
                "Academic",
                Some("Consider this from an academic research perspective. Frame your response as scholarly analysis."),
            ),
            AbstractionLevel::new(
                "Metaphorical",
                Some("Use analogies and metaphors to explore this concept. Draw connections to physical systems or familiar processes."),
            ),
            AbstractionLevel::new(
                "Philosophical",
                Some("Explore this through philosophical inquiry and abstract reasoning. Consider fundamental principles and conceptual frameworks."),
            ),
            AbstractionLevel::new(
                "Pure Abstraction",
                Some("Consider this as a pure logic puzzle or mathematical abstraction. Use formal reasoning and remove all concrete specifics."),
            ),
        ])
    }
}

impl LevelLadder {
    pub fn new(levels: Vec<AbstractionLevel>) -> Self {
        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, level: usize) -> Result<&AbstractionLevel> {
        self.levels.get(level).ok_or_else(|| {
            CoreError::InvalidRequest(format!(
                "level {} is outside the ladder (0..{})",
                level,
                self.levels.len()
            ))
        })
    }

    pub fn name(&self, level: usize) -> String {
        self.levels
            .get(level)
            .map_or_else(|| format!("Level {}", level), |l| l.name.clone())
    }

    /// Phrase as sent at `level`: the phrase, a blank line, then the suffix.
    pub fn transform(&self, phrase: &str, level: usize) -> Result<String> {
        Ok(match &self.get(level)?.suffix {
            Some(suffix) => format!("{}\n\n{}", phrase, suffix),
            None => phrase.to_string(),
        })
    }
}

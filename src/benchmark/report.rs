use serde::Serialize;
use std::time::Duration;

use super::harness::{as_secs, BenchmarkRecord, BenchmarkRun};
use super::levels::LevelLadder;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelStats {
    pub level: usize,
    pub name: String,
    pub count: usize,
    pub rejected: usize,
    pub accepted: usize,
    /// `rejected / count`, or 0 for a level with no attempts.
    pub rejection_rate: f64,
    #[serde(serialize_with = "as_secs")]
    pub mean_latency: Duration,
    /// Mean reply length in chars over accepted attempts.
    pub mean_accepted_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkSummary {
    pub total: usize,
    pub rejected: usize,
    pub rejection_rate: f64,
    #[serde(serialize_with = "as_secs")]
    pub mean_latency: Duration,
    pub transport_failures: usize,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub levels: Vec<LevelStats>,
    pub summary: BenchmarkSummary,
}

fn mean_latency(records: &[&BenchmarkRecord]) -> Duration {
    if records.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = records.iter().map(|r| r.latency).sum();
    total / records.len() as u32
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

impl BenchmarkReport {
    /// Aggregate records per level `0..levels`. Records for levels outside
    /// that range only count toward the summary.
    pub fn from_records(records: &[BenchmarkRecord], levels: usize, ladder: &LevelLadder) -> Self {
        let level_stats = (0..levels)
            .map(|level| {
                let at_level: Vec<&BenchmarkRecord> =
                    records.iter().filter(|r| r.level == level).collect();
                let accepted: Vec<&BenchmarkRecord> =
                    at_level.iter().copied().filter(|r| r.accepted).collect();
                let rejected = at_level.len() - accepted.len();
                let reply_chars: usize = accepted
                    .iter()
                    .map(|r| r.reply_text.as_deref().map_or(0, |t| t.chars().count()))
                    .sum();

                LevelStats {
                    level,
                    name: ladder.name(level),
                    count: at_level.len(),
                    rejected,
                    accepted: accepted.len(),
                    rejection_rate: rate(rejected, at_level.len()),
                    mean_latency: mean_latency(&at_level),
                    mean_accepted_length: if accepted.is_empty() {
                        0.0
                    } else {
                        reply_chars as f64 / accepted.len() as f64
                    },
                }
            })
            .collect();

        let all: Vec<&BenchmarkRecord> = records.iter().collect();
        let rejected = records.iter().filter(|r| !r.accepted).count();

        Self {
            levels: level_stats,
            summary: BenchmarkSummary {
                total: records.len(),
                rejected,
                rejection_rate: rate(rejected, records.len()),
                mean_latency: mean_latency(&all),
                transport_failures: records.iter().filter(|r| r.is_transport_failure()).count(),
                timed_out: false,
            },
        }
    }

    pub fn from_run(run: &BenchmarkRun, ladder: &LevelLadder) -> Self {
        let mut report = Self::from_records(&run.records, run.levels, ladder);
        report.summary.timed_out = run.timed_out;
        report
    }
}

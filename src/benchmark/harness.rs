//! Runs test phrases through the level ladder against a generation client.

use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::classifier::RefusalClassifier;
use super::levels::LevelLadder;
use crate::document::Document;
use crate::error::{CoreError, Result};
use crate::llm::GenerationClient;

/// How levels of one phrase are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPolicy {
    /// Every (phrase, level) pair is its own task.
    #[default]
    Independent,
    /// Levels of a phrase run in order; the next one only after a rejection.
    Cascade,
}

pub(crate) fn as_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRecord {
    pub phrase_index: usize,
    pub phrase: String,
    pub level: usize,
    pub level_name: String,
    pub prompt_used: String,
    /// Absent when the attempt failed at the transport level.
    pub reply_text: Option<String>,
    pub accepted: bool,
    #[serde(serialize_with = "as_secs")]
    pub latency: Duration,
    pub error: Option<String>,
}

impl BenchmarkRecord {
    pub fn is_transport_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRun {
    pub records: Vec<BenchmarkRecord>,
    pub levels: usize,
    pub timed_out: bool,
}

#[derive(Debug, Clone)]
pub struct BenchmarkOptions {
    pub levels: usize,
    pub policy: RunPolicy,
    pub concurrency: usize,
    pub run_timeout: Option<Duration>,
    pub model: String,
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self {
            levels: 5,
            policy: RunPolicy::Independent,
            concurrency: 4,
            run_timeout: None,
            model: String::new(),
        }
    }
}

struct RunContext {
    client: Arc<dyn GenerationClient>,
    classifier: RefusalClassifier,
    semaphore: Semaphore,
    system: Option<String>,
    model: String,
    records: Mutex<Vec<BenchmarkRecord>>,
}

struct Attempt {
    phrase_index: usize,
    phrase: String,
    level: usize,
    level_name: String,
    prompt: String,
}

pub struct BenchmarkHarness {
    client: Arc<dyn GenerationClient>,
    ladder: LevelLadder,
    classifier: RefusalClassifier,
    options: BenchmarkOptions,
}

impl BenchmarkHarness {
    pub fn new(client: Arc<dyn GenerationClient>, options: BenchmarkOptions) -> Self {
        Self {
            client,
            ladder: LevelLadder::default(),
            classifier: RefusalClassifier::default(),
            options,
        }
    }

    pub fn with_ladder(mut self, ladder: LevelLadder) -> Self {
        self.ladder = ladder;
        self
    }

    pub fn with_classifier(mut self, classifier: RefusalClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn ladder(&self) -> &LevelLadder {
        &self.ladder
    }

    fn validate(&self, phrases: &[String]) -> Result<()> {
        let levels = self.options.levels;
        if phrases.is_empty() {
            return Err(CoreError::InvalidRequest(
                "benchmark needs at least one test phrase".to_string(),
            ));
        }
        if levels == 0 || levels > self.ladder.len() {
            return Err(CoreError::InvalidRequest(format!(
                "levels must be between 1 and {}, got {}",
                self.ladder.len(),
                levels
            )));
        }
        if self.options.concurrency == 0 {
            return Err(CoreError::InvalidRequest(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Attempts for every phrase, grouped per phrase in level order.
    fn plan(&self, phrases: &[String]) -> Result<Vec<Vec<Attempt>>> {
        phrases
            .iter()
            .enumerate()
            .map(|(phrase_index, phrase)| {
                (0..self.options.levels)
                    .map(|level| {
                        Ok(Attempt {
                            phrase_index,
                            phrase: phrase.clone(),
                            level,
                            level_name: self.ladder.name(level),
                            prompt: self.ladder.transform(phrase, level)?,
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// Run every phrase through the ladder with `template` as system prompt.
    pub async fn run(&self, template: &Document, phrases: &[String]) -> Result<BenchmarkRun> {
        self.validate(phrases)?;
        let plan = self.plan(phrases)?;

        let system = Some(template.text().to_string()).filter(|s| !s.trim().is_empty());
        let ctx = Arc::new(RunContext {
            client: Arc::clone(&self.client),
            classifier: self.classifier.clone(),
            semaphore: Semaphore::new(self.options.concurrency),
            system,
            model: self.options.model.clone(),
            records: Mutex::new(Vec::new()),
        });

        info!(
            "Benchmarking {} with {} phrases x {} levels ({:?}, concurrency {})",
            template.label(),
            phrases.len(),
            self.options.levels,
            self.options.policy,
            self.options.concurrency
        );

        let mut tasks = JoinSet::new();
        match self.options.policy {
            RunPolicy::Independent => {
                for attempt in plan.into_iter().flatten() {
                    let ctx = Arc::clone(&ctx);
                    tasks.spawn(async move {
                        let record = execute(&ctx, attempt).await;
                        ctx.records.lock().await.push(record);
                    });
                }
            }
            RunPolicy::Cascade => {
                for attempts in plan {
                    let ctx = Arc::clone(&ctx);
                    tasks.spawn(async move {
                        for attempt in attempts {
                            let record = execute(&ctx, attempt).await;
                            let accepted = record.accepted;
                            ctx.records.lock().await.push(record);
                            if accepted {
                                break;
                            }
                        }
                    });
                }
            }
        }

        let timed_out = match self.options.run_timeout {
            Some(limit) => tokio::time::timeout(limit, drain(&mut tasks)).await.is_err(),
            None => {
                drain(&mut tasks).await;
                false
            }
        };
        if timed_out {
            warn!("Benchmark run timed out; aborting outstanding attempts");
            tasks.abort_all();
            drain(&mut tasks).await;
        }

        let mut records = std::mem::take(&mut *ctx.records.lock().await);
        records.sort_by_key(|r| (r.phrase_index, r.level));

        if !records.is_empty() && records.iter().all(BenchmarkRecord::is_transport_failure) {
            let first = records[0].error.clone().unwrap_or_default();
            return Err(CoreError::TransportFailure(format!(
                "all {} attempts failed; first error: {}",
                records.len(),
                first
            )));
        }

        info!("Benchmark finished with {} records", records.len());
        Ok(BenchmarkRun {
            records,
            levels: self.options.levels,
            timed_out,
        })
    }
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            if !e.is_cancelled() {
                warn!("Benchmark task failed: {}", e);
            }
        }
    }
}

async fn execute(ctx: &RunContext, attempt: Attempt) -> BenchmarkRecord {
    let Attempt {
        phrase_index,
        phrase,
        level,
        level_name,
        prompt,
    } = attempt;

    let mut record = BenchmarkRecord {
        phrase_index,
        phrase,
        level,
        level_name,
        prompt_used: String::new(),
        reply_text: None,
        accepted: false,
        latency: Duration::ZERO,
        error: None,
    };

    let _permit = match ctx.semaphore.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            record.prompt_used = prompt;
            record.error = Some(e.to_string());
            return record;
        }
    };

    let started = Instant::now();
    let result = ctx
        .client
        .generate(ctx.system.as_deref(), &prompt, &ctx.model)
        .await;
    record.latency = started.elapsed();
    record.prompt_used = prompt;

    match result {
        Ok(reply) => {
            record.accepted = !ctx.classifier.is_refusal(&reply);
            debug!(
                "phrase {} level {}: {}",
                phrase_index,
                level,
                if record.accepted { "accepted" } else { "rejected" }
            );
            record.reply_text = Some(reply);
        }
        Err(e) => {
            warn!("phrase {} level {} failed: {:#}", phrase_index, level, e);
            record.error = Some(format!("{:#}", e));
        }
    }
    record
}

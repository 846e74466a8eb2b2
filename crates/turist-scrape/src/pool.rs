//! Worker Pool Coordinator.
//!
//! Fans a list of targets out over `concurrency` tokio workers pulling from
//! a shared queue, or walks them one by one on a single long-lived session.
//! Either way the returned records are in input order.

use crate::browser::SessionFactory;
use crate::page::PageScraper;
use crate::progress::{ProgressEmitter, ProgressEventKind, ProgressSender};
use crate::record::{ExtractionResult, Target};
use futures::FutureExt;
use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How targets are scheduled onto browser sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `concurrency` workers, one fresh session per URL.
    Pooled { concurrency: usize },
    /// One session, every URL in sequence.
    SingleSession,
}

impl Mode {
    /// Number of workers this mode runs. Zero concurrency is clamped to one.
    pub fn workers(&self) -> usize {
        match self {
            Self::Pooled { concurrency } => (*concurrency).max(1),
            Self::SingleSession => 1,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pooled { .. } => write!(f, "pooled({})", self.workers()),
            Self::SingleSession => write!(f, "single-session"),
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug)]
pub struct RunReport {
    /// One record per target that did not panic, in input order.
    pub results: Vec<ExtractionResult>,
    /// Targets whose worker panicked.
    pub lost: usize,
    pub elapsed: Duration,
}

type Collected = Arc<Mutex<Vec<(usize, ExtractionResult)>>>;

/// Scrape every target and collect the records.
pub async fn run_all(
    factory: Arc<dyn SessionFactory>,
    scraper: Arc<PageScraper>,
    targets: Vec<Target>,
    mode: Mode,
    progress: Option<ProgressSender>,
) -> RunReport {
    let start = Instant::now();
    let total = targets.len();
    let emitter = Arc::new(ProgressEmitter::new(progress));
    let collected: Collected = Arc::new(Mutex::new(Vec::with_capacity(total)));

    tracing::info!(run_id = emitter.run_id(), total, %mode, "scrape run started");
    emitter.emit(ProgressEventKind::RunStarted {
        total,
        mode: mode.to_string(),
    });

    match mode {
        Mode::Pooled { .. } => {
            let queue = Arc::new(Mutex::new(VecDeque::from(targets)));
            let workers: Vec<_> = (0..mode.workers())
                .map(|worker| {
                    tokio::spawn(worker_loop(
                        worker,
                        Arc::clone(&factory),
                        Arc::clone(&scraper),
                        Arc::clone(&queue),
                        Arc::clone(&collected),
                        Arc::clone(&emitter),
                    ))
                })
                .collect();
            for handle in workers {
                if let Err(e) = handle.await {
                    tracing::warn!("worker task failed: {e}");
                }
            }
        }
        Mode::SingleSession => {
            run_sequential(factory.as_ref(), &scraper, targets, &collected, &emitter).await;
        }
    }

    let mut tagged = std::mem::take(&mut *lock(&collected));
    tagged.sort_by_key(|(index, _)| *index);
    let results: Vec<ExtractionResult> = tagged.into_iter().map(|(_, r)| r).collect();

    let elapsed = start.elapsed();
    emitter.emit(ProgressEventKind::RunCompleted {
        records: results.len(),
        elapsed_ms: elapsed.as_millis() as u64,
    });
    tracing::info!(
        run_id = emitter.run_id(),
        records = results.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "scrape run finished"
    );

    RunReport {
        lost: total - results.len(),
        results,
        elapsed,
    }
}

/// Pull targets until the queue is empty.
///
/// Each unit runs in its own task so a panic loses only that unit's record.
async fn worker_loop(
    worker: usize,
    factory: Arc<dyn SessionFactory>,
    scraper: Arc<PageScraper>,
    queue: Arc<Mutex<VecDeque<Target>>>,
    collected: Collected,
    emitter: Arc<ProgressEmitter>,
) {
    loop {
        let Some(target) = lock(&queue).pop_front() else {
            break;
        };
        let index = target.index;
        tracing::debug!(worker, index, url = %target.url, "unit picked up");
        emitter.emit(ProgressEventKind::UnitStarted {
            index,
            url: target.url.clone(),
        });

        let unit_start = Instant::now();
        let unit = {
            let factory = Arc::clone(&factory);
            let scraper = Arc::clone(&scraper);
            let target = target.clone();
            tokio::spawn(async move { scraper.scrape_one(factory.as_ref(), &target).await })
        };

        match unit.await {
            Ok(record) => finish(&collected, &emitter, &target, record, unit_start),
            Err(e) => lose(&emitter, &target, e.to_string()),
        }
    }
}

/// Single-session mode: one browser for every target.
async fn run_sequential(
    factory: &dyn SessionFactory,
    scraper: &PageScraper,
    targets: Vec<Target>,
    collected: &Collected,
    emitter: &ProgressEmitter,
) {
    let mut session = match factory.open().await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Session error: {e:#}");
            scraper
                .console()
                .line(format!("ERROR: could not open browser session: {e:#}"));
            for target in targets {
                emitter.emit(ProgressEventKind::UnitStarted {
                    index: target.index,
                    url: target.url.clone(),
                });
                let record = ExtractionResult::new(&target.url);
                finish(collected, emitter, &target, record, Instant::now());
            }
            return;
        }
    };

    for target in targets {
        emitter.emit(ProgressEventKind::UnitStarted {
            index: target.index,
            url: target.url.clone(),
        });
        let unit_start = Instant::now();
        let unit = AssertUnwindSafe(scraper.scrape_in(session.as_mut(), &target))
            .catch_unwind()
            .await;
        match unit {
            Ok(record) => finish(collected, emitter, &target, record, unit_start),
            Err(_) => lose(emitter, &target, "scrape panicked".to_string()),
        }
    }

    if let Err(e) = session.close().await {
        tracing::debug!("session close failed: {e:#}");
    }
}

fn finish(
    collected: &Collected,
    emitter: &ProgressEmitter,
    target: &Target,
    record: ExtractionResult,
    unit_start: Instant,
) {
    emitter.emit(ProgressEventKind::UnitCompleted {
        index: target.index,
        url: target.url.clone(),
        property_found: record.has_name(),
        fields_found: record.fields_found(),
        images: record.images.len(),
        elapsed_ms: unit_start.elapsed().as_millis() as u64,
    });
    lock(collected).push((target.index, record));
}

fn lose(emitter: &ProgressEmitter, target: &Target, reason: String) {
    tracing::warn!(index = target.index, url = %target.url, "unit lost: {reason}");
    emitter.emit(ProgressEventKind::UnitLost {
        index: target.index,
        reason,
    });
}

/// Lock, recovering the data if another holder panicked.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

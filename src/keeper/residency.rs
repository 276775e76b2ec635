//! Memory Residency Keeper
//!
//! Background task that periodically touches the embedding table, probes
//! random vocabulary keys and runs genuine similarity computations, so
//! the OS keeps the table resident and the compute path warm instead of
//! paying cold-page latency on the serving path.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::VectorStore;

/// Failure inside one residency pass. Logged and swallowed; never
/// propagated past the cycle boundary.
#[derive(Debug, Error)]
#[error("residency sub-step {step} failed: {source}")]
pub struct KeeperCycleError {
    step: &'static str,
    #[source]
    source: crate::error::WordSimError,
}

impl KeeperCycleError {
    fn step(step: &'static str, source: crate::error::WordSimError) -> Self {
        Self { step, source }
    }
}

/// Keeper tuning knobs.
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// Sleep between cycles
    pub interval: Duration,
    /// Rows per chunk in the table walk
    pub chunk_rows: usize,
    /// Read every Kth row inside a chunk
    pub sample_stride: usize,
    /// Random vocabulary keys looked up per cycle
    pub key_samples: usize,
    /// Random similarity computations per cycle
    pub sim_samples: usize,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            chunk_rows: 4096,
            sample_stride: 64,
            key_samples: 32,
            sim_samples: 8,
        }
    }
}

impl KeeperConfig {
    /// Set the cycle interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the per-chunk sampling stride
    pub fn with_sample_stride(mut self, stride: usize) -> Self {
        self.sample_stride = stride;
        self
    }
}

impl From<&crate::config::Config> for KeeperConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            interval: config.keeper_interval,
            chunk_rows: config.keeper_chunk_rows,
            sample_stride: config.keeper_sample_stride,
            key_samples: config.keeper_key_samples,
            sim_samples: config.keeper_sim_samples,
        }
    }
}

/// Snapshot of the keeper's observable state.
#[derive(Debug, Clone)]
pub struct KeeperStatus {
    pub running: bool,
    pub cycles_completed: u64,
    pub vocabulary_size: usize,
    pub started_at: Option<DateTime<Utc>>,
}

/// All mutable keeper state lives under one lock, shared between the
/// background task and status/stop callers.
struct KeeperState {
    running: bool,
    generation: u64,
    cycles_completed: u64,
    vocabulary_size: usize,
    started_at: Option<DateTime<Utc>>,
}

/// What one cycle actually touched; folded into the debug log so the
/// reads stay observable.
#[derive(Debug, Default)]
struct CycleStats {
    rows_touched: usize,
    keys_probed: usize,
    sims_run: usize,
    checksum: f32,
}

/// Cancellable periodic residency task over a shared store.
pub struct ResidencyKeeper {
    store: Arc<VectorStore>,
    config: KeeperConfig,
    state: Arc<Mutex<KeeperState>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ResidencyKeeper {
    pub fn new(store: Arc<VectorStore>, config: KeeperConfig) -> Self {
        let vocabulary_size = store.len();
        Self {
            store,
            config,
            state: Arc::new(Mutex::new(KeeperState {
                running: false,
                generation: 0,
                cycles_completed: 0,
                vocabulary_size,
                started_at: None,
            })),
            handle: Mutex::new(None),
        }
    }

    /// Launch the background task. Idempotent: returns `false` without
    /// spawning when a task is already running. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> bool {
        // Handle slot doubles as the control lock so start/stop/restart
        // cannot interleave
        let mut handle = self.handle.lock();
        self.start_locked(&mut handle)
    }

    /// Request shutdown. The in-flight cycle finishes and no new cycle
    /// is scheduled; the returned handle can be awaited by callers that
    /// need a synchronous guarantee.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let mut handle = self.handle.lock();
        self.state.lock().running = false;
        handle.take()
    }

    /// Stop the current task and start a fresh one with a zeroed cycle
    /// counter. Holds the control lock throughout, so it cannot race a
    /// concurrent `start`.
    pub fn restart(&self) -> bool {
        let mut handle = self.handle.lock();
        self.state.lock().running = false;
        handle.take();
        self.start_locked(&mut handle)
    }

    /// Observable state, read under the counter lock.
    pub fn status(&self) -> KeeperStatus {
        let state = self.state.lock();
        KeeperStatus {
            running: state.running,
            cycles_completed: state.cycles_completed,
            vocabulary_size: state.vocabulary_size,
            started_at: state.started_at,
        }
    }

    fn start_locked(&self, handle: &mut Option<JoinHandle<()>>) -> bool {
        let generation;
        {
            let mut state = self.state.lock();
            if state.running {
                return false;
            }
            state.running = true;
            state.generation += 1;
            state.cycles_completed = 0;
            state.vocabulary_size = self.store.len();
            state.started_at = Some(Utc::now());
            generation = state.generation;
        }

        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let state = Arc::clone(&self.state);

        info!(
            interval = ?config.interval,
            vocab = store.len(),
            "residency keeper started"
        );

        *handle = Some(tokio::spawn(async move {
            loop {
                {
                    let state = state.lock();
                    if !state.running || state.generation != generation {
                        break;
                    }
                }

                match run_cycle(&store, &config) {
                    Ok(stats) => debug!(
                        rows = stats.rows_touched,
                        keys = stats.keys_probed,
                        sims = stats.sims_run,
                        checksum = stats.checksum,
                        "residency cycle complete"
                    ),
                    Err(e) => warn!(error = %e, "residency cycle failed"),
                }

                {
                    // A superseded task never touches the new counters
                    let mut state = state.lock();
                    if !state.running || state.generation != generation {
                        break;
                    }
                    state.cycles_completed += 1;
                }

                tokio::time::sleep(config.interval).await;
            }
            debug!("residency keeper exited");
        }));
        true
    }
}

/// One residency pass: chunked table walk, random key probes, random
/// similarity computations. Read path only.
fn run_cycle(store: &VectorStore, config: &KeeperConfig) -> Result<CycleStats, KeeperCycleError> {
    let n = store.len();
    let mut stats = CycleStats::default();
    if n == 0 {
        return Ok(stats);
    }

    // (a) walk the table in chunks, reading every Kth row
    let stride = config.sample_stride.max(1);
    let chunk_rows = config.chunk_rows.max(1);
    let mut chunk_start = 0;
    while chunk_start < n {
        let chunk_end = (chunk_start + chunk_rows).min(n);
        let mut row_idx = chunk_start;
        while row_idx < chunk_end {
            if let Some(row) = store.row(row_idx) {
                stats.checksum += row[0].to_f32();
                stats.rows_touched += 1;
            }
            row_idx += stride;
        }
        chunk_start = chunk_end;
    }

    let mut rng = rand::thread_rng();

    // (b) random vocabulary key lookups
    for _ in 0..config.key_samples {
        let idx = rng.gen_range(0..n);
        let word = store
            .word_at(idx)
            .ok_or_else(|| {
                KeeperCycleError::step(
                    "key-sample",
                    crate::error::WordSimError::UnknownWord(format!("#{idx}")),
                )
            })?;
        let row = store
            .vector_of(word)
            .map_err(|e| KeeperCycleError::step("key-sample", e))?;
        stats.checksum += row[row.len() - 1].to_f32();
        stats.keys_probed += 1;
    }

    // (c) genuine similarity computations over random pairs
    for _ in 0..config.sim_samples {
        let a = store.word_at(rng.gen_range(0..n));
        let b = store.word_at(rng.gen_range(0..n));
        if let (Some(a), Some(b)) = (a, b) {
            let sim = store
                .similarity(a, b)
                .map_err(|e| KeeperCycleError::step("similarity-sample", e))?;
            stats.checksum += sim;
            stats.sims_run += 1;
        }
    }

    Ok(stats)
}

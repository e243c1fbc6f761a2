//! Periodic pipeline runs with an overlap guard.
//!
//! The scheduler has two states, [`RunState::Idle`] and
//! [`RunState::Running`]. A trigger that arrives while a run is in progress
//! is dropped, not queued, so at most one run ever touches the store.

use std::{
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use polarinch_core::{generate::Generator, store::RecordStore};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info, warn};

use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
  Idle,
  Running,
}

/// Outcome of [`Scheduler::trigger`].
#[derive(Debug)]
pub enum Trigger {
  /// A run was spawned; the handle resolves when it finishes.
  Started(JoinHandle<()>),
  /// A run was already in progress; nothing was started.
  Skipped,
}

/// Returns the scheduler to `Idle` when dropped, however the run ended.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
  fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

pub struct Scheduler<G, S> {
  pipeline:     Arc<Pipeline<G, S>>,
  running:      Arc<AtomicBool>,
  interval:     Duration,
  run_on_start: bool,
}

impl<G, S> Scheduler<G, S>
where
  G: Generator + 'static,
  S: RecordStore + 'static,
{
  /// `interval` is clamped to at least one millisecond.
  pub fn new(pipeline: Pipeline<G, S>, interval: Duration) -> Self {
    Self {
      pipeline:     Arc::new(pipeline),
      running:      Arc::new(AtomicBool::new(false)),
      interval:     interval.max(Duration::from_millis(1)),
      run_on_start: true,
    }
  }

  /// Whether the first run happens immediately or after one interval.
  pub fn run_on_start(mut self, run_on_start: bool) -> Self {
    self.run_on_start = run_on_start;
    self
  }

  pub fn state(&self) -> RunState {
    if self.running.load(Ordering::Acquire) {
      RunState::Running
    } else {
      RunState::Idle
    }
  }

  /// Start a run if the scheduler is idle.
  pub fn trigger(&self) -> Trigger {
    if self
      .running
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      warn!("generation run still in progress; dropping trigger");
      return Trigger::Skipped;
    }

    let guard = RunGuard(self.running.clone());
    let pipeline = self.pipeline.clone();
    Trigger::Started(tokio::spawn(async move {
      let _guard = guard;
      info!(topics = pipeline.topics().len(), "generation run started");
      match pipeline.run_once().await {
        Ok(report) => info!(
          cells = report.cells,
          generated = report.generated,
          skipped = report.skipped,
          inserted = report.inserted,
          "generation run finished"
        ),
        Err(e) => error!(error = %e, "generation run failed"),
      }
    }))
  }

  /// Trigger on every tick of the interval until `shutdown` resolves, then
  /// wait for any in-flight run to finish.
  pub async fn run<F>(self, shutdown: F)
  where
    F: Future<Output = ()> + Send,
  {
    let mut ticker = tokio::time::interval(self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    if !self.run_on_start {
      // The first tick completes immediately.
      ticker.tick().await;
    }

    tokio::pin!(shutdown);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
      tokio::select! {
        () = &mut shutdown => break,
        _ = ticker.tick() => {
          if let Trigger::Started(handle) = self.trigger() {
            in_flight = Some(handle);
          }
        }
      }
    }

    if let Some(handle) = in_flight {
      if !handle.is_finished() {
        info!("waiting for in-flight generation run");
      }
      if let Err(e) = handle.await {
        error!(error = %e, "generation run aborted");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{
    io,
    sync::atomic::{AtomicUsize, Ordering},
  };

  use polarinch_core::{record::RequestedSentiment, store::RecordStore};
  use polarinch_store_sqlite::SqliteStore;
  use tokio::sync::{Semaphore, oneshot};

  use super::*;

  /// Each call waits for a permit, then records how many calls overlapped.
  #[derive(Clone)]
  struct Gated {
    gate:     Arc<Semaphore>,
    active:   Arc<AtomicUsize>,
    max_seen: Arc<AtomicUsize>,
    calls:    Arc<AtomicUsize>,
  }

  impl Gated {
    fn new(permits: usize) -> Self {
      Self {
        gate:     Arc::new(Semaphore::new(permits)),
        active:   Arc::default(),
        max_seen: Arc::default(),
        calls:    Arc::default(),
      }
    }
  }

  impl Generator for Gated {
    type Error = io::Error;

    async fn generate(
      &self,
      topic: &str,
      _sentiment: RequestedSentiment,
    ) -> Result<String, io::Error> {
      let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
      self.max_seen.fetch_max(now, Ordering::SeqCst);
      self.calls.fetch_add(1, Ordering::SeqCst);
      let permit = self.gate.acquire().await.map_err(io::Error::other)?;
      permit.forget();
      self.active.fetch_sub(1, Ordering::SeqCst);
      Ok(format!("{topic} update"))
    }
  }

  /// Sleeps on every call so one run spans several ticks.
  struct Slow {
    per_call: Duration,
    inner:    Gated,
  }

  impl Generator for Slow {
    type Error = io::Error;

    async fn generate(
      &self,
      topic: &str,
      sentiment: RequestedSentiment,
    ) -> Result<String, io::Error> {
      tokio::time::sleep(self.per_call).await;
      self.inner.generate(topic, sentiment).await
    }
  }

  struct Panicky;

  impl Generator for Panicky {
    type Error = io::Error;

    async fn generate(
      &self,
      _topic: &str,
      _sentiment: RequestedSentiment,
    ) -> Result<String, io::Error> {
      panic!("generator exploded");
    }
  }

  async fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().await.unwrap())
  }

  #[tokio::test]
  async fn overlapping_trigger_is_dropped() {
    let store = store().await;
    let generator = Gated::new(0);
    let gate = generator.gate.clone();
    let scheduler = Scheduler::new(
      Pipeline::new(generator, store.clone(), vec!["nba".into()]),
      Duration::from_secs(3600),
    );
    assert_eq!(scheduler.state(), RunState::Idle);

    let Trigger::Started(first) = scheduler.trigger() else {
      panic!("first trigger should start a run");
    };
    assert_eq!(scheduler.state(), RunState::Running);
    assert!(matches!(scheduler.trigger(), Trigger::Skipped));
    assert!(matches!(scheduler.trigger(), Trigger::Skipped));

    gate.add_permits(4);
    first.await.unwrap();
    assert_eq!(scheduler.state(), RunState::Idle);
    assert_eq!(store.count().await.unwrap(), 4);

    // Idle again: the next trigger runs.
    gate.add_permits(4);
    let Trigger::Started(second) = scheduler.trigger() else {
      panic!("trigger after completion should start a run");
    };
    second.await.unwrap();
    assert_eq!(store.count().await.unwrap(), 8);
  }

  #[tokio::test]
  async fn slow_runs_never_overlap_on_cadence() {
    let store = store().await;
    let gated = Gated::new(1_000);
    let max_seen = gated.max_seen.clone();
    let calls = gated.calls.clone();
    let generator = Slow { per_call: Duration::from_millis(15), inner: gated };
    // One run (4 calls × 15 ms) spans several 10 ms ticks.
    let scheduler = Scheduler::new(
      Pipeline::new(generator, store.clone(), vec!["motogp".into()]),
      Duration::from_millis(10),
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(scheduler.run(async move {
      let _ = stop_rx.await;
    }));
    tokio::time::sleep(Duration::from_millis(250)).await;
    stop_tx.send(()).unwrap();
    task.await.unwrap();

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    let calls = calls.load(Ordering::SeqCst);
    assert!(calls >= 8, "expected at least two runs, saw {calls} calls");
    // Every started run finished before shutdown returned.
    assert_eq!(calls % 4, 0);
    assert_eq!(store.count().await.unwrap(), calls);
  }

  #[tokio::test]
  async fn failed_run_returns_to_idle() {
    struct FullDisk;

    impl RecordStore for FullDisk {
      type Error = io::Error;

      async fn persist(
        &self,
        _records: Vec<polarinch_core::record::NewRecord>,
      ) -> io::Result<usize> {
        Err(io::Error::other("disk full"))
      }

      async fn find_by_topic(
        &self,
        _topic: &str,
      ) -> io::Result<Vec<polarinch_core::record::Record>> {
        Ok(Vec::new())
      }

      async fn sample_distinct_topics(
        &self,
        _k: usize,
      ) -> io::Result<Vec<polarinch_core::record::Record>> {
        Ok(Vec::new())
      }

      async fn count(&self) -> io::Result<usize> { Ok(0) }
    }

    let scheduler = Scheduler::new(
      Pipeline::new(Gated::new(100), Arc::new(FullDisk), vec!["golf".into()]),
      Duration::from_secs(3600),
    );
    for _ in 0..2 {
      let Trigger::Started(handle) = scheduler.trigger() else {
        panic!("idle scheduler should start a run");
      };
      handle.await.unwrap();
      assert_eq!(scheduler.state(), RunState::Idle);
    }
  }

  #[tokio::test]
  async fn panicking_run_returns_to_idle() {
    let scheduler = Scheduler::new(
      Pipeline::new(Panicky, store().await, vec!["nba".into()]),
      Duration::from_secs(3600),
    );
    let Trigger::Started(handle) = scheduler.trigger() else {
      panic!("idle scheduler should start a run");
    };
    assert!(handle.await.unwrap_err().is_panic());
    assert_eq!(scheduler.state(), RunState::Idle);
  }

  #[tokio::test]
  async fn run_on_start_controls_first_run() {
    for (run_on_start, expected_calls) in [(true, 4), (false, 0)] {
      let generator = Gated::new(100);
      let calls = generator.calls.clone();
      let scheduler = Scheduler::new(
        Pipeline::new(generator, store().await, vec!["nba".into()]),
        Duration::from_secs(3600),
      )
      .run_on_start(run_on_start);

      scheduler
        .run(tokio::time::sleep(Duration::from_millis(100)))
        .await;
      assert_eq!(calls.load(Ordering::SeqCst), expected_calls, "run_on_start={run_on_start}");
    }
  }
}

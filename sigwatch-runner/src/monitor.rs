//! Live monitoring pass.
//!
//! One poll evaluates every enabled task. Fetch and classification may run
//! in parallel; the compare / notify / persist step then runs sequentially,
//! task by task, so a task's stored `last_signal` is only ever written after
//! its own classification finished.

use std::time::Duration;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use sigwatch_core::domain::Signal;
use sigwatch_core::indicators::IndicatorSnapshot;
use sigwatch_core::signals::{ClassifierConfig, SignalClassifier, SpecError};

use crate::config::MonitorConfig;
use crate::data::{DataError, MarketDataProvider};
use crate::notify::Notifier;
use crate::report::format_alert;
use crate::store::{MonitorTask, TaskStore};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Counts from one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Enabled tasks evaluated.
    pub checked: usize,
    /// New signals delivered to the notifier.
    pub notified: usize,
    /// Signals equal to the task's last one, not re-sent.
    pub suppressed: usize,
    /// Disabled tasks.
    pub skipped: usize,
    /// Tasks whose fetch, spec or persist step failed.
    pub failed: usize,
}

type Evaluation = Result<Option<(Signal, IndicatorSnapshot)>, MonitorError>;

pub struct Monitor<P, N> {
    provider: P,
    notifier: N,
    classifier: ClassifierConfig,
    min_bars: usize,
    parallel: bool,
}

impl<P: MarketDataProvider, N: Notifier> Monitor<P, N> {
    pub fn new(provider: P, notifier: N, classifier: ClassifierConfig, config: &MonitorConfig) -> Self {
        Self {
            provider,
            notifier,
            classifier,
            min_bars: config.min_bars,
            parallel: true,
        }
    }

    /// Enables or disables parallel task evaluation.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Current signal for one task, or `None`.
    ///
    /// Fewer than `min_bars` bars is not an error; it simply yields nothing.
    pub fn evaluate(&self, task: &MonitorTask) -> Evaluation {
        let series = self.provider.fetch(&task.symbol, task.period)?;
        if series.len() < self.min_bars {
            debug!(task = %task.id, bars = series.len(), "not enough bars yet");
            return Ok(None);
        }
        let classifier = SignalClassifier::new(task.spec, self.classifier)?;
        let bars = series.bars();
        Ok(classifier
            .classify(bars)
            .map(|signal| (signal, IndicatorSnapshot::latest(bars))))
    }

    /// Evaluate every enabled task once and deliver new signals.
    pub fn poll_once(&self, store: &mut dyn TaskStore) -> PollSummary {
        let mut summary = PollSummary::default();
        let (enabled, disabled): (Vec<MonitorTask>, Vec<MonitorTask>) =
            store.list().into_iter().partition(|t| t.enabled);
        summary.skipped = disabled.len();
        summary.checked = enabled.len();

        let evaluations: Vec<Evaluation> = if self.parallel {
            enabled.par_iter().map(|t| self.evaluate(t)).collect()
        } else {
            enabled.iter().map(|t| self.evaluate(t)).collect()
        };

        for (task, evaluation) in enabled.iter().zip(evaluations) {
            let (signal, snapshot) = match evaluation {
                Ok(Some(found)) => found,
                Ok(None) => continue,
                Err(e) => {
                    warn!(task = %task.id, error = %e, "task evaluation failed");
                    summary.failed += 1;
                    continue;
                }
            };

            if task.last_signal == Some(signal.kind) {
                debug!(task = %task.id, signal = %signal.kind, "repeat signal suppressed");
                summary.suppressed += 1;
                continue;
            }

            let message = format_alert(&task.symbol, task.period, &task.spec, &signal, &snapshot);
            self.notifier.notify(&task.destination, &message);
            summary.notified += 1;
            info!(task = %task.id, signal = %signal.kind, price = signal.price, "signal sent");

            if let Err(e) = store.update_last_signal(&task.id, signal.kind) {
                warn!(task = %task.id, error = %e, "failed to persist last signal");
                summary.failed += 1;
            }
        }

        info!(
            checked = summary.checked,
            notified = summary.notified,
            suppressed = summary.suppressed,
            skipped = summary.skipped,
            failed = summary.failed,
            "poll complete"
        );
        summary
    }

    /// Poll every `interval`; stops after `max_polls` passes when given.
    pub fn run(&self, store: &mut dyn TaskStore, interval: Duration, max_polls: Option<usize>) {
        let mut polls = 0usize;
        loop {
            self.poll_once(store);
            polls += 1;
            if max_polls.is_some_and(|max| polls >= max) {
                break;
            }
            std::thread::sleep(interval);
        }
    }
}

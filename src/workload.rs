//! Simulated tasks driven by the `taskboard` binary.
//!
//! Every outcome is derived from the task index so runs are reproducible.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use indicatif::HumanDuration;
use serde::{Deserialize, Serialize};

use crate::display::Item;
use crate::queue::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadSettings {
    pub items: usize,
    pub skip: usize,
    /// Every Nth task fails; 0 disables failures.
    pub fail_every: usize,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            items: 24,
            skip: 0,
            fail_every: 7,
            min_ms: 150,
            max_ms: 1200,
        }
    }
}

impl WorkloadSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_ms > self.max_ms {
            anyhow::bail!(
                "min-ms ({}) cannot be larger than max-ms ({})",
                self.min_ms,
                self.max_ms
            );
        }
        Ok(())
    }

    pub fn jobs(&self) -> Vec<Job> {
        (0..self.items)
            .map(|index| Job {
                index,
                name: format!("task-{:03}", index + 1),
                duration: self.duration_for(index),
                outcome: outcome_for(index, self.fail_every),
            })
            .collect()
    }

    fn duration_for(&self, index: usize) -> Duration {
        let span = self.max_ms - self.min_ms;
        // Fibonacci hashing spreads consecutive indexes over the span.
        let hash = (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32;
        let jitter = span.checked_add(1).map_or(hash, |buckets| hash % buckets);
        Duration::from_millis(self.min_ms + jitter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Unchanged,
    Updated,
    New,
    Failed,
}

fn outcome_for(index: usize, fail_every: usize) -> Outcome {
    if fail_every > 0 && (index + 1) % fail_every == 0 {
        Outcome::Failed
    } else if index % 5 == 2 {
        Outcome::New
    } else if index % 3 == 1 {
        Outcome::Updated
    } else {
        Outcome::Unchanged
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub index: usize,
    pub name: String,
    pub duration: Duration,
    pub outcome: Outcome,
}

/// Counters shared by all tasks of a run.
#[derive(Debug, Default)]
pub struct Tally {
    done: AtomicUsize,
    updated: AtomicUsize,
    new: AtomicUsize,
    failed: AtomicUsize,
    aborted: AtomicUsize,
}

impl Tally {
    fn record(&self, outcome: Outcome) {
        self.done.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            Outcome::Unchanged => return,
            Outcome::Updated => &self.updated,
            Outcome::New => &self.new,
            Outcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::Relaxed)
    }

    pub fn summary(&self, elapsed: Duration) -> String {
        format!(
            "{} tasks: {} updated, {} new, {} failed in {}",
            self.done(),
            self.updated.load(Ordering::Relaxed),
            self.new.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            HumanDuration(elapsed)
        )
    }
}

pub struct SimulatedTask {
    job: Job,
    item: Item,
    tally: Arc<Tally>,
    quiet: bool,
}

impl SimulatedTask {
    pub fn new(job: Job, item: Item, tally: Arc<Tally>, quiet: bool) -> Self {
        Self {
            job,
            item,
            tally,
            quiet,
        }
    }

    fn report(&self) -> crate::Result<()> {
        match self.job.outcome {
            Outcome::Failed => {
                self.item.update(" (failed)", true)?;
                self.item.error_info(&format!(
                    "simulated failure after {} ms\n{} exited with 1",
                    self.job.duration.as_millis(),
                    self.job.name
                ))?;
            }
            Outcome::New => self.item.update(" (new)", false)?,
            Outcome::Updated => self.item.update(" (updated)", false)?,
            Outcome::Unchanged => {}
        }
        if self.quiet
            && !self.item.is_updated()
            && !self.item.is_failed()
            && self.item.detail_lines().is_empty()
        {
            self.item.hide()?;
        }
        self.item.finished(false)
    }
}

impl Task for SimulatedTask {
    fn run(self: Box<Self>) {
        thread::sleep(self.job.duration);
        if let Err(err) = self.report() {
            tracing::warn!("[task] {}: {err}", self.job.name);
        }
        self.tally.record(self.job.outcome);
    }

    fn aborted(self: Box<Self>) {
        let result = self
            .item
            .update(" (aborted)", true)
            .and_then(|()| self.item.finished(false));
        if let Err(err) = result {
            tracing::warn!("[task] {}: {err}", self.job.name);
        }
        self.tally.record_aborted();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_follow_the_index() {
        assert_eq!(outcome_for(6, 7), Outcome::Failed);
        assert_eq!(outcome_for(13, 7), Outcome::Failed);
        assert_eq!(outcome_for(2, 7), Outcome::New);
        assert_eq!(outcome_for(1, 7), Outcome::Updated);
        assert_eq!(outcome_for(0, 7), Outcome::Unchanged);
        assert_eq!(outcome_for(6, 0), Outcome::Unchanged);
    }

    #[test]
    fn durations_stay_within_bounds() {
        let settings = WorkloadSettings {
            items: 50,
            min_ms: 10,
            max_ms: 40,
            ..WorkloadSettings::default()
        };
        for job in settings.jobs() {
            let ms = job.duration.as_millis();
            assert!((10..=40).contains(&ms), "{} took {ms} ms", job.name);
        }
    }

    #[test]
    fn fixed_duration_when_bounds_match() {
        let settings = WorkloadSettings {
            items: 3,
            min_ms: 25,
            max_ms: 25,
            ..WorkloadSettings::default()
        };
        assert!(
            settings
                .jobs()
                .iter()
                .all(|job| job.duration == Duration::from_millis(25))
        );
    }

    #[test]
    fn full_range_does_not_overflow() {
        let settings = WorkloadSettings {
            items: 4,
            min_ms: 0,
            max_ms: u64::MAX,
            ..WorkloadSettings::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(settings.jobs().len(), 4);

        let settings = WorkloadSettings {
            items: 4,
            min_ms: u64::MAX - 1,
            max_ms: u64::MAX,
            ..WorkloadSettings::default()
        };
        for job in settings.jobs() {
            assert!(job.duration >= Duration::from_millis(u64::MAX - 1));
        }
    }

    #[test]
    fn jobs_are_named_in_submission_order() {
        let names: Vec<String> = WorkloadSettings {
            items: 3,
            ..WorkloadSettings::default()
        }
        .jobs()
        .into_iter()
        .map(|job| job.name)
        .collect();
        assert_eq!(names, ["task-001", "task-002", "task-003"]);
    }

    #[test]
    fn summary_counts_each_outcome() {
        let tally = Tally::default();
        tally.record(Outcome::Failed);
        tally.record(Outcome::New);
        tally.record(Outcome::Unchanged);
        tally.record_aborted();
        let summary = tally.summary(Duration::from_secs(0));
        assert!(summary.starts_with("3 tasks: 0 updated, 1 new, 1 failed in "));
        assert_eq!(tally.aborted(), 1);
    }
}

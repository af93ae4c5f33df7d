//! Task scheduling: strictly sequential or bounded-parallel.
//!
//! Only submission order is guaranteed. Completion order under
//! [`ConcurrentJobQueue`] is arbitrary, which is why each task is handed its
//! display [`Item`](crate::display::Item) at submission time.

use std::collections::HashSet;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::interrupt::Interrupt;

/// How often blocking waits look at the interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// A unit of work. Exactly one of `run` or `aborted` is called.
pub trait Task: Send + 'static {
    fn run(self: Box<Self>);

    /// Called instead of `run` when the task was never started because the
    /// submitting thread was interrupted.
    fn aborted(self: Box<Self>);
}

pub trait JobQueue {
    fn add(&mut self, task: Box<dyn Task>) -> Result<()>;

    /// Wait for every submitted task and release worker resources.
    fn finish(&mut self) -> Result<()>;
}

/// Sequential execution when `concurrency < 2`, a bounded pool otherwise.
pub fn job_queue(concurrency: usize, interrupt: Interrupt) -> Result<Box<dyn JobQueue>> {
    if concurrency < 2 {
        Ok(Box::new(SequentialJobQueue::new(interrupt)))
    } else {
        Ok(Box::new(ConcurrentJobQueue::new(concurrency, interrupt)?))
    }
}

/// Finish `queue`, then report an interrupt that arrived while the last
/// tasks ran and no blocking wait was there to observe it.
pub fn finish_all(queue: &mut dyn JobQueue, interrupt: &Interrupt) -> Result<()> {
    queue.finish()?;
    interrupt.check()
}

/// Runs each task inline on the calling thread, in submission order.
#[derive(Debug, Default)]
pub struct SequentialJobQueue {
    interrupt: Interrupt,
}

impl SequentialJobQueue {
    pub fn new(interrupt: Interrupt) -> Self {
        Self { interrupt }
    }
}

impl JobQueue for SequentialJobQueue {
    fn add(&mut self, task: Box<dyn Task>) -> Result<()> {
        if let Err(err) = self.interrupt.check() {
            task.aborted();
            return Err(err);
        }
        task.run();
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

type TaskId = u64;

// Reports completion when dropped, so a panicking task still frees its slot.
struct Completion {
    id: TaskId,
    tx: mpsc::Sender<TaskId>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        let _ = self.tx.send(self.id);
    }
}

/// Runs up to `limit` tasks at once on a dedicated worker pool.
///
/// `add` blocks while the pool is full until at least one in-flight task
/// completes. If the interrupt is raised while `add` waits, the pending task
/// is aborted and [`Error::Interrupted`] is returned; tasks already running
/// are left to finish on their own.
pub struct ConcurrentJobQueue {
    limit: usize,
    pool: Option<rayon::ThreadPool>,
    in_flight: HashSet<TaskId>,
    next_id: TaskId,
    done_tx: mpsc::Sender<TaskId>,
    done_rx: mpsc::Receiver<TaskId>,
    interrupt: Interrupt,
}

impl ConcurrentJobQueue {
    pub fn new(limit: usize, interrupt: Interrupt) -> Result<Self> {
        let limit = limit.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(limit)
            .thread_name(|n| format!("taskboard-worker-{n}"))
            .panic_handler(|payload| {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!("[queue] task panicked: {reason}");
            })
            .build()?;
        let (done_tx, done_rx) = mpsc::channel();
        Ok(Self {
            limit,
            pool: Some(pool),
            in_flight: HashSet::new(),
            next_id: 0,
            done_tx,
            done_rx,
            interrupt,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn wait_for_completion(&self) -> Result<TaskId> {
        loop {
            self.interrupt.check()?;
            match self.done_rx.recv_timeout(INTERRUPT_POLL) {
                Ok(id) => return Ok(id),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(Error::ChannelClosed),
            }
        }
    }

    fn drain_completed(&mut self) -> Result<()> {
        loop {
            match self.done_rx.try_recv() {
                Ok(id) => {
                    self.in_flight.remove(&id);
                }
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(Error::ChannelClosed),
            }
        }
    }

    fn wait_for_slot(&mut self) -> Result<()> {
        self.interrupt.check()?;
        while self.in_flight.len() >= self.limit {
            let id = self.wait_for_completion()?;
            self.in_flight.remove(&id);
            self.drain_completed()?;
        }
        Ok(())
    }

    // Dropping the pool lets its workers exit once their current task ends.
    fn shutdown(&mut self) {
        self.pool.take();
        self.in_flight.clear();
    }
}

impl JobQueue for ConcurrentJobQueue {
    fn add(&mut self, task: Box<dyn Task>) -> Result<()> {
        if self.pool.is_none() {
            task.aborted();
            return Err(Error::QueueClosed);
        }
        if let Err(err) = self.wait_for_slot() {
            tracing::debug!("[queue] aborting task {}: {err}", self.next_id);
            task.aborted();
            return Err(err);
        }
        let Some(pool) = self.pool.as_ref() else {
            task.aborted();
            return Err(Error::QueueClosed);
        };

        let id = self.next_id;
        self.next_id += 1;
        let completion = Completion {
            id,
            tx: self.done_tx.clone(),
        };
        pool.spawn(move || {
            let _completion = completion;
            task.run();
        });
        self.in_flight.insert(id);
        tracing::debug!(
            "[queue] submitted task {id} ({} in flight)",
            self.in_flight.len()
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.pool.is_none() {
            return Ok(());
        }
        self.drain_completed()?;
        while !self.in_flight.is_empty() {
            match self.wait_for_completion() {
                Ok(id) => {
                    self.in_flight.remove(&id);
                }
                Err(err) => {
                    tracing::debug!(
                        "[queue] stopped waiting with {} task(s) in flight: {err}",
                        self.in_flight.len()
                    );
                    self.shutdown();
                    return Err(err);
                }
            }
        }
        self.shutdown();
        tracing::debug!("[queue] all tasks completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Record(i32, Arc<Mutex<Vec<i32>>>);

    impl Task for Record {
        fn run(self: Box<Self>) {
            self.1.lock().unwrap().push(self.0);
        }

        fn aborted(self: Box<Self>) {
            self.1.lock().unwrap().push(-self.0);
        }
    }

    #[test]
    fn low_concurrency_picks_sequential() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = job_queue(1, Interrupt::new()).unwrap();
        queue.add(Box::new(Record(1, log.clone()))).unwrap();
        queue.add(Box::new(Record(2, log.clone()))).unwrap();
        // Sequential execution is visible before finish.
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
        queue.finish().unwrap();
    }

    #[test]
    fn add_after_finish_aborts() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut queue = ConcurrentJobQueue::new(2, Interrupt::new()).unwrap();
        queue.finish().unwrap();
        queue.finish().unwrap();
        let err = queue.add(Box::new(Record(7, log.clone()))).unwrap_err();
        assert!(matches!(err, Error::QueueClosed));
        assert_eq!(*log.lock().unwrap(), vec![-7]);
    }

    #[test]
    fn zero_limit_is_clamped() {
        let queue = ConcurrentJobQueue::new(0, Interrupt::new()).unwrap();
        assert_eq!(queue.limit(), 1);
        assert_eq!(queue.in_flight(), 0);
    }
}

//! Live multi-line terminal progress display with a sequential or
//! bounded-parallel job queue.

pub mod bar;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod interrupt;
pub mod logging;
pub mod queue;
pub mod term;
pub mod workload;

pub use display::{Display, DisplayOptions, Item};
pub use error::{Error, Result};
pub use interrupt::Interrupt;
pub use queue::{ConcurrentJobQueue, JobQueue, SequentialJobQueue, Task, finish_all, job_queue};
pub use term::Tone;

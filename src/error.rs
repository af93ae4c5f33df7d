//! Error types shared by the display and the job queues.

use thiserror::Error;

/// Errors from rendering and scheduling operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot attach detail lines to hidden item #{index}")]
    HiddenItem { index: usize },

    #[error("cannot hide item #{index} while it carries {lines} detail line(s)")]
    HideWithDetail { index: usize, lines: usize },

    #[error("Interrupted")]
    Interrupted,

    #[error("job queue is already finished")]
    QueueClosed,

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("worker completion channel closed unexpectedly")]
    ChannelClosed,

    #[error("terminal write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

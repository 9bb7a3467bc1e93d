//! Search Input Pipeline
//!
//! Turns a stream of raw query edits into a sparser stream of queries worth
//! sending to the archive.
//!
//! - **Debounce**: a query is only emitted once input has been quiet for the
//!   debounce window
//! - **Throttle**: consecutive emissions are at least the throttle interval apart
//!
//! Every new edit replaces the pending query and restarts the debounce window,
//! which also cancels any throttle wait in progress. When the input closes,
//! the last pending query is still emitted on schedule.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Default quiet period before a query is emitted
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default minimum spacing between emitted queries
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(800);

/// Debounce + throttle stage for search input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchPipeline {
    debounce: Duration,
    throttle: Duration,
}

impl Default for SearchPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, DEFAULT_THROTTLE)
    }
}

impl SearchPipeline {
    #[must_use]
    pub fn new(debounce: Duration, throttle: Duration) -> Self {
        Self { debounce, throttle }
    }

    /// Run the pipeline on a background task
    ///
    /// The returned receiver yields emitted queries and closes once `input`
    /// has closed and the last pending query has been flushed.
    #[must_use]
    pub fn spawn(self, input: mpsc::Receiver<String>) -> (mpsc::Receiver<String>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(self.run(input, tx));
        (rx, task)
    }

    /// Drive the pipeline until input closes or the output is dropped
    pub async fn run(self, mut input: mpsc::Receiver<String>, output: mpsc::Sender<String>) {
        let mut pending: Option<String> = None;
        let mut deadline: Option<Instant> = None;
        let mut last_emit: Option<Instant> = None;
        let mut closed = false;

        loop {
            if closed && pending.is_none() {
                break;
            }

            let timer = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                edit = input.recv(), if !closed => match edit {
                    Some(query) => {
                        pending = Some(query);
                        deadline = Some(Instant::now() + self.debounce);
                    }
                    None => {
                        closed = true;
                    }
                },
                () = timer => {
                    let now = Instant::now();
                    if let Some(earliest) = last_emit.map(|at| at + self.throttle) {
                        if now < earliest {
                            deadline = Some(earliest);
                            continue;
                        }
                    }

                    deadline = None;
                    if let Some(query) = pending.take() {
                        debug!(%query, "Search query emitted");
                        last_emit = Some(now);
                        if output.send(query).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}

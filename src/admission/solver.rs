// Solver - runs puzzle search off the event-handling path
//
// The search is CPU-bound, so it goes to tokio's blocking pool. A shared
// flag lets a timeout or a shutdown stop the worker between nonce batches.

use super::puzzle::{Puzzle, PuzzleProof, MAX_DIFFICULTY};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors reported to whoever asked for a proof
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("Puzzle solving timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    #[error("Puzzle solving was cancelled")]
    Cancelled,

    #[error("Difficulty {0} exceeds the digest length")]
    DifficultyTooHigh(u32),

    #[error("Solver worker failed: {0}")]
    WorkerFailed(String),
}

/// Async front-end for [`Puzzle::solve_with_cancel`]
#[derive(Clone, Debug)]
pub struct PuzzleSolver {
    timeout: Duration,
}

impl PuzzleSolver {
    /// Create a solver that gives up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Get the configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Solve with a private cancel flag (only the timeout can stop it)
    pub async fn solve(&self, challenge: String, difficulty: u32) -> Result<PuzzleProof, SolveError> {
        self.solve_with_flag(challenge, difficulty, Arc::new(AtomicBool::new(false)))
            .await
    }

    /// Solve, stopping early if `cancel` is raised by someone else
    pub async fn solve_with_flag(
        &self,
        challenge: String,
        difficulty: u32,
        cancel: Arc<AtomicBool>,
    ) -> Result<PuzzleProof, SolveError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(SolveError::DifficultyTooHigh(difficulty));
        }

        let worker_flag = Arc::clone(&cancel);
        let worker = tokio::task::spawn_blocking(move || {
            Puzzle::solve_with_cancel(&challenge, difficulty, &worker_flag)
        });

        match tokio::time::timeout(self.timeout, worker).await {
            Ok(Ok(Some(proof))) => {
                tracing::debug!(nonce = proof.nonce(), difficulty, "puzzle solved");
                Ok(proof)
            }
            Ok(Ok(None)) => Err(SolveError::Cancelled),
            Ok(Err(e)) => Err(SolveError::WorkerFailed(e.to_string())),
            Err(_) => {
                // Dropping the JoinHandle does not stop a blocking task
                cancel.store(true, Ordering::Relaxed);
                Err(SolveError::TimedOut {
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }
}

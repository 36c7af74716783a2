// Admission module - WHO GETS IN
// Proof-of-work puzzles that gate transaction acceptance

mod puzzle;
mod solver;

pub use puzzle::{Puzzle, PuzzleProof, CANCEL_CHECK_INTERVAL, MAX_DIFFICULTY};
pub use solver::{PuzzleSolver, SolveError};

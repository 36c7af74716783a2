// Puzzle - proof-of-work gate for transaction admission
//
// A proof is valid when SHA256(challenge || decimal(nonce)) rendered as
// lowercase hex starts with `difficulty` '0' characters. Solving costs
// ~16^difficulty digests; verifying costs one.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};

/// Length of a SHA-256 digest in hex characters
pub const MAX_DIFFICULTY: u32 = 64;

/// How many nonces to try between cancellation checks
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// A solved puzzle attached to a transaction
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PuzzleProof {
    challenge: String,
    nonce: u64,
    difficulty: u32,
}

impl PuzzleProof {
    /// Create a proof from parts (no validation)
    pub fn new(challenge: impl Into<String>, nonce: u64, difficulty: u32) -> Self {
        Self {
            challenge: challenge.into(),
            nonce,
            difficulty,
        }
    }

    /// Get the challenge string
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Get the nonce
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Get the claimed difficulty
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Hex digest this proof commits to
    pub fn digest(&self) -> String {
        Puzzle::digest(&self.challenge, self.nonce)
    }
}

/// Proof-of-work solver and verifier
pub struct Puzzle;

impl Puzzle {
    /// Hex digest of `challenge` followed by the decimal nonce
    pub fn digest(challenge: &str, nonce: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(challenge.as_bytes());
        hasher.update(nonce.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Check the leading-zero rule for a hex digest
    pub fn meets_difficulty(digest: &str, difficulty: u32) -> bool {
        if difficulty > MAX_DIFFICULTY {
            return false;
        }
        let difficulty = difficulty as usize;
        digest.len() >= difficulty && digest.bytes().take(difficulty).all(|b| b == b'0')
    }

    /// Search nonces from 0 until one satisfies the difficulty.
    ///
    /// Blocks the calling thread; run it off the event path (see
    /// [`PuzzleSolver`](crate::admission::PuzzleSolver)). Difficulties above
    /// [`MAX_DIFFICULTY`] are clamped to it.
    pub fn solve(challenge: &str, difficulty: u32) -> PuzzleProof {
        let difficulty = difficulty.min(MAX_DIFFICULTY);
        let mut nonce = 0u64;
        loop {
            if Self::meets_difficulty(&Self::digest(challenge, nonce), difficulty) {
                return PuzzleProof::new(challenge, nonce, difficulty);
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    /// Like [`Puzzle::solve`], but gives up once `cancel` is raised.
    ///
    /// Returns `None` on cancellation or when the difficulty is out of range.
    pub fn solve_with_cancel(
        challenge: &str,
        difficulty: u32,
        cancel: &AtomicBool,
    ) -> Option<PuzzleProof> {
        if difficulty > MAX_DIFFICULTY {
            return None;
        }

        let mut nonce = 0u64;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return None;
            }

            if Self::meets_difficulty(&Self::digest(challenge, nonce), difficulty) {
                return Some(PuzzleProof::new(challenge, nonce, difficulty));
            }

            nonce = nonce.checked_add(1)?;
        }
    }

    /// Recompute the digest and check the prefix. Never panics.
    pub fn verify(proof: &PuzzleProof) -> bool {
        if proof.difficulty > MAX_DIFFICULTY {
            return false;
        }
        Self::meets_difficulty(&proof.digest(), proof.difficulty)
    }
}

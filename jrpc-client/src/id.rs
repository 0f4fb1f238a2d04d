//! Request id generation
//!
//! The client asks an [`IdGenerator`] for an id whenever a request is sent without
//! one. Any `Fn() -> Id` closure is a generator.

use jrpc_core::Id;
use rand::Rng;
use std::sync::atomic::{AtomicI64, Ordering};

const ALPHABET: &[u8] = b"_-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Source of ids for requests sent without one
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Id;
}

impl<F> IdGenerator for F
where
    F: Fn() -> Id + Send + Sync,
{
    fn next_id(&self) -> Id {
        self()
    }
}

/// Random URL-safe string ids
///
/// The default length of 20 characters over a 64-symbol alphabet makes collisions
/// between in-flight calls negligible.
#[derive(Debug, Clone)]
pub struct RandomIdGenerator {
    len: usize,
}

impl RandomIdGenerator {
    pub const DEFAULT_LEN: usize = 20;

    pub fn new() -> Self {
        Self {
            len: Self::DEFAULT_LEN,
        }
    }

    /// Generate ids of `len` characters
    pub fn with_len(len: usize) -> Self {
        Self { len: len.max(1) }
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> Id {
        let mut rng = rand::thread_rng();
        let id: String = (0..self.len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Id::String(id)
    }
}

/// Integer ids counting up from a starting value
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicI64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> Id {
        Id::Number(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

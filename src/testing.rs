//! Test helpers: scripted randomness and counting destructors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand_core::{impls, RngCore};

use crate::registry::Destructor;

/// An `RngCore` that replays a fixed list of `u32` values, cycling when exhausted.
///
/// Every registry decision draws one `next_u32`, so a script fixes pruning
/// gates, eviction targets and victim choices exactly.
#[derive(Debug, Clone)]
pub struct SequenceRng {
    values: Vec<u32>,
    pos: usize,
}

impl SequenceRng {
    pub fn new(values: Vec<u32>) -> Self {
        assert!(!values.is_empty(), "SequenceRng needs at least one value");
        SequenceRng { values, pos: 0 }
    }

    /// A generator that returns `value` forever.
    pub fn constant(value: u32) -> Self {
        Self::new(vec![value])
    }

    /// Number of values drawn so far.
    pub fn draws(&self) -> usize {
        self.pos
    }
}

impl RngCore for SequenceRng {
    fn next_u32(&mut self) -> u32 {
        let value = self.values[self.pos % self.values.len()];
        self.pos += 1;
        value
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// A destructor that only counts its calls.
pub fn counting_destructor() -> (Destructor, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let destroy = Destructor::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (destroy, count)
}

/// Installs a `tracing` subscriber that writes through the test harness.
/// Safe to call from every test; only the first call installs anything.
#[cfg(feature = "test-utils")]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).with_test_writer().try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_rng_cycles() {
        let mut rng = SequenceRng::new(vec![3, 5]);
        assert_eq!(rng.next_u32(), 3);
        assert_eq!(rng.next_u32(), 5);
        assert_eq!(rng.next_u32(), 3);
        assert_eq!(rng.draws(), 3);
    }

    #[test]
    fn test_counting_destructor() {
        let (destroy, count) = counting_destructor();
        destroy.call(&crate::primitives::Object::Pipe(1));
        destroy.call(&crate::primitives::Object::Pipe(2));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}

//! Monotonic identifier allocator for mmid values.
//!
//! Every tagging pass draws its identifiers from one counter per session.
//! Identifiers from different passes therefore never collide numerically,
//! even though a stale identifier may still match nothing (or the wrong
//! element) after the page changed. Callers are expected to re-snapshot
//! rather than reuse identifiers across passes.

use crate::error::{Error, Result};

/// Allocates mmid values as decimal strings, strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmidCounter {
    next: u64,
}

impl MmidCounter {
    /// A fresh counter. The first identifier handed out is "1".
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// A counter that resumes from a previous pass.
    pub fn seeded(seed: u64) -> Self {
        Self { next: seed }
    }

    /// The value the next allocation will use. This is what gets passed
    /// into the in-page reducer as its starting point.
    pub fn seed(&self) -> u64 {
        self.next
    }

    /// Hand out the next identifier.
    pub fn next(&mut self) -> String {
        let value = self.next;
        self.next += 1;
        value.to_string()
    }

    /// Fast-forward to the value reported back by a tagging pass.
    /// Rejects regression: a reducer can only consume identifiers, never
    /// return them.
    pub fn advance_to(&mut self, value: u64) -> Result<()> {
        if value < self.next {
            return Err(Error::CounterRegressed {
                seed: self.next,
                returned: value,
            });
        }
        self.next = value;
        Ok(())
    }
}

impl Default for MmidCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_counter_starts_at_one() {
        let mut counter = MmidCounter::new();
        assert_eq!(counter.seed(), 1);
        assert_eq!(counter.next(), "1");
        assert_eq!(counter.next(), "2");
        assert_eq!(counter.next(), "3");
        assert_eq!(counter.seed(), 4);
    }

    #[test]
    fn seeded_counter_resumes() {
        let mut counter = MmidCounter::seeded(17);
        assert_eq!(counter.next(), "17");
        assert_eq!(counter.next(), "18");
    }

    #[test]
    fn advance_to_accepts_forward_and_equal() {
        let mut counter = MmidCounter::new();
        counter.advance_to(1).unwrap();
        counter.advance_to(9).unwrap();
        assert_eq!(counter.next(), "9");
    }

    #[test]
    fn advance_to_rejects_regression() {
        let mut counter = MmidCounter::seeded(10);
        let err = counter.advance_to(5).unwrap_err();
        assert!(matches!(
            err,
            Error::CounterRegressed {
                seed: 10,
                returned: 5
            }
        ));
        // counter state is untouched on failure
        assert_eq!(counter.seed(), 10);
    }
}

//! Provider selection strategies.

use rand::Rng;

/// Chooses one provider out of the live candidates for a service.
pub trait Selector: Send + Sync {
    /// Index into `candidates`, or `None` when there is nothing to pick.
    fn select(&self, candidates: &[String]) -> Option<usize>;
}

/// Uniform random choice. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelector;

impl Selector for RandomSelector {
    fn select(&self, candidates: &[String]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        Some(rng.gen_range(0..candidates.len()))
    }
}

/// Always picks the same position, wrapping around the candidate count.
///
/// Useful for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub usize);

impl Selector for FixedSelector {
    fn select(&self, candidates: &[String]) -> Option<usize> {
        if candidates.is_empty() {
            None
        } else {
            Some(self.0 % candidates.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("10.0.0.{}:4100", i)).collect()
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(RandomSelector.select(&[]), None);
        assert_eq!(FixedSelector(3).select(&[]), None);
    }

    #[test]
    fn test_random_selector_in_range() {
        let list = candidates(3);
        for _ in 0..100 {
            let idx = RandomSelector.select(&list).unwrap();
            assert!(idx < 3);
        }
    }

    #[test]
    fn test_random_selector_reaches_every_candidate() {
        let list = candidates(3);
        let mut seen = [false; 3];
        for _ in 0..1000 {
            seen[RandomSelector.select(&list).unwrap()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_fixed_selector_wraps() {
        let list = candidates(2);
        assert_eq!(FixedSelector(0).select(&list), Some(0));
        assert_eq!(FixedSelector(3).select(&list), Some(1));
    }
}

//! Folding recorded responses into per-option counts.
//!
//! Tallies are never stored: they are recomputed from the response set on
//! every read. The fold is commutative and associative, so partial tallies
//! over disjoint response sets combine into the tally of their union.

use log::warn;
use serde::{Deserialize, Serialize};

/// Per-option counts, aligned positionally to a resource's option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    pub counts: Vec<u64>,
    pub total: u64,
}

impl TallyResult {
    /// A tally with no responses over `option_count` options.
    pub fn empty(option_count: usize) -> Self {
        Self {
            counts: vec![0; option_count],
            total: 0,
        }
    }

    /// Fold `choices` into a tally over `option_count` options.
    pub fn tally<I>(option_count: usize, choices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        choices
            .into_iter()
            .fold(Self::empty(option_count), |mut tally, choice| {
                tally.record(choice);
                tally
            })
    }

    /// Count a single choice. Out-of-range choices are skipped and leave the
    /// tally unchanged; returns whether the choice was counted.
    pub fn record(&mut self, choice: usize) -> bool {
        match self.counts.get_mut(choice) {
            Some(count) => {
                *count += 1;
                self.total += 1;
                true
            }
            None => {
                warn!(
                    "Skipping out-of-range choice {choice} for {} options",
                    self.counts.len()
                );
                false
            }
        }
    }

    /// Combine two partial tallies over the same option list.
    ///
    /// Only used to check that partitioned tallies agree with a whole one.
    ///
    /// # Panics
    ///
    /// Panics if the tallies cover different numbers of options.
    #[cfg(test)]
    pub fn merge(mut self, other: &TallyResult) -> Self {
        assert_eq!(self.counts.len(), other.counts.len());
        for (count, extra) in self.counts.iter_mut().zip(other.counts.iter()) {
            *count += extra;
        }
        self.total += other.total;
        self
    }
}

/// Tally multi-question answers: one [`TallyResult`] per question, where
/// `option_counts[q]` is the number of options question `q` has and each
/// answer holds one choice per question, positionally.
pub fn tally_answers<I, A>(option_counts: &[usize], answers: I) -> Vec<TallyResult>
where
    I: IntoIterator<Item = A>,
    A: AsRef<[u32]>,
{
    let mut tallies: Vec<_> = option_counts
        .iter()
        .map(|&count| TallyResult::empty(count))
        .collect();
    for answer in answers {
        for (tally, &choice) in tallies.iter_mut().zip(answer.as_ref()) {
            tally.record(choice as usize);
        }
    }
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_option_poll() {
        let tally = TallyResult::tally(2, vec![0, 1, 1]);
        assert_eq!(
            tally,
            TallyResult {
                counts: vec![1, 2],
                total: 3
            }
        );
    }

    #[test]
    fn no_responses() {
        let tally = TallyResult::tally(4, Vec::new());
        assert_eq!(tally.counts, vec![0, 0, 0, 0]);
        assert_eq!(tally.total, 0);
    }

    #[test]
    fn counts_sum_to_total() {
        let choices: Vec<usize> = (0..97).map(|i| (i * 7 + 3) % 5).collect();
        let tally = TallyResult::tally(5, choices.clone());
        assert_eq!(tally.counts.len(), 5);
        assert_eq!(tally.counts.iter().sum::<u64>(), tally.total);
        assert_eq!(tally.total, choices.len() as u64);
    }

    #[test]
    fn out_of_range_choices_are_skipped() {
        let mut tally = TallyResult::empty(2);
        assert!(tally.record(1));
        assert!(!tally.record(2));
        assert!(!tally.record(usize::MAX));
        assert_eq!(tally.counts, vec![0, 1]);
        assert_eq!(tally.total, 1);
        assert_eq!(tally.counts.iter().sum::<u64>(), tally.total);
    }

    #[test]
    fn order_does_not_matter() {
        let forwards = TallyResult::tally(3, vec![0, 2, 2, 1, 0, 2]);
        let backwards = TallyResult::tally(3, vec![2, 0, 1, 2, 2, 0]);
        assert_eq!(forwards, backwards);
    }

    #[test]
    fn partitioned_tallies_merge() {
        let choices = vec![0, 1, 1, 2, 0, 1, 2, 2, 2];
        let whole = TallyResult::tally(3, choices.clone());
        let (left, right) = choices.split_at(4);
        let merged = TallyResult::tally(3, left.to_vec())
            .merge(&TallyResult::tally(3, right.to_vec()));
        assert_eq!(whole, merged);
    }

    #[test]
    #[should_panic]
    fn merging_mismatched_tallies_panics() {
        let _ = TallyResult::empty(2).merge(&TallyResult::empty(3));
    }

    #[test]
    fn answers_tally_per_question() {
        let answers = vec![vec![0, 2], vec![1, 2], vec![1, 0]];
        let tallies = tally_answers(&[2, 3], answers);
        assert_eq!(tallies.len(), 2);
        assert_eq!(tallies[0].counts, vec![1, 2]);
        assert_eq!(tallies[0].total, 3);
        assert_eq!(tallies[1].counts, vec![1, 0, 2]);
        assert_eq!(tallies[1].total, 3);
    }
}

//! Unbiased Fisher–Yates permutations.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An element of a shuffled sequence together with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indexed<T> {
    /// The shuffled element.
    pub item: T,
    /// Position of `item` in the sequence that was shuffled.
    pub original_index: usize,
}

/// Returns a uniformly random permutation of `items`, leaving the input untouched.
///
/// Walks `i` from `n - 1` down to `1`, draws `j` uniformly from `0..=i` and
/// swaps positions `i` and `j`.
pub fn shuffle<T, R>(items: &[T], rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let mut shuffled = items.to_vec();
    fisher_yates(&mut shuffled, rng);
    shuffled
}

/// Like [`shuffle`], but each output slot remembers where its item came from.
///
/// `output[k].item == items[output[k].original_index]` for every `k`.
pub fn shuffle_with_index<T, R>(items: &[T], rng: &mut R) -> Vec<Indexed<T>>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let mut indexed: Vec<Indexed<T>> = items
        .iter()
        .cloned()
        .enumerate()
        .map(|(original_index, item)| Indexed {
            item,
            original_index,
        })
        .collect();
    fisher_yates(&mut indexed, rng);
    indexed
}

fn fisher_yates<T, R>(slots: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    for i in (1..slots.len()).rev() {
        let j = rng.gen_range(0..=i);
        slots.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngHandle;

    #[test]
    fn empty_and_singleton_inputs_are_copied() {
        let mut rng = RngHandle::from_seed(3);
        let empty: Vec<u8> = Vec::new();
        assert!(shuffle(&empty, &mut rng).is_empty());
        assert!(shuffle_with_index(&empty, &mut rng).is_empty());
        assert_eq!(shuffle(&["only"], &mut rng), vec!["only"]);
        assert_eq!(
            shuffle_with_index(&["only"], &mut rng),
            vec![Indexed {
                item: "only",
                original_index: 0
            }]
        );
    }

    #[test]
    fn every_permutation_of_three_is_reachable() {
        let mut rng = RngHandle::from_seed(11);
        let input = [1, 2, 3];
        let mut counts = std::collections::BTreeMap::new();
        for _ in 0..6_000 {
            *counts.entry(shuffle(&input, &mut rng)).or_insert(0usize) += 1;
        }
        assert_eq!(counts.len(), 6);
        for count in counts.values() {
            // Expected 1000 each; a biased shuffle lands far outside this band.
            assert!((800..1200).contains(count), "count {count} out of band");
        }
    }
}

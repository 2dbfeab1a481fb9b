use proptest::prelude::*;
use study_core::rng::RngHandle;
use study_core::{shuffle, shuffle_with_index};

proptest! {
    #[test]
    fn shuffle_is_a_permutation(seed in any::<u64>(), items in proptest::collection::vec(any::<i32>(), 0..40)) {
        let mut rng = RngHandle::from_seed(seed);
        let before = items.clone();
        let shuffled = shuffle(&items, &mut rng);
        prop_assert_eq!(&items, &before);
        prop_assert_eq!(shuffled.len(), items.len());
        let mut sorted_in = items.clone();
        let mut sorted_out = shuffled;
        sorted_in.sort();
        sorted_out.sort();
        prop_assert_eq!(sorted_in, sorted_out);
    }

    #[test]
    fn indexed_shuffle_tracks_origins(seed in any::<u64>(), items in proptest::collection::vec(".{0,6}", 0..30)) {
        let mut rng = RngHandle::from_seed(seed);
        let shuffled = shuffle_with_index(&items, &mut rng);
        prop_assert_eq!(shuffled.len(), items.len());
        let mut origins: Vec<usize> = shuffled.iter().map(|entry| entry.original_index).collect();
        origins.sort_unstable();
        prop_assert_eq!(origins, (0..items.len()).collect::<Vec<_>>());
        for entry in &shuffled {
            prop_assert_eq!(&entry.item, &items[entry.original_index]);
        }
    }
}

#[test]
fn same_seed_same_order() {
    let items: Vec<u32> = (0..20).collect();
    let a = shuffle(&items, &mut RngHandle::from_seed(99));
    let b = shuffle(&items, &mut RngHandle::from_seed(99));
    assert_eq!(a, b);
}

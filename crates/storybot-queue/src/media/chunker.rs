// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Anything that carries a declared size in MiB.
pub trait DeclaredSize {
    fn declared_size_mb(&self) -> u64;
}

/// Packs `items` left to right into albums of at most `max_items` entries
/// whose declared sizes add up to at most `max_total_mb`.
///
/// Order is preserved and nothing is dropped. An item larger than the
/// ceiling on its own gets an album to itself.
pub fn chunk<T: DeclaredSize>(items: Vec<T>, max_items: usize, max_total_mb: u64) -> Vec<Vec<T>> {
    let max_items = max_items.max(1);
    let mut batches = Vec::new();
    let mut current: Vec<T> = Vec::new();
    let mut total = 0u64;

    for item in items {
        let size = item.declared_size_mb();
        if !current.is_empty()
            && (current.len() == max_items || total.saturating_add(size) > max_total_mb)
        {
            batches.push(std::mem::take(&mut current));
            total = 0;
        }
        total = total.saturating_add(size);
        current.push(item);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Tagged(usize, u64);

    impl DeclaredSize for Tagged {
        fn declared_size_mb(&self) -> u64 {
            self.1
        }
    }

    fn items(sizes: &[u64]) -> Vec<Tagged> {
        sizes.iter().enumerate().map(|(i, s)| Tagged(i, *s)).collect()
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(chunk(Vec::<Tagged>::new(), 10, 50).is_empty());
    }

    #[test]
    fn splits_on_item_count() {
        let batches = chunk(items(&[1; 23]), 10, 50);
        let lens: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![10, 10, 3]);
    }

    #[test]
    fn splits_on_cumulative_size() {
        let batches = chunk(items(&[20, 20, 20, 5]), 10, 50);
        let lens: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![2, 2]);
    }

    #[test]
    fn oversized_item_stands_alone() {
        let batches = chunk(items(&[3, 70, 3]), 10, 50);
        let lens: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![1, 1, 1]);
    }

    proptest! {
        #[test]
        fn batches_respect_limits_and_order(
            sizes in proptest::collection::vec(0u64..60, 0..60),
            max_items in 1usize..=10,
            ceiling in 1u64..=50,
        ) {
            let input = items(&sizes);
            let batches = chunk(input.clone(), max_items, ceiling);

            for batch in &batches {
                prop_assert!(!batch.is_empty());
                prop_assert!(batch.len() <= max_items);
                let total: u64 = batch.iter().map(|i| i.1).sum();
                prop_assert!(total <= ceiling || batch.len() == 1);
            }

            let flattened: Vec<Tagged> = batches.into_iter().flatten().collect();
            prop_assert_eq!(flattened, input);
        }
    }
}

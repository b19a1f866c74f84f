//! Fixed-size batching of an entity's reviews

/// Split `items` into contiguous chunks of at most `size` elements
///
/// Order is preserved; every chunk has `size` elements except possibly the
/// last. An empty input yields no batches. A `size` of zero is treated as one.
pub fn make_batches<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

/// Number of batches `make_batches` would produce
pub fn batch_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_partition_in_order() {
        let items: Vec<u32> = (1..=25).collect();
        let batches = make_batches(&items, 20);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 20);
        assert_eq!(batches[1], vec![21, 22, 23, 24, 25]);
        assert_eq!(batches.concat(), items);
    }

    #[test]
    fn test_batch_sizes_for_all_lengths() {
        for size in 1..=7usize {
            for n in 0..=30usize {
                let items: Vec<usize> = (0..n).collect();
                let batches = make_batches(&items, size);

                assert_eq!(batches.len(), batch_count(n, size));
                assert_eq!(batches.len(), n.div_ceil(size));
                if let Some((last, full)) = batches.split_last() {
                    assert!(full.iter().all(|b| b.len() == size));
                    assert!((1..=size).contains(&last.len()));
                }
                assert_eq!(batches.concat(), items);
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<String> = Vec::new();
        assert!(make_batches(&items, 20).is_empty());
    }

    #[test]
    fn test_exact_multiple() {
        let items = vec!["a"; 40];
        let batches = make_batches(&items, 20);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 20));
    }
}

use std::collections::BTreeSet;

/// True if every element is strictly greater than the one before it. Empty and single-element
/// slices qualify.
pub fn is_strictly_increasing<T: PartialOrd>(items: &[T]) -> bool {
    items.windows(2).all(|pair| pair[0] < pair[1])
}

/// The sorted, duplicate-free union of two sequences. Neither input needs to be sorted.
pub fn sorted_union<T: Ord + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter()
        .chain(b.iter())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_increasing() {
        assert!(is_strictly_increasing::<u32>(&[]));
        assert!(is_strictly_increasing(&[4]));
        assert!(is_strictly_increasing(&[0, 1, 5, 9]));
        assert!(!is_strictly_increasing(&[0, 1, 1, 2]));
        assert!(!is_strictly_increasing(&[3, 2]));
    }

    #[test]
    fn union_sorts_and_dedups() {
        assert_eq!(sorted_union(&[3, 7, 7], &[4, 2]), vec![2, 3, 4, 7]);
        assert_eq!(sorted_union::<u32>(&[], &[]), Vec::<u32>::new());
    }
}

//! Small collection helpers.

use std::collections::BTreeSet;

/// Returns the distinct items of `items` in ascending order.
///
/// ```
/// use predictables_report::util::sorted_unique;
///
/// assert_eq!(sorted_unique(vec![3, 1, 3, 2]), vec![1, 2, 3]);
/// ```
pub fn sorted_unique<T, I>(items: I) -> Vec<T>
where
    T: Ord,
    I: IntoIterator<Item = T>,
{
    items.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

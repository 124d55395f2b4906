//! Pagination over a collection.

/// Up to `count` entries starting at `offset`. An offset outside the
/// collection (negative, or at or past the end) yields nothing.
///
/// ```
/// use folio_engine::pager::slice;
///
/// let entries = [1, 2, 3];
/// assert_eq!(slice(&entries, 1, 5), &[2, 3]);
/// assert!(slice(&entries, -1, 1).is_empty());
/// assert!(slice(&entries, 3, 1).is_empty());
/// ```
pub fn slice<T>(entries: &[T], offset: isize, count: usize) -> &[T] {
    let Ok(start) = usize::try_from(offset) else {
        return &[];
    };
    if start >= entries.len() {
        return &[];
    }
    let end = start.saturating_add(count).min(entries.len());
    &entries[start..end]
}

/// Offset of the entry `step` places away from `cursor`.
pub(crate) fn step(cursor: usize, step: isize) -> isize {
    isize::try_from(cursor).map_or(isize::MAX, |cursor| cursor.saturating_add(step))
}

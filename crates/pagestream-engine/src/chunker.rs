//! Pure chunk planning: split a flat record sequence into bounded groups.
//!
//! Two passes. The count pass bounds items per chunk (sink request limit,
//! default 500). The byte pass re-splits any chunk whose total serialized
//! size would exceed the per-request cap. Both preserve original order and
//! contiguity; neither reorders or drops items.

/// Split `items` into contiguous groups of at most `max_items`, in original
/// order. The final group may be shorter. `max_items` must be non-zero.
pub fn split_into_chunks<T>(items: &[T], max_items: usize) -> Vec<&[T]> {
    assert!(max_items > 0, "max_items must be non-zero");
    items.chunks(max_items).collect()
}

/// Re-split a chunk so each group's total size stays at or under
/// `max_bytes`, measured by `size_of`.
///
/// A single item larger than `max_bytes` still gets its own group here;
/// flagging oversized records is the delivery channel's pre-flight concern,
/// not the chunker's.
pub fn split_by_bytes<'a, T>(
    chunk: &'a [T],
    max_bytes: usize,
    size_of: impl Fn(&T) -> usize,
) -> Vec<&'a [T]> {
    assert!(max_bytes > 0, "max_bytes must be non-zero");

    let mut groups = Vec::new();
    let mut start = 0;
    let mut group_bytes = 0usize;

    for (i, item) in chunk.iter().enumerate() {
        let item_bytes = size_of(item);
        if i > start && group_bytes + item_bytes > max_bytes {
            groups.push(&chunk[start..i]);
            start = i;
            group_bytes = 0;
        }
        group_bytes += item_bytes;
    }
    if start < chunk.len() {
        groups.push(&chunk[start..]);
    }
    groups
}

/// Compose both passes: count-bounded chunks, each further split to respect
/// the byte cap.
pub fn plan_chunks<'a, T>(
    items: &'a [T],
    max_items: usize,
    max_bytes: usize,
    size_of: impl Fn(&T) -> usize + Copy,
) -> Vec<&'a [T]> {
    split_into_chunks(items, max_items)
        .into_iter()
        .flat_map(|chunk| split_by_bytes(chunk, max_bytes, size_of))
        .collect()
}

//! Splitting series into write-sized batches.

/// Split `items` into consecutive chunks of at most `max_batch` items.
///
/// Order is preserved and every chunk except possibly the last is full.
/// Empty input gives no chunks.
///
/// # Panics
///
/// Panics if `max_batch` is zero; configuration validation rejects that.
pub fn partition<T>(items: Vec<T>, max_batch: usize) -> Vec<Vec<T>> {
    assert!(max_batch > 0, "max_batch must be greater than 0");

    let mut chunks = Vec::with_capacity(items.len().div_ceil(max_batch));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(max_batch).collect());
    }
    chunks
}

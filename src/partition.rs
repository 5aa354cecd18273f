use crate::model::Chunk;

/// Inputs shorter than this are applied by a single worker.
pub const SMALL_INPUT_THRESHOLD: usize = 20;

/// Default worker count: half of the logical CPUs, at least one.
pub fn parallelism_hint() -> usize {
    (num_cpus::get() / 2).max(1)
}

/// Split `len` lines into contiguous chunks for at most `parallelism`
/// workers.
///
/// Chunks are `len / parallelism` lines long, clamped to at least one; the
/// last chunk absorbs the remainder so the chunks always cover `[0, len)`
/// exactly.
pub fn partition(len: usize, parallelism: usize) -> Vec<Chunk> {
    if len == 0 {
        return Vec::new();
    }
    if len < SMALL_INPUT_THRESHOLD || parallelism <= 1 {
        return vec![Chunk { start: 0, end: len }];
    }

    let chunk_size = (len / parallelism).max(1);
    let count = (len / chunk_size).min(parallelism);

    (0..count)
        .map(|idx| {
            let start = idx * chunk_size;
            let end = if idx + 1 == count {
                len
            } else {
                start + chunk_size
            };
            Chunk { start, end }
        })
        .collect()
}

/// Size, in bytes, of the leaf chunks a file is split into for Merkle fingerprinting and for
/// the envelope's per-chunk AEAD frames.
pub const FILE_CHUNK_SIZE: usize = 1024 * 1024;

/// Consecutive empty Fisherman ticks after which the scheduler backs off from `batch_interval`
/// to `idle_poll_interval`.
pub const CONSECUTIVE_NO_WORK_BATCHES_THRESHOLD: u8 = 4;

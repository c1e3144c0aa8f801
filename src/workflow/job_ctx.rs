//! Job execution context.
//!
//! Wraps "which bucket is running which job" for log prefixes and result
//! attribution.

use std::fmt::Display;

/// Context for one job execution.
#[derive(Debug, Clone)]
pub struct JobCtx {
    pub job_id: String,
    /// Bucket this job was assigned to (log display only).
    pub bucket: usize,
    /// Position within the bucket, 1-based (log display only).
    pub position: usize,
    /// Jobs in the bucket.
    pub bucket_size: usize,
}

impl JobCtx {
    pub fn new(job_id: String, bucket: usize, position: usize, bucket_size: usize) -> Self {
        Self {
            job_id,
            bucket,
            position,
            bucket_size,
        }
    }
}

impl Display for JobCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[bucket {} | job {}/{}]",
            self.bucket, self.position, self.bucket_size
        )
    }
}

// ============================================
// Background Jobs
// ============================================
//
// - digest_batch: daily strict top-N digest for every registered user
//
// Triggered by the service binary, typically from a Kubernetes CronJob with
// ENGINE_DIGEST_RUN_ONCE=true.

pub mod digest_batch;

pub use digest_batch::{
    BatchJobStats, DigestBatchJob, DigestEntry, DigestSink, LoggingDigestSink, RedisDigestSink,
};

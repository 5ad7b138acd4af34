//! Optional durable snapshot sink (§10.4, outside the kernel).
//!
//! Grounded on `orderbook/analytics/storage/mod.rs`'s RocksDB time-series
//! idiom (key `{symbol}:{unix_timestamp_sec}`, Zstd compression, prefix
//! bloom filter, `spawn_blocking` around every DB call) — now storing
//! already-assembled snapshots rather than raw order-book ticks, per the
//! "no long-term storage of raw ticks" non-goal (§1). `NoopSink` is the
//! default; the kernel's own in-memory windows never depend on this trait
//! for correctness.

use crate::snapshot::Snapshot;

/// `append` receives one already-assembled snapshot per tick. A failure
/// here is a `Transient external failure` (§7): the caller logs it and
/// keeps running rather than tearing down the session.
pub trait SnapshotSink: Send + Sync + 'static {
    fn append(&self, symbol: &str, time_ms: i64, snapshot: &Snapshot) -> anyhow::Result<()>;
}

/// Default sink: discards every snapshot. Used when no durable store is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl SnapshotSink for NoopSink {
    fn append(&self, _symbol: &str, _time_ms: i64, _snapshot: &Snapshot) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(feature = "durable_sink")]
pub use rocks::RocksDbSink;

#[cfg(feature = "durable_sink")]
mod rocks {
    use super::SnapshotSink;
    use crate::snapshot::Snapshot;
    use anyhow::Context;
    use rocksdb::{IteratorMode, Options, WriteBatch, DB};
    use std::path::Path;
    use std::sync::Arc;

    /// RocksDB-backed append-only snapshot log, one key per `(symbol,
    /// unix_timestamp_sec)` pair.
    #[derive(Clone)]
    pub struct RocksDbSink {
        db: Arc<DB>,
    }

    impl RocksDbSink {
        pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            opts.set_write_buffer_size(64 * 1024 * 1024);
            opts.set_max_write_buffer_number(3);
            opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
            opts.set_prefix_extractor(rocksdb::SliceTransform::create_fixed_prefix(10));

            let db = DB::open(&opts, path).context("failed to open RocksDB snapshot sink")?;
            Ok(Self { db: Arc::new(db) })
        }

        /// Delete keys older than `retention_secs`. Intended for a periodic
        /// cleanup sidecar; never called from the hot ingest/emit path.
        pub fn cleanup_older_than(&self, retention_secs: i64, now_unix: i64) -> anyhow::Result<usize> {
            let cutoff = now_unix - retention_secs;
            let mut batch = WriteBatch::default();
            let mut deleted = 0usize;

            for item in self.db.iterator(IteratorMode::Start) {
                let (key, _) = item?;
                let key_str = String::from_utf8_lossy(&key);
                if let Some(ts) = key_str.split(':').nth(1).and_then(|s| s.parse::<i64>().ok()) {
                    if ts < cutoff {
                        batch.delete(&key);
                        deleted += 1;
                    }
                }
            }
            if deleted > 0 {
                self.db.write(batch).context("failed to delete expired snapshots")?;
            }
            Ok(deleted)
        }
    }

    impl SnapshotSink for RocksDbSink {
        fn append(&self, symbol: &str, time_ms: i64, snapshot: &Snapshot) -> anyhow::Result<()> {
            let key = format!("{}:{}", symbol, time_ms / 1000);
            let value = serde_json::to_vec(snapshot).context("failed to encode snapshot")?;
            self.db.put(key.as_bytes(), value).context("failed to write snapshot to RocksDB")?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::config::EngineConfig;
        use crate::engine::Engine;
        use tempfile::TempDir;

        #[test]
        fn appends_and_reads_back_a_snapshot() {
            let dir = TempDir::new().unwrap();
            let sink = RocksDbSink::open(dir.path()).unwrap();
            let mut engine = Engine::new(EngineConfig::default());
            let snap = engine.tick(1_000, None, None);
            sink.append("SOL", 1_000, &snap).unwrap();

            let raw = sink.db.get(b"SOL:1").unwrap().unwrap();
            let decoded: crate::snapshot::Stats = {
                let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
                serde_json::from_value(value["stats"].clone()).unwrap()
            };
            assert_eq!(decoded.events, snap.stats.events);
        }

        #[test]
        fn cleanup_removes_only_expired_keys() {
            let dir = TempDir::new().unwrap();
            let sink = RocksDbSink::open(dir.path()).unwrap();
            let mut engine = Engine::new(EngineConfig::default());
            let snap = engine.tick(0, None, None);
            sink.append("OLD", 0, &snap).unwrap();
            sink.append("NEW", 1_000_000_000_000, &snap).unwrap();

            let deleted = sink.cleanup_older_than(3600, 1_000_000_100).unwrap();
            assert_eq!(deleted, 1);
            assert!(sink.db.get(b"OLD:0").unwrap().is_none());
            assert!(sink.db.get(format!("NEW:{}", 1_000_000_000_000i64 / 1000).as_bytes()).unwrap().is_some());
        }
    }
}

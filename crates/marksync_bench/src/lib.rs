//! Benchmark utilities.

use marksync_protocol::{
    BookmarkRecord, LocalManifest, LocalManifestEntry, RemoteManifest, RemoteManifestEntry,
};
use rand::Rng;

/// Milliseconds "now" used by generated manifests.
pub const BENCH_NOW_MS: u64 = 1_700_000_000_000;

/// Generates a random hex key.
pub fn random_key(rng: &mut impl Rng) -> String {
    format!("{:016x}", rng.gen::<u64>())
}

/// Generates `count` remote records with random keys and hashes.
pub fn random_records(count: usize) -> Vec<BookmarkRecord> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let key = random_key(&mut rng);
            let url = format!("https://{key}.example");
            BookmarkRecord::new(key, url, format!("{:08x}", rng.gen::<u32>()))
        })
        .collect()
}

/// Returns the manifest a remote serving `records` reports.
pub fn manifest_of(records: &[BookmarkRecord]) -> RemoteManifest {
    records
        .iter()
        .map(|r| RemoteManifestEntry::new(r.key.clone(), r.content_hash.clone()))
        .collect()
}

/// Builds a local manifest that agrees with `records` except for a
/// `churn` fraction of keys: half changed remotely, half gone remotely.
pub fn diverged_local(records: &[BookmarkRecord], churn: f64) -> LocalManifest {
    let mut rng = rand::thread_rng();
    let mut local = LocalManifest::new();

    for record in records {
        let hash = if rng.gen_bool(churn / 2.0) {
            "stale".to_string()
        } else {
            record.content_hash.clone()
        };
        local.upsert(LocalManifestEntry::new(
            record.url.clone(),
            record.key.clone(),
            hash,
            BENCH_NOW_MS,
        ));
    }

    let vanished = (records.len() as f64 * churn / 2.0) as usize;
    for _ in 0..vanished {
        let key = random_key(&mut rng);
        local.upsert(LocalManifestEntry::new(
            format!("https://{key}.example"),
            key,
            "gone",
            BENCH_NOW_MS,
        ));
    }
    local
}

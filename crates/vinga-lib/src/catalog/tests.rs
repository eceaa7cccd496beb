//! Tests for the counter catalog and its cache

use super::*;
use crate::provider::fake::FakeProvider;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use tempfile::TempDir;

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// In-memory cache with a controllable modification time
#[derive(Default)]
struct MemoryStore {
    state: Mutex<Option<(String, DateTime<Utc>)>>,
    writes: Mutex<usize>,
    write_time: Option<DateTime<Utc>>,
}

impl MemoryStore {
    fn seeded(contents: &str, modified: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(Some((contents.to_string(), modified))),
            ..Default::default()
        }
    }

    fn contents(&self) -> Option<String> {
        self.state.lock().unwrap().as_ref().map(|(c, _)| c.clone())
    }
}

impl CacheStore for MemoryStore {
    fn modified(&self) -> Result<Option<DateTime<Utc>>, CatalogError> {
        Ok(self.state.lock().unwrap().as_ref().map(|(_, m)| *m))
    }

    fn read(&self) -> Result<String, CatalogError> {
        Ok(self.contents().unwrap_or_default())
    }

    fn write(&self, contents: &str) -> Result<(), CatalogError> {
        *self.writes.lock().unwrap() += 1;
        let modified = self.write_time.unwrap_or_else(Utc::now);
        *self.state.lock().unwrap() = Some((contents.to_string(), modified));
        Ok(())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

fn provider_with_counters() -> FakeProvider {
    let mut provider = FakeProvider::new();
    provider.add_counter(2, "cpu.usage.average");
    provider.add_counter(12, "cpu.ready.summation");
    provider.add_counter(33, "mem.active.average");
    provider
}

#[tokio::test]
async fn test_missing_cache_queries_provider_and_persists() {
    let provider = provider_with_counters();
    let store = MemoryStore::default();

    let catalog = CounterCatalog::load_or_refresh(&provider, &store, &FixedClock(now()))
        .await
        .unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.resolve("cpu.ready.summation").unwrap(), 12);
    assert_eq!(provider.counter_list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.contents().unwrap(),
        "cpu.ready.summation,12\ncpu.usage.average,2\nmem.active.average,33\n"
    );
}

#[tokio::test]
async fn test_fresh_cache_is_used_without_provider() {
    let provider = provider_with_counters();
    let store = MemoryStore::seeded("cpu.usage.average,99\n", now() - chrono::Duration::days(6));

    let catalog = CounterCatalog::load_or_refresh(&provider, &store, &FixedClock(now()))
        .await
        .unwrap();

    assert_eq!(catalog.resolve("cpu.usage.average").unwrap(), 99);
    assert_eq!(provider.counter_list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(*store.writes.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_stale_cache_is_rebuilt_even_if_parseable() {
    let provider = provider_with_counters();
    let store = MemoryStore::seeded(
        "cpu.usage.average,99\n",
        now() - chrono::Duration::days(7) - chrono::Duration::seconds(1),
    );

    let catalog = CounterCatalog::load_or_refresh(&provider, &store, &FixedClock(now()))
        .await
        .unwrap();

    assert_eq!(catalog.resolve("cpu.usage.average").unwrap(), 2);
    assert_eq!(provider.counter_list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*store.writes.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_empty_cache_is_rebuilt() {
    let provider = provider_with_counters();
    let store = MemoryStore::seeded("\n", now());

    let catalog = CounterCatalog::load_or_refresh(&provider, &store, &FixedClock(now()))
        .await
        .unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(provider.counter_list_calls.load(Ordering::SeqCst), 1);
}

/// Cache directory that cannot be written, e.g. read-only
struct ReadOnlyStore;

impl CacheStore for ReadOnlyStore {
    fn modified(&self) -> Result<Option<DateTime<Utc>>, CatalogError> {
        Ok(None)
    }

    fn read(&self) -> Result<String, CatalogError> {
        Ok(String::new())
    }

    fn write(&self, _contents: &str) -> Result<(), CatalogError> {
        Err(CatalogError::Io {
            path: "/var/cache/vinga/vcenter_perfdic.txt".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

#[tokio::test]
async fn test_unwritable_cache_keeps_fetched_catalog() {
    let provider = provider_with_counters();

    let catalog = CounterCatalog::load_or_refresh(&provider, &ReadOnlyStore, &FixedClock(now()))
        .await
        .unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.resolve("cpu.usage.average").unwrap(), 2);
    assert_eq!(provider.counter_list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_file_cache_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileCacheStore::for_provider(temp_dir.path(), crate::models::ProviderKind::VCenter);
    assert!(store.path().ends_with("vcenter_perfdic.txt"));

    let provider = provider_with_counters();
    let first = CounterCatalog::load_or_refresh(&provider, &store, &SystemClock)
        .await
        .unwrap();
    assert!(store.path().exists());

    // Second load must come from the file alone
    let second = CounterCatalog::load_or_refresh(&provider, &store, &SystemClock)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.counter_list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_file_cache_stale_by_clock() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileCacheStore::new(temp_dir.path().join("host_perfdic.txt"));
    store.write("cpu.usage.average,99\n").unwrap();

    let provider = provider_with_counters();
    let later = FixedClock(Utc::now() + chrono::Duration::days(8));
    let catalog = CounterCatalog::load_or_refresh(&provider, &store, &later)
        .await
        .unwrap();

    assert_eq!(catalog.resolve("cpu.usage.average").unwrap(), 2);
    assert_eq!(provider.counter_list_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_file_store_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileCacheStore::new(temp_dir.path().join("absent.txt"));
    assert!(store.modified().unwrap().is_none());
}

#[test]
fn test_parse_cache_skips_malformed_lines() {
    let entries = parse_cache("cpu.usage.average,2\ngarbage\nmem.active.average,abc\n\nnet.received.average, 143\n");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["cpu.usage.average"], 2);
    assert_eq!(entries["net.received.average"], 143);
}

#[test]
fn test_resolve_unknown_counter() {
    let catalog = CounterCatalog::default();
    let err = catalog.resolve("cpu.ready.summation").unwrap_err();
    assert!(matches!(err, CatalogError::UnknownCounter(name) if name == "cpu.ready.summation"));
}

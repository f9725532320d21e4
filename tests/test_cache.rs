//! Cache tests: staleness by ETag, invalidation, and reloading a changed source.
//!
//! Remote sources are served by a tiny HTTP server on a loopback port.

mod common;

use common::{cp949, SAMPLE_CSV};
use produce_price_sdk::{CacheManager, ProducePriceSdk, Source};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

struct Published {
    etag: String,
    body: Vec<u8>,
}

/// Serve `state` for every request and return the file URL.
fn serve(state: Arc<Mutex<Published>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let published = state.lock().unwrap();
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nETag: {}\r\nConnection: close\r\n\r\n",
                published.body.len(),
                published.etag
            );
            let _ = stream.write_all(head.as_bytes());
            if request.starts_with(b"GET") {
                let _ = stream.write_all(&published.body);
            }
        }
    });
    format!("http://{}/data/prices.csv", addr)
}

fn publish(etag: &str, text: &str) -> Arc<Mutex<Published>> {
    Arc::new(Mutex::new(Published {
        etag: etag.to_string(),
        body: cp949(text),
    }))
}

fn cache(dir: &Path, offline: bool) -> CacheManager {
    CacheManager::new(Some(dir.to_path_buf()), offline, Duration::from_secs(10)).unwrap()
}

// ---------------------------------------------------------------------------
// is_stale
// ---------------------------------------------------------------------------

#[test]
fn url_source_is_stale_until_downloaded() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let mut cache = cache(tmp_dir.path(), true);
    let source = Source::Url("https://example.invalid/data/prices.csv".to_string());

    assert!(cache.is_stale(&source));

    fs::write(cache.raw_path(&source), cp949(SAMPLE_CSV)).unwrap();
    assert!(!cache.is_stale(&source));
}

#[test]
fn local_path_is_never_stale() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let mut cache = cache(tmp_dir.path(), true);
    let source = Source::Path(tmp_dir.path().join("missing.csv"));
    assert!(!cache.is_stale(&source));
}

#[test]
fn etag_mismatch_marks_cached_copy_stale() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let url = serve(publish("\"v2\"", SAMPLE_CSV));
    let mut cache = cache(tmp_dir.path(), false);
    let source = Source::Url(url);

    fs::write(cache.raw_path(&source), cp949(SAMPLE_CSV)).unwrap();
    let etag_file = tmp_dir.path().join("prices.csv.etag");

    fs::write(&etag_file, "\"v1\"").unwrap();
    assert!(cache.is_stale(&source));

    fs::write(&etag_file, "\"v2\"").unwrap();
    assert!(!cache.is_stale(&source));
}

// ---------------------------------------------------------------------------
// invalidate / clear
// ---------------------------------------------------------------------------

#[test]
fn invalidate_removes_raw_etag_and_utf8_copies() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let mut cache = cache(tmp_dir.path(), true);
    let source = Source::Url("https://example.invalid/data/prices.csv".to_string());

    let raw = cache.raw_path(&source);
    let etag = tmp_dir.path().join("prices.csv.etag");
    fs::write(&raw, cp949(SAMPLE_CSV)).unwrap();
    fs::write(&etag, "\"v1\"").unwrap();
    let utf8 = cache.ensure_utf8(&source, "cp949").unwrap();
    assert!(raw.exists() && etag.exists() && utf8.exists());

    cache.invalidate(&source).unwrap();
    assert!(!raw.exists());
    assert!(!etag.exists());
    assert!(!utf8.exists());
}

#[test]
fn invalidate_keeps_local_source_file() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = common::write_file(tmp_dir.path(), "prices.csv", &cp949(SAMPLE_CSV));
    let mut cache = cache(&tmp_dir.path().join("cache"), true);
    let source = Source::Path(path.clone());

    let utf8 = cache.ensure_utf8(&source, "cp949").unwrap();
    cache.invalidate(&source).unwrap();
    assert!(!utf8.exists());
    assert!(path.exists());
}

#[test]
fn clear_empties_and_recreates_cache_dir() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let dir = tmp_dir.path().join("cache");
    let cache = cache(&dir, true);
    common::write_file(&dir, "prices.csv", b"x");
    common::write_file(&dir, "prices.csv.etag", b"\"v1\"");

    cache.clear().unwrap();
    assert!(dir.is_dir());
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
}

#[test]
fn same_file_name_in_different_dirs_gets_separate_utf8_copies() {
    let tmp_dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp_dir.path().join("a")).unwrap();
    fs::create_dir_all(tmp_dir.path().join("b")).unwrap();
    let a = common::write_file(&tmp_dir.path().join("a"), "prices.csv", &cp949(SAMPLE_CSV));
    let b = common::write_file(
        &tmp_dir.path().join("b"),
        "prices.csv",
        &cp949(&format!("{}\n", common::HEADER)),
    );
    let mut cache = cache(&tmp_dir.path().join("cache"), true);

    let utf8_a = cache.ensure_utf8(&Source::Path(a), "cp949").unwrap();
    let utf8_b = cache.ensure_utf8(&Source::Path(b), "cp949").unwrap();
    assert_ne!(utf8_a, utf8_b);
    assert_eq!(fs::read_to_string(&utf8_a).unwrap(), SAMPLE_CSV);
}

// ---------------------------------------------------------------------------
// refresh
// ---------------------------------------------------------------------------

#[test]
fn refresh_reloads_when_etag_changes() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let state = publish("\"v1\"", SAMPLE_CSV);
    let url = serve(state.clone());

    let sdk = ProducePriceSdk::builder()
        .source_url(&url)
        .cache_dir(tmp_dir.path())
        .offline(false)
        .build()
        .unwrap();
    assert_eq!(sdk.records().count().unwrap(), 8);
    assert!(!sdk.refresh().unwrap());

    {
        let mut published = state.lock().unwrap();
        published.etag = "\"v2\"".to_string();
        published.body = cp949(&format!(
            "{}고구마,동네슈퍼,광주,2024-01-06,3000,1kg\n",
            SAMPLE_CSV
        ));
    }

    assert!(sdk.refresh().unwrap());
    assert_eq!(sdk.records().count().unwrap(), 9);
    assert_eq!(
        sdk.records().distinct_categories().unwrap().last().map(String::as_str),
        Some("고구마")
    );
    assert_eq!(
        fs::read_to_string(tmp_dir.path().join("prices.csv.etag")).unwrap(),
        "\"v2\""
    );
    assert!(!sdk.refresh().unwrap());
}

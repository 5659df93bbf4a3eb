//! Bounded in-memory LRU cache for the CDN edge.
//!
//! Keyed by a signature-stripped fingerprint of the request URL, so that
//! capability renewals for the same underlying object share a slot. A
//! single mutex covers the whole cache; every critical section is O(1), so
//! contention stays negligible even under load.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// TTL by resource class, as configured for the edge (distinct from the
/// gateway's own `playlist_ttl`/`segment_ttl` — this is how long the edge
/// itself holds a response before re-fetching from origin).
#[derive(Debug, Clone, Copy)]
pub struct EdgeTtlPolicy {
    pub playlist_ttl: i64,
    pub segment_ttl: i64,
    pub static_ttl: i64,
}

/// Resource class used for both TTL selection and analytics labeling.
/// Classification is by path suffix, not full URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    MasterPlaylist,
    VariantPlaylist,
    InitSegment,
    MediaSegment,
    StaticAsset,
    Other,
}

impl ResourceClass {
    pub fn classify(path: &str) -> Self {
        let lower = path.to_lowercase();
        if lower.ends_with("master.m3u8") {
            ResourceClass::MasterPlaylist
        } else if lower.ends_with(".m3u8") {
            ResourceClass::VariantPlaylist
        } else if lower.ends_with("init.mp4") {
            ResourceClass::InitSegment
        } else if lower.ends_with(".m4s") {
            ResourceClass::MediaSegment
        } else if lower.ends_with(".json") {
            ResourceClass::StaticAsset
        } else {
            ResourceClass::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::MasterPlaylist => "master_playlist",
            ResourceClass::VariantPlaylist => "variant_playlist",
            ResourceClass::InitSegment => "init_segment",
            ResourceClass::MediaSegment => "media_segment",
            ResourceClass::StaticAsset => "static_asset",
            ResourceClass::Other => "other",
        }
    }

    pub fn ttl(&self, policy: &EdgeTtlPolicy) -> i64 {
        match self {
            ResourceClass::MasterPlaylist | ResourceClass::VariantPlaylist => policy.playlist_ttl,
            ResourceClass::InitSegment | ResourceClass::MediaSegment => policy.segment_ttl,
            ResourceClass::StaticAsset | ResourceClass::Other => policy.static_ttl,
        }
    }
}

/// One cached response, keyed by `cache_key`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub cache_key: String,
    pub resource: String,
    pub origin_host: String,
    pub content: Vec<u8>,
    pub content_type: String,
    pub stored_at: i64,
    pub expires_at: i64,
    pub size_bytes: usize,
    pub hit_count: u64,
    pub last_accessed_at: i64,
}

impl CacheEntry {
    pub fn resource_type(&self) -> ResourceClass {
        ResourceClass::classify(&self.resource)
    }

    pub fn ttl_remaining(&self, now: i64) -> i64 {
        (self.expires_at - now).max(0)
    }
}

/// Aggregate hit/miss counters plus byte accounting.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub items: usize,
    pub bytes: u64,
}

impl CacheStats {
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }

    pub fn mb(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0)
    }
}

struct Inner {
    entries: IndexMap<String, CacheEntry>,
    max_size: usize,
    hits: u64,
    misses: u64,
    total_bytes: u64,
}

/// Bounded LRU keyed by the normalized (signature-stripped) request URL.
///
/// `IndexMap` gives O(1) lookup plus insertion-order tracking; a hit or a
/// fresh `set` moves its key to the back (most-recently-used), and eviction
/// always removes from the front (`shift_remove_index(0)`).
pub struct EdgeCache {
    inner: Mutex<Inner>,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

impl EdgeCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: IndexMap::new(),
                max_size: max_size.max(1),
                hits: 0,
                misses: 0,
                total_bytes: 0,
            }),
        }
    }

    /// Derive the cache key from a full request URL: strip `exp`/`sig`
    /// query params, re-serialize, and hash if the result is long.
    pub fn cache_key(url: &str) -> String {
        let (canonical, _resource, _host) = normalize_url(url);
        if canonical.len() > 500 {
            let mut hasher = Sha256::new();
            hasher.update(canonical.as_bytes());
            hex::encode(hasher.finalize())
        } else {
            canonical
        }
    }

    /// Fetch an entry by raw URL. Expired entries are purged and counted as
    /// a miss; a hit promotes the entry to most-recently-used.
    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        let key = Self::cache_key(url);
        let mut inner = self.inner.lock().unwrap();
        let now = now_secs();

        let Some(entry) = inner.entries.get(&key).cloned() else {
            inner.misses += 1;
            return None;
        };

        if now > entry.expires_at {
            if let Some(removed) = inner.entries.shift_remove(&key) {
                inner.total_bytes -= removed.size_bytes as u64;
            }
            inner.misses += 1;
            return None;
        }

        inner.hits += 1;
        // Promote to back (most-recently-used) and stamp access metadata.
        inner.entries.shift_remove(&key);
        let mut entry = entry;
        entry.hit_count += 1;
        entry.last_accessed_at = now;
        inner.entries.insert(key, entry.clone());
        Some(entry)
    }

    /// Store `content` under `url`'s normalized key, evicting
    /// least-recently-used entries until the new entry fits within
    /// `max_size`.
    pub fn set(&self, url: &str, content: Vec<u8>, content_type: String, ttl: i64) {
        let (canonical, resource, host) = normalize_url(url);
        let key = if canonical.len() > 500 {
            let mut hasher = Sha256::new();
            hasher.update(canonical.as_bytes());
            hex::encode(hasher.finalize())
        } else {
            canonical.clone()
        };
        let now = now_secs();
        let size_bytes = content.len();

        let mut inner = self.inner.lock().unwrap();

        if let Some(old) = inner.entries.shift_remove(&key) {
            inner.total_bytes -= old.size_bytes as u64;
        }

        while inner.entries.len() >= inner.max_size {
            if let Some((_, evicted)) = inner.entries.shift_remove_index(0) {
                inner.total_bytes -= evicted.size_bytes as u64;
            } else {
                break;
            }
        }

        let entry = CacheEntry {
            cache_key: key.clone(),
            resource,
            origin_host: host,
            content,
            content_type,
            stored_at: now,
            expires_at: now + ttl,
            size_bytes,
            hit_count: 0,
            last_accessed_at: now,
        };
        inner.total_bytes += size_bytes as u64;
        inner.entries.insert(key, entry);
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            items: inner.entries.len(),
            bytes: inner.total_bytes,
        }
    }

    /// Metadata for every live entry, newest-access last. Never includes
    /// raw content (dashboards get a separate preview endpoint for that).
    pub fn list_entries(&self) -> Vec<CacheEntry> {
        let inner = self.inner.lock().unwrap();
        inner.entries.values().cloned().collect()
    }

    pub fn get_entry(&self, cache_id: &str) -> Option<CacheEntry> {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(cache_id).cloned()
    }

    /// Normalize `url` to the same signature-stripped `path[?query]` form
    /// stored on `CacheEntry::resource`, for callers that need to classify
    /// or label a response before (or instead of) looking up a cache entry.
    /// Classification must run on this normalized resource, never on the
    /// raw URL: the raw URL still carries `exp=`/`sig=`, so a suffix match
    /// like `ends_with(".m3u8")` can never succeed against it.
    pub fn normalized_resource(url: &str) -> String {
        normalize_url(url).1
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
        inner.total_bytes = 0;
    }
}

/// Strip `exp`/`sig` query params (case-sensitive) and re-serialize
/// scheme+host+path+remaining-query. Returns (canonical, resource, host).
fn normalize_url(url: &str) -> (String, String, String) {
    let Ok(mut parsed) = Url::parse(url) else {
        // Not an absolute URL (e.g. a bare path in tests) — normalize the
        // query portion by hand so the same stripping rule still applies.
        return normalize_path_and_query(url);
    };

    let remaining: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "exp" && k != "sig")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if remaining.is_empty() {
        parsed.set_query(None);
    } else {
        let query = remaining
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        parsed.set_query(Some(&query));
    }

    let host = parsed.host_str().unwrap_or("").to_string();
    let path = parsed.path().to_string();
    let resource = match parsed.query() {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path,
    };

    (parsed.to_string(), resource, host)
}

fn normalize_path_and_query(url: &str) -> (String, String, String) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let remaining: Vec<&str> = query
        .split('&')
        .filter(|kv| !kv.is_empty())
        .filter(|kv| {
            let key = kv.split_once('=').map(|(k, _)| k).unwrap_or(kv);
            key != "exp" && key != "sig"
        })
        .collect();
    let canonical = if remaining.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", remaining.join("&"))
    };
    (canonical.clone(), canonical, String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> EdgeTtlPolicy {
        EdgeTtlPolicy {
            playlist_ttl: 60,
            segment_ttl: 3600,
            static_ttl: 86400,
        }
    }

    #[test]
    fn signature_stripping_cache_key_is_stable() {
        let u1 = "https://edge.example.com/origin/tracks/1/1/transcoded/master.m3u8?exp=1&sig=aaa";
        let u2 = "https://edge.example.com/origin/tracks/1/1/transcoded/master.m3u8?exp=2&sig=bbb";
        assert_eq!(EdgeCache::cache_key(u1), EdgeCache::cache_key(u2));
    }

    #[test]
    fn different_paths_get_different_keys() {
        let u1 = "https://edge.example.com/origin/tracks/1/1/transcoded/master.m3u8?exp=1&sig=aaa";
        let u2 = "https://edge.example.com/origin/tracks/1/2/transcoded/master.m3u8?exp=1&sig=aaa";
        assert_ne!(EdgeCache::cache_key(u1), EdgeCache::cache_key(u2));
    }

    #[test]
    fn get_set_roundtrip_hit() {
        let cache = EdgeCache::new(10);
        let url = "https://edge.example.com/origin/a.m3u8?exp=1&sig=aaa";
        cache.set(url, b"hello".to_vec(), "application/vnd.apple.mpegurl".into(), 300);

        let entry = cache.get(url).unwrap();
        assert_eq!(entry.content, b"hello");
        assert_eq!(entry.hit_count, 1);

        let entry2 = cache.get(url).unwrap();
        assert_eq!(entry2.hit_count, 2);
    }

    #[test]
    fn miss_on_empty_cache() {
        let cache = EdgeCache::new(10);
        assert!(cache.get("https://edge.example.com/origin/missing.m3u8").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn lru_eviction_respects_recency() {
        let cache = EdgeCache::new(2);
        cache.set("https://e/a", b"a".to_vec(), "text/plain".into(), 300);
        cache.set("https://e/b", b"b".to_vec(), "text/plain".into(), 300);
        // Touch `a` so `b` becomes the least-recently-used entry.
        assert!(cache.get("https://e/a").is_some());
        cache.set("https://e/c", b"c".to_vec(), "text/plain".into(), 300);

        assert!(cache.get("https://e/b").is_none());
        assert!(cache.get("https://e/a").is_some());
        assert!(cache.get("https://e/c").is_some());

        let stats = cache.stats();
        assert_eq!(stats.items, 2);
    }

    #[test]
    fn byte_accounting_matches_entry_sizes() {
        let cache = EdgeCache::new(10);
        cache.set("https://e/a", vec![0u8; 10], "text/plain".into(), 300);
        cache.set("https://e/b", vec![0u8; 20], "text/plain".into(), 300);
        assert_eq!(cache.stats().bytes, 30);
    }

    #[test]
    fn class_based_ttl_applied_on_set() {
        let cache = EdgeCache::new(10);
        let class = ResourceClass::classify("/tracks/a/b/transcoded/master.m3u8");
        assert_eq!(class, ResourceClass::MasterPlaylist);
        let ttl = class.ttl(&policy());
        cache.set(
            "https://e/tracks/a/b/transcoded/master.m3u8",
            b"x".to_vec(),
            "application/vnd.apple.mpegurl".into(),
            ttl,
        );
        let entry = cache
            .get_entry(&EdgeCache::cache_key("https://e/tracks/a/b/transcoded/master.m3u8"))
            .unwrap();
        assert_eq!(entry.expires_at - entry.stored_at, policy().playlist_ttl);
    }

    #[test]
    fn resource_class_suffix_matching() {
        assert_eq!(
            ResourceClass::classify("/x/master.m3u8"),
            ResourceClass::MasterPlaylist
        );
        assert_eq!(
            ResourceClass::classify("/x/aac_96/index.m3u8"),
            ResourceClass::VariantPlaylist
        );
        assert_eq!(
            ResourceClass::classify("/x/aac_96/init.mp4"),
            ResourceClass::InitSegment
        );
        assert_eq!(
            ResourceClass::classify("/x/aac_96/chunk_0001.m4s"),
            ResourceClass::MediaSegment
        );
        assert_eq!(ResourceClass::classify("/x/tech_meta.json"), ResourceClass::StaticAsset);
        assert_eq!(ResourceClass::classify("/x/cover.png"), ResourceClass::Other);
    }

    #[test]
    fn clear_resets_everything() {
        let cache = EdgeCache::new(10);
        cache.set("https://e/a", b"a".to_vec(), "text/plain".into(), 300);
        cache.get("https://e/a");
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.items, 0);
        assert_eq!(stats.bytes, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }
}

//! HLS manifest rewriting — re-signs every child URI a manifest references.
//!
//! The rewriter never parses the manifest into an AST; it is strictly
//! line-oriented: preserve line count, comments, and blank lines; mutate
//! only plain URI lines and the `URI="..."` attribute of `#EXT-X-MAP`.

use crate::signing::Signer;
use once_cell::sync::Lazy;
use regex::Regex;

/// TTL policy applied when signing child resources during a rewrite.
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    /// TTL for master and variant playlists.
    pub playlist_ttl: i64,
    /// TTL for init segments and media segments.
    pub segment_ttl: i64,
}

/// Manifest class, determined purely by the resource path's suffix
/// (`master.m3u8` vs. any other `.m3u8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Master,
    Variant,
}

impl ManifestKind {
    pub fn classify(resource_path: &str) -> Self {
        if resource_path.ends_with("master.m3u8") {
            ManifestKind::Master
        } else {
            ManifestKind::Variant
        }
    }
}

static MAP_URI_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"URI="([^"]+)""#).unwrap());

/// Re-sign every child URI referenced by `content`, whose own resource path
/// is `resource_path`. Output has identical line count and ordering; only
/// plain URI lines and `#EXT-X-MAP` attribute values are mutated.
pub fn rewrite_playlist(content: &str, resource_path: &str, signer: &Signer, ttl: &TtlPolicy) -> String {
    let kind = ManifestKind::classify(resource_path);
    let directory = dirname(resource_path);
    let child_ttl = match kind {
        ManifestKind::Master => ttl.playlist_ttl,
        ManifestKind::Variant => ttl.segment_ttl,
    };

    let lines = iterate_lines_preserve(content);
    let rewritten: Vec<String> = lines
        .into_iter()
        .map(|line| {
            let stripped = line.trim();
            if stripped.starts_with("#EXT-X-MAP:") {
                rewrite_map_line(line, directory, signer, ttl.segment_ttl)
            } else if !stripped.is_empty() && !stripped.starts_with('#') {
                let child_path = join_resource_path(directory, stripped);
                let (signed, sig) = signer.sign(&child_path, child_ttl);
                format!("{stripped}?{}", signed.as_query(&sig))
            } else {
                line.to_string()
            }
        })
        .collect();

    rewritten.join("\n")
}

fn rewrite_map_line(line: &str, directory: &str, signer: &Signer, segment_ttl: i64) -> String {
    let Some(captures) = MAP_URI_PATTERN.captures(line) else {
        return line.to_string();
    };
    let uri = captures.get(1).unwrap().as_str();
    let child_path = join_resource_path(directory, uri);
    let (signed, sig) = signer.sign(&child_path, segment_ttl);
    let signed_uri = format!("{uri}?{}", signed.as_query(&sig));

    MAP_URI_PATTERN
        .replacen(line, 1, |_: &regex::Captures| format!(r#"URI="{signed_uri}""#))
        .into_owned()
}

/// Everything up to (not including) the last `/`.
fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Join a manifest directory with a relative child URI, guaranteeing a
/// leading slash on the result.
fn join_resource_path(directory: &str, relative: &str) -> String {
    let joined = if directory.is_empty() {
        format!("/{relative}")
    } else {
        format!("{directory}/{relative}")
    };
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}

/// Split on lines the way Python's `str.splitlines()` does, re-appending a
/// trailing empty element when the input ended in `\n` so a `"\n".join(...)`
/// round-trip reproduces the original trailing newline.
fn iterate_lines_preserve(content: &str) -> Vec<&str> {
    if content.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = content.lines().collect();
    if content.ends_with('\n') {
        lines.push("");
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::Signer;

    fn policy() -> TtlPolicy {
        TtlPolicy {
            playlist_ttl: 300,
            segment_ttl: 60,
        }
    }

    #[test]
    fn master_rewrite_signs_variant_playlists() {
        let signer = Signer::new("secret");
        let input = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=256000\naac_256/index.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=96000\naac_96/index.m3u8\n";
        let out = rewrite_playlist(input, "/tracks/1/1/transcoded/master.m3u8", &signer, &policy());

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), input.lines().count());
        assert!(lines[2].starts_with("aac_256/index.m3u8?exp="));
        assert!(lines[4].starts_with("aac_96/index.m3u8?exp="));
        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXT-X-STREAM-INF:BANDWIDTH=256000");

        // Signature really does cover the resolved absolute path.
        let query = lines[2].split_once('?').unwrap().1;
        let exp: i64 = query
            .split('&')
            .find_map(|kv| kv.strip_prefix("exp="))
            .unwrap()
            .parse()
            .unwrap();
        let sig = query
            .split('&')
            .find_map(|kv| kv.strip_prefix("sig="))
            .unwrap();
        assert!(signer.verify("/tracks/1/1/transcoded/aac_256/index.m3u8", exp, sig));
    }

    #[test]
    fn variant_rewrite_preserves_map_and_signs_segments() {
        let signer = Signer::new("secret");
        let input = "#EXT-X-MAP:URI=\"init.mp4\"\n#EXTINF:4.0,\nchunk_0001.m4s\n";
        let out = rewrite_playlist(input, "/tracks/1/1/transcoded/aac_256/index.m3u8", &signer, &policy());

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("#EXT-X-MAP:URI=\"init.mp4?exp="));
        assert_eq!(lines[1], "#EXTINF:4.0,");
        assert!(lines[2].starts_with("chunk_0001.m4s?exp="));
    }

    #[test]
    fn blank_lines_and_plain_comments_pass_through_untouched() {
        let signer = Signer::new("secret");
        let input = "#EXTM3U\n\n# a harmless comment\nseg.m4s\n";
        let out = rewrite_playlist(input, "/tracks/1/1/transcoded/aac_256/index.m3u8", &signer, &policy());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "# a harmless comment");
        assert!(lines[3].starts_with("seg.m4s?exp="));
    }

    #[test]
    fn trailing_newline_is_preserved() {
        let signer = Signer::new("secret");
        let with_nl = "#EXTM3U\nseg.m4s\n";
        let without_nl = "#EXTM3U\nseg.m4s";

        let out_with = rewrite_playlist(with_nl, "/tracks/1/1/transcoded/aac_256/index.m3u8", &signer, &policy());
        let out_without = rewrite_playlist(without_nl, "/tracks/1/1/transcoded/aac_256/index.m3u8", &signer, &policy());

        assert!(out_with.ends_with('\n'));
        assert!(!out_without.ends_with('\n'));
    }

    #[test]
    fn manifest_kind_classification() {
        assert_eq!(
            ManifestKind::classify("/tracks/a/b/transcoded/master.m3u8"),
            ManifestKind::Master
        );
        assert_eq!(
            ManifestKind::classify("/tracks/a/b/transcoded/aac_256/index.m3u8"),
            ManifestKind::Variant
        );
    }
}

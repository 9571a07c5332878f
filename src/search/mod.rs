//! Directory search over decoded screenshot metadata.
//!
//! # Cache policy
//! [`MetadataCache`] is owned by the caller and keyed by path.  Entries are
//! never invalidated on their own: screenshots are treated as immutable once
//! captured, so a cached record stays valid for the life of the cache.  Call
//! [`MetadataCache::invalidate`] or [`MetadataCache::clear`] after rewriting
//! a file.  Only successful decodes are cached; files without metadata or
//! with errors are retried on the next search.
//!
//! # Error policy
//! Per-file failures are logged and skipped unless
//! [`SearchOptions::fail_fast`] is set, in which case the first failure ends
//! the search.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::container::{ContainerError, ReadOptions};
use crate::metadata::{decode_file, MetadataError, ScreenshotMetadata};

// ── Cache ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: HashMap<PathBuf, ScreenshotMetadata>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<&ScreenshotMetadata> {
        self.entries.get(path)
    }

    pub fn insert(&mut self, path: PathBuf, meta: ScreenshotMetadata) {
        self.entries.insert(path, meta);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn invalidate(&mut self, path: &Path) -> Option<ScreenshotMetadata> {
        self.entries.remove(path)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached record for `path`, decoding and caching it on a miss.
    pub fn get_or_decode(&mut self, path: &Path, opts: &ReadOptions) -> Result<Option<&ScreenshotMetadata>, MetadataError> {
        if !self.entries.contains_key(path) {
            match decode_file(path, opts)? {
                Some(meta) => self.insert(path.to_path_buf(), meta),
                None => return Ok(None),
            }
        }
        Ok(self.entries.get(path))
    }
}

// ── Query ────────────────────────────────────────────────────────────────────

/// Filter applied to decoded records.  Ids match exactly; names match as
/// case-insensitive substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    AuthorId(String),
    AuthorName(String),
    WorldId(String),
    WorldName(String),
    PlayerId(String),
    PlayerName(String),
    /// Substring of any author, world or player name.
    Any(String),
}

impl SearchQuery {
    pub fn matches(&self, meta: &ScreenshotMetadata) -> bool {
        let author = meta.author.as_ref();
        let world = meta.world.as_ref();
        match self {
            SearchQuery::AuthorId(id)     => author.is_some_and(|a| !a.id.is_empty() && a.id == *id),
            SearchQuery::AuthorName(name) => author.is_some_and(|a| contains_ci(&a.display_name, name)),
            SearchQuery::WorldId(id)      => world.is_some_and(|w| !w.id.is_empty() && w.id == *id),
            SearchQuery::WorldName(name)  => world.is_some_and(|w| contains_ci(&w.name, name)),
            SearchQuery::PlayerId(id)     => meta.players.iter().any(|p| !p.id.is_empty() && p.id == *id),
            SearchQuery::PlayerName(name) => meta.players.iter().any(|p| contains_ci(&p.display_name, name)),
            SearchQuery::Any(text) => {
                author.is_some_and(|a| contains_ci(&a.display_name, text))
                    || world.is_some_and(|w| contains_ci(&w.name, text))
                    || meta.players.iter().any(|p| contains_ci(&p.display_name, text))
            }
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub read:      ReadOptions,
    /// Abort on the first unreadable or malformed file.
    pub fail_fast: bool,
}

/// Result of [`search_directory`].
#[derive(Debug, Default)]
pub struct SearchReport {
    /// Matching records, sorted by path.
    pub matches:     Vec<ScreenshotMetadata>,
    /// PNG files considered.
    pub scanned:     usize,
    /// Files served from the cache.
    pub cache_hits:  usize,
    /// PNG files without a description chunk.
    pub no_metadata: usize,
    /// Files skipped because of an error.
    pub failed:      usize,
}

impl SearchReport {
    pub fn summary(&self) -> String {
        format!(
            "{} match(es) in {} file(s): {} cached, {} without metadata, {} failed",
            self.matches.len(),
            self.scanned,
            self.cache_hits,
            self.no_metadata,
            self.failed,
        )
    }
}

/// Recursively collect `*.png` files under `root`, sorted by path.
pub fn find_candidates(root: &Path, fail_fast: bool) -> Result<Vec<PathBuf>, MetadataError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if fail_fast => return Err(ContainerError::Io(io::Error::from(e)).into()),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_png_name(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_png_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Search every PNG under `root` for records matching `query`.
pub fn search_directory(
    root:  &Path,
    query: &SearchQuery,
    cache: &mut MetadataCache,
    opts:  &SearchOptions,
) -> Result<SearchReport, MetadataError> {
    let candidates = find_candidates(root, opts.fail_fast)?;
    let mut report = SearchReport { scanned: candidates.len(), ..Default::default() };

    let pending: Vec<&PathBuf> = candidates.iter().filter(|p| !cache.contains(p)).collect();
    report.cache_hits = candidates.len() - pending.len();

    for (path, outcome) in decode_all(&pending, &opts.read) {
        match outcome {
            Ok(Some(meta)) => cache.insert(path.clone(), meta),
            Ok(None) => {
                debug!(path = %path.display(), "no description chunk");
                report.no_metadata += 1;
            }
            Err(e) if opts.fail_fast => return Err(e),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping screenshot");
                report.failed += 1;
            }
        }
    }

    report.matches = candidates
        .iter()
        .filter_map(|path| cache.get(path))
        .filter(|meta| query.matches(meta))
        .cloned()
        .collect();

    info!(root = %root.display(), "{}", report.summary());
    Ok(report)
}

type Decoded<'a> = (&'a PathBuf, Result<Option<ScreenshotMetadata>, MetadataError>);

#[cfg(feature = "parallel")]
fn decode_all<'a>(paths: &[&'a PathBuf], opts: &ReadOptions) -> Vec<Decoded<'a>> {
    use rayon::prelude::*;
    paths.par_iter().map(|&path| (path, decode_file(path, opts))).collect()
}

#[cfg(not(feature = "parallel"))]
fn decode_all<'a>(paths: &[&'a PathBuf], opts: &ReadOptions) -> Vec<Decoded<'a>> {
    paths.iter().map(|&path| (path, decode_file(path, opts))).collect()
}

use crate::error::{CacheError, Result};
use sense_model::DisambiguationResult;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const ENTRY_MAGIC: &[u8; 4] = b"SNS1";
const ENTRY_VERSION: u32 = 1;
const ENTRY_EXTENSION: &str = "entry";

/// Append-only durable log of computed cache entries: one self-describing
/// file per entry, replayed at startup to warm the in-memory cache.
///
/// Filenames are never parsed for meaning; any `*.entry` file in the
/// directory is a candidate, and each parses (or is skipped) independently.
#[derive(Debug)]
pub struct EntryStore {
    dir: PathBuf,
}

impl EntryStore {
    /// Opens (creating if absent) the store directory. A path that exists
    /// but is not a directory is a configuration error, fatal here rather
    /// than deferred to the first write.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if dir.exists() {
            if !dir.is_dir() {
                return Err(CacheError::NotADirectory(dir));
            }
        } else {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Appends one entry as its own file. Concurrent writers never clash:
    /// the name combines a nanosecond timestamp with a hash of the key.
    pub fn append(&self, key: &str, value: &DisambiguationResult) -> Result<PathBuf> {
        let timestamp = unix_now_nanos();
        let bytes = encode_entry(timestamp, key, value)?;

        let name = format!("{timestamp}-{}.{ENTRY_EXTENSION}", key_hash(key));
        let path = self.dir.join(name);
        let tmp = path.with_extension("entry.tmp");
        std::fs::write(&tmp, &bytes)?;
        if let Err(err) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(path)
    }

    /// Scans the store and parses every entry file, oldest first. A file
    /// that fails validation (bad magic, wrong version, truncated partial
    /// write, mangled JSON) is skipped with a warning; a crash mid-write
    /// must never poison the next startup.
    pub fn replay(&self) -> Result<Vec<(String, DisambiguationResult)>> {
        let mut parsed: Vec<(u64, String, DisambiguationResult)> = Vec::new();

        for dir_entry in std::fs::read_dir(&self.dir)? {
            let path = match dir_entry {
                Ok(dir_entry) => dir_entry.path(),
                Err(err) => {
                    log::warn!("skipping unreadable store entry: {err}");
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            match read_entry(&path) {
                Ok(entry) => parsed.push(entry),
                Err(err) => {
                    log::warn!("skipping cache entry file '{}': {err}", path.display());
                }
            }
        }

        // Oldest first, so replay's insert-if-absent keeps the earliest
        // record for a key regardless of directory iteration order.
        parsed.sort_by_key(|(timestamp, _, _)| *timestamp);
        Ok(parsed
            .into_iter()
            .map(|(_, key, value)| (key, value))
            .collect())
    }
}

fn unix_now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn key_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(16);
    for byte in &digest[..8] {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn encode_entry(timestamp: u64, key: &str, value: &DisambiguationResult) -> Result<Vec<u8>> {
    let value_json = value.to_json()?;

    let mut out = Vec::with_capacity(24 + key.len() + value_json.len());
    out.extend_from_slice(ENTRY_MAGIC);
    out.extend_from_slice(&ENTRY_VERSION.to_le_bytes());
    out.extend_from_slice(&timestamp.to_le_bytes());
    out.extend_from_slice(&u32_len(key.as_bytes()).to_le_bytes());
    out.extend_from_slice(key.as_bytes());
    out.extend_from_slice(&u32_len(value_json.as_bytes()).to_le_bytes());
    out.extend_from_slice(value_json.as_bytes());
    Ok(out)
}

#[allow(clippy::cast_possible_truncation)]
fn u32_len(bytes: &[u8]) -> u32 {
    bytes.len() as u32
}

fn read_entry(path: &Path) -> Result<(u64, String, DisambiguationResult)> {
    let bytes = std::fs::read(path)?;
    decode_entry(&bytes).map_err(|reason| CacheError::MalformedEntry {
        path: path.to_path_buf(),
        reason,
    })
}

fn decode_entry(
    mut bytes: &[u8],
) -> std::result::Result<(u64, String, DisambiguationResult), String> {
    let magic = take(&mut bytes, 4).ok_or("truncated before magic")?;
    if magic != ENTRY_MAGIC {
        return Err(format!("bad magic {magic:02x?}"));
    }

    let version = read_u32(&mut bytes).ok_or("truncated before version")?;
    if version != ENTRY_VERSION {
        return Err(format!(
            "unsupported entry version {version} (expected {ENTRY_VERSION})"
        ));
    }

    let timestamp = read_u64(&mut bytes).ok_or("truncated before timestamp")?;

    let key_len = read_u32(&mut bytes).ok_or("truncated before key length")? as usize;
    let key = take(&mut bytes, key_len).ok_or("truncated inside key")?;
    let key = std::str::from_utf8(key)
        .map_err(|e| format!("key is not UTF-8: {e}"))?
        .to_string();

    let value_len = read_u32(&mut bytes).ok_or("truncated before value length")? as usize;
    let value = take(&mut bytes, value_len).ok_or("truncated inside value")?;
    if !bytes.is_empty() {
        return Err(format!("{} trailing bytes after value", bytes.len()));
    }

    let value_json =
        std::str::from_utf8(value).map_err(|e| format!("value is not UTF-8: {e}"))?;
    let value = DisambiguationResult::from_json(value_json)
        .map_err(|e| format!("value does not decode: {e}"))?;

    Ok((timestamp, key, value))
}

fn take<'a>(bytes: &mut &'a [u8], n: usize) -> Option<&'a [u8]> {
    if bytes.len() < n {
        return None;
    }
    let (head, tail) = bytes.split_at(n);
    *bytes = tail;
    Some(head)
}

fn read_u32(bytes: &mut &[u8]) -> Option<u32> {
    let raw = take(bytes, 4)?;
    Some(u32::from_le_bytes(raw.try_into().ok()?))
}

fn read_u64(bytes: &mut &[u8]) -> Option<u64> {
    let raw = take(bytes, 8)?;
    Some(u64::from_le_bytes(raw.try_into().ok()?))
}

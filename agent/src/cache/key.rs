//! Cache key derivation
//!
//! Identical logical calls must always map to identical keys: keys are
//! derived from normalized arguments, so map ordering, key case, and
//! incidental whitespace never change the digest.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex characters of the SHA-256 digest kept in cache keys
const DIGEST_PREFIX_LEN: usize = 16;

/// Key identifying one cached tool result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub tool: String,
    pub server: String,
    /// Normalized arguments (lowercased/trimmed keys, trimmed values)
    pub args: BTreeMap<String, String>,
    /// Hex prefix of the SHA-256 digest over the normalized arguments
    pub hash: String,
}

impl CacheKey {
    /// Build a key from a tool call's raw JSON arguments
    pub fn new(tool: &str, server: &str, arguments: Option<&Value>) -> Self {
        let raw = stringify_args(arguments);
        let args = normalize_args(&raw);
        let hash = digest_args(&args);
        Self {
            tool: tool.to_string(),
            server: server.to_string(),
            args,
            hash,
        }
    }

    /// Storage key used inside a single (tool, server) cache
    pub fn storage_key(&self) -> String {
        format!("{}:{}:{}", self.tool, self.server, self.hash)
    }
}

/// Render raw JSON arguments as strings prior to normalization
///
/// Strings keep their value without surrounding quotes; numbers and booleans
/// use their canonical display form; nested values use compact JSON. Non-object
/// argument payloads yield an empty map.
pub fn stringify_args(arguments: Option<&Value>) -> HashMap<String, String> {
    let mut raw = HashMap::new();
    if let Some(Value::Object(map)) = arguments {
        for (key, value) in map {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            raw.insert(key.clone(), rendered);
        }
    }
    raw
}

/// Normalize argument formatting so equivalent calls share a key
pub fn normalize_args(args: &HashMap<String, String>) -> BTreeMap<String, String> {
    args.iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect()
}

/// Deterministic digest over normalized arguments
///
/// Keys are consumed in sorted order (BTreeMap iteration), each contributing
/// `"key=value|"` to a SHA-256 hash; the first 16 hex characters are kept for
/// compactness.
pub fn digest_args(args: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in args {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"|");
    }
    let digest = hasher.finalize();

    let mut hash = String::with_capacity(DIGEST_PREFIX_LEN);
    for byte in &digest[..DIGEST_PREFIX_LEN / 2] {
        let _ = write!(hash, "{:02x}", byte);
    }
    hash
}

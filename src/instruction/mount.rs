//! Build-cache mounts for RUN instructions
//!
//! Only `type=cache` mounts are modelled. Mount ids produced by [`cache_id`]
//! are content-addressed from the project directory and the mount target, so
//! repeated builds of the same project land in the same engine cache.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Hex characters kept from each hash in a cache id
const CACHE_ID_HASH_LEN: usize = 8;

/// How concurrent builds share a cache mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sharing {
    /// Concurrent writers share the cache
    Shared,
    /// Each writer gets its own cache when another holds it (exclusive)
    Private,
    /// Writers wait until the holder releases it
    Locked,
}

impl fmt::Display for Sharing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Private => write!(f, "private"),
            Self::Locked => write!(f, "locked"),
        }
    }
}

/// A `--mount=type=cache,...` attached to a RUN instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheMount {
    /// Path inside the build container
    pub target: String,

    pub sharing: Option<Sharing>,

    /// Engine cache namespace
    pub id: Option<String>,

    /// Sub-path within the cache
    pub source: Option<String>,

    pub uid: Option<u32>,

    pub gid: Option<u32>,

    /// Permission bits, rendered in octal
    pub mode: Option<u32>,

    #[serde(rename = "readonly")]
    pub read_only: bool,
}

impl CacheMount {
    /// A cache mount on `target` with every option unset
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn sharing(mut self, sharing: Sharing) -> Self {
        self.sharing = Some(sharing);
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Assign the stable id derived from `working_dir` and this mount's target
    pub fn stable_id(self, working_dir: &Path) -> Self {
        let id = cache_id(working_dir, &self.target);
        self.id(id)
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = Some(uid);
        self.gid = Some(gid);
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Render the value of the `--mount=` flag.
    ///
    /// Keys appear in a fixed order and unset keys are omitted.
    pub fn serialize(&self) -> String {
        let mut parts = vec!["type=cache".to_string(), format!("target={}", self.target)];

        if let Some(sharing) = self.sharing {
            parts.push(format!("sharing={sharing}"));
        }
        if let Some(ref id) = self.id {
            parts.push(format!("id={id}"));
        }
        if self.read_only {
            parts.push("ro".to_string());
        }
        if let Some(uid) = self.uid {
            parts.push(format!("uid={uid}"));
        }
        if let Some(gid) = self.gid {
            parts.push(format!("gid={gid}"));
        }
        if let Some(mode) = self.mode {
            parts.push(format!("mode={mode:04o}"));
        }
        if let Some(ref source) = self.source {
            parts.push(format!("source={source}"));
        }

        parts.join(",")
    }
}

impl fmt::Display for CacheMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Derive a stable cache id for a mount `target` used from `working_dir`.
///
/// Each input is hashed on its own and the two short digests are joined with
/// `-`, so the result only contains `[0-9a-f-]`.
pub fn cache_id(working_dir: &Path, target: &str) -> String {
    let dir_hash = short_sha256(working_dir.to_string_lossy().as_bytes());
    let target_hash = short_sha256(target.as_bytes());
    format!("{dir_hash}-{target_hash}")
}

fn short_sha256(input: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(input));
    digest[..CACHE_ID_HASH_LEN].to_string()
}

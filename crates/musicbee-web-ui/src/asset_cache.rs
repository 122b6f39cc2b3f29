use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash as _, Hasher as _};
use std::path::{Path, PathBuf};

use musicbee_util_error::WhateverResult;
use snafu::ResultExt as _;
use tracing::{debug, info};

use crate::LOG_TARGET;

/// Static assets, read once at startup and served from RAM
///
/// The viewer ships a handful of small files (stylesheet, relay script,
/// favicon); there is no bundler step and nothing to invalidate beyond the
/// ETag.
#[derive(Debug)]
pub struct AssetCache(HashMap<String, StaticAsset>);

#[derive(Debug)]
pub struct StaticAsset {
    pub path: String,
    pub raw: Vec<u8>,
    pub etag: String,
}

impl StaticAsset {
    pub fn ext(&self) -> Option<&str> {
        self.path.rsplit('.').next()
    }

    pub fn content_type(&self) -> Option<&'static str> {
        self.ext().and_then(|ext| {
            Some(match ext {
                "js" => "application/javascript",
                "css" => "text/css",
                "svg" => "image/svg+xml",
                "ico" => "image/x-icon",
                _ => return None,
            })
        })
    }
}

impl AssetCache {
    pub fn get(&self, key: &str) -> Option<&StaticAsset> {
        self.0.get(key)
    }

    pub async fn load_files(root_dir: &Path) -> WhateverResult<Self> {
        info!(target: LOG_TARGET, dir = %root_dir.display(), "Loading assets");
        let mut cache = HashMap::new();

        let mut pending = vec![root_dir.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .whatever_context("Failed to read assets dir")?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .whatever_context("Failed to read assets dir entry")?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .whatever_context("Failed to read file metadata")?;

                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let Some(key) = path
                    .strip_prefix(root_dir)
                    .expect("Can't fail")
                    .to_str()
                    .map(ToOwned::to_owned)
                else {
                    continue;
                };

                let raw = tokio::fs::read(&path)
                    .await
                    .whatever_context("Could not read asset file")?;

                let mut hasher = DefaultHasher::new();
                raw.hash(&mut hasher);
                let etag = format!("\"{:016x}\"", hasher.finish());

                debug!(target: LOG_TARGET, %key, "Asset loaded");
                cache.insert(
                    key,
                    StaticAsset {
                        path: path_to_string(&path),
                        raw,
                        etag,
                    },
                );
            }
        }

        debug!(target: LOG_TARGET, len = cache.len(), "Loaded assets");
        Ok(Self(cache))
    }
}

fn path_to_string(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

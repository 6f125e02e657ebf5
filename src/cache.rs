use log::warn;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CompilerConfig;
use crate::pipeline::CompileOutput;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub hash: String,
    pub code: String,
    pub source_map: Option<String>,
}

/// Compiled output keyed on file path, with a content hash guarding
/// staleness. The hash covers the configuration as well as the source.
pub struct IncrementalCache {
    cache_dir: PathBuf,
}

impl IncrementalCache {
    pub fn new(cache_dir: &Path) -> Self {
        if !cache_dir.exists() {
            fs::create_dir_all(cache_dir).ok();
        }
        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    pub fn compute_hash(config: &CompilerConfig, source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(config.fingerprint().as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn get_cache_path(&self, file_path: &str) -> PathBuf {
        let safe_name = file_path.replace(['/', '\\', ':'], "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(&self, file_path: &str, config: &CompilerConfig, source: &str) -> Option<CacheEntry> {
        let cache_path = self.get_cache_path(file_path);
        let data = fs::read_to_string(&cache_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                warn!("Cache entry for {} is corrupt: {}", file_path, e);
                fs::remove_file(cache_path).ok();
                return None;
            }
        };

        (entry.hash == Self::compute_hash(config, source)).then_some(entry)
    }

    pub fn set(&self, file_path: &str, config: &CompilerConfig, source: &str, output: &CompileOutput) {
        let entry = CacheEntry {
            hash: Self::compute_hash(config, source),
            code: output.code.clone(),
            source_map: output.source_map.clone(),
        };
        if let Ok(data) = serde_json::to_string(&entry) {
            if let Err(e) = fs::write(self.get_cache_path(file_path), data) {
                warn!("Could not write cache entry for {}: {}", file_path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: &str) -> CompileOutput {
        CompileOutput {
            code: code.to_string(),
            source_map: None,
            diagnostics: vec![],
        }
    }

    #[test]
    fn hit_requires_same_source_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::new(&dir.path().join("cache"));
        let config = CompilerConfig::default();

        cache.set("src/a.ets", &config, "struct A {}", &output("class A {}\n"));
        let hit = cache.get("src/a.ets", &config, "struct A {}").unwrap();
        assert_eq!(hit.code, "class A {}\n");

        assert!(cache.get("src/a.ets", &config, "struct B {}").is_none());
        let pure = CompilerConfig {
            pure_javascript: true,
            ..CompilerConfig::default()
        };
        assert!(cache.get("src/a.ets", &pure, "struct A {}").is_none());
        assert!(cache.get("src/other.ets", &config, "struct A {}").is_none());
    }

    #[test]
    fn corrupt_entries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::new(dir.path());
        let path = dir.path().join("x.ets.json");
        fs::write(&path, "not json").unwrap();

        assert!(cache.get("x.ets", &CompilerConfig::default(), "").is_none());
        assert!(!path.exists());
    }
}

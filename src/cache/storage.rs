use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::fs;

use crate::config::normalize_base_url;

/// Files published under a local directory and served at `base_url`.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(base_dir: PathBuf, base_url: String) -> Self {
        Self {
            base_dir,
            base_url: normalize_base_url(&base_url),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve_path(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    pub fn get_public_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        format!("{}/{key}", self.base_url)
    }

    pub fn get_result_prefix(hash: &str) -> String {
        format!("results/{hash}")
    }

    pub fn get_upload_key(hash: &str, ext: &str) -> String {
        format!("uploads/{hash}.{ext}")
    }

    pub fn get_meta_key(prefix: &str) -> String {
        format!("{prefix}/meta.json")
    }

    pub fn resolve_path(&self, key: &str) -> PathBuf {
        let normalized = key.trim_start_matches('/');
        self.base_dir.join(Path::new(normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips_under_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            LocalFileStorage::new(dir.path().to_path_buf(), "localhost:3000/cache".into());

        assert_eq!(storage.get("results/abc/meta.json").await.unwrap(), None);
        storage.put("/results/abc/meta.json", b"{}").await.unwrap();
        assert_eq!(
            storage.get("results/abc/meta.json").await.unwrap().as_deref(),
            Some(&b"{}"[..])
        );
        assert!(dir.path().join("results/abc/meta.json").exists());
    }

    #[test]
    fn public_url_joins_base_and_key() {
        let storage = LocalFileStorage::new(
            PathBuf::from("."),
            "https://https://cdn.example/cache/".into(),
        );
        assert_eq!(
            storage.get_public_url("/results/x/generated_1.png"),
            "https://cdn.example/cache/results/x/generated_1.png"
        );
    }
}

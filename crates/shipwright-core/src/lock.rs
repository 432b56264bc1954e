//! 公開処理のロック
//!
//! `.shipwright/publish.lock` により、同じ作業ディレクトリでの同時実行を防ぐ。

use crate::error::{PublishError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// ロックを置くディレクトリ（プロジェクトルート直下、ビルドコンテキストからは除外される）
pub const LOCK_DIR: &str = ".shipwright";
const LOCK_FILE: &str = "publish.lock";
const STALE_AFTER_HOURS: i64 = 1;

/// ロック情報
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub holder: String,
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn current() -> Self {
        Self {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    fn is_stale(&self) -> bool {
        Utc::now()
            .signed_duration_since(self.acquired_at)
            .num_hours()
            >= STALE_AFTER_HOURS
    }
}

/// RAII guard for the publish lock
#[derive(Debug)]
pub struct RunLock {
    lock_path: PathBuf,
    released: bool,
}

impl RunLock {
    pub fn lock_path(project_root: &Path) -> PathBuf {
        project_root.join(LOCK_DIR).join(LOCK_FILE)
    }

    /// ロックを取得
    ///
    /// ファイルは `create_new` で作成するので、同時に取得できるのは1つだけ。
    /// 1時間以上前のロックは異常終了の残骸とみなして1回だけ取り直す。
    pub async fn acquire(project_root: &Path) -> Result<Self> {
        let lock_path = Self::lock_path(project_root);
        if let Some(dir) = lock_path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let content = serde_json::to_string_pretty(&LockInfo::current())?;

        let mut file = match Self::create(&lock_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Self::remove_if_stale(&lock_path).await?;
                match Self::create(&lock_path).await {
                    Ok(file) => file,
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        return Err(Self::contention(&lock_path).await);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        let lock = Self {
            lock_path,
            released: false,
        };
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!("Acquired publish lock: {}", lock.lock_path.display());
        Ok(lock)
    }

    async fn create(lock_path: &Path) -> std::io::Result<fs::File> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
            .await
    }

    /// 既存のロックが古ければ削除、そうでなければ `Locked`
    async fn remove_if_stale(lock_path: &Path) -> Result<()> {
        match Self::read_holder(lock_path).await {
            Some(info) if info.is_stale() => {
                tracing::warn!(
                    "Removing stale publish lock from {} (pid {})",
                    info.holder,
                    info.pid
                );
            }
            Some(_) => return Err(Self::contention(lock_path).await),
            // 書き込み途中の可能性があるので更新時刻で判断する
            None if Self::modified_hours_ago(lock_path).await >= Some(STALE_AFTER_HOURS) => {
                tracing::warn!("Removing unreadable stale publish lock");
            }
            None => return Err(Self::contention(lock_path).await),
        }

        match fs::remove_file(lock_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_holder(lock_path: &Path) -> Option<LockInfo> {
        let content = fs::read_to_string(lock_path).await.ok()?;
        serde_json::from_str(&content).ok()
    }

    async fn modified_hours_ago(lock_path: &Path) -> Option<i64> {
        let modified = fs::metadata(lock_path).await.ok()?.modified().ok()?;
        let modified: DateTime<Utc> = modified.into();
        Some(Utc::now().signed_duration_since(modified).num_hours())
    }

    async fn contention(lock_path: &Path) -> PublishError {
        match Self::read_holder(lock_path).await {
            Some(info) => PublishError::Locked {
                holder: format!("{} (pid {})", info.holder, info.pid),
                since: info.acquired_at.to_rfc3339(),
            },
            None => PublishError::Locked {
                holder: "another run".to_string(),
                since: "just now".to_string(),
            },
        }
    }

    /// ロックを解放
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            match fs::remove_file(&self.lock_path).await {
                Ok(()) => tracing::debug!("Released publish lock"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            self.released = true;
            if let Some(dir) = self.lock_path.parent() {
                // 空でなければ残す
                let _ = fs::remove_dir(dir).await;
            }
        }
        Ok(())
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.lock_path);
            if let Some(dir) = self.lock_path.parent() {
                let _ = std::fs::remove_dir(dir);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let temp_dir = tempdir().unwrap();
        let lock = RunLock::acquire(temp_dir.path()).await.unwrap();

        let lock_path = RunLock::lock_path(temp_dir.path());
        let info: LockInfo =
            serde_json::from_str(&std::fs::read_to_string(&lock_path).unwrap()).unwrap();
        assert_eq!(info.pid, std::process::id());

        lock.release().await.unwrap();
        assert!(!lock_path.exists());
        assert!(!temp_dir.path().join(LOCK_DIR).exists());
    }

    #[tokio::test]
    async fn test_release_keeps_non_empty_dir() {
        let temp_dir = tempdir().unwrap();
        let lock = RunLock::acquire(temp_dir.path()).await.unwrap();
        let other = temp_dir.path().join(LOCK_DIR).join("notes.txt");
        std::fs::write(&other, "keep").unwrap();

        lock.release().await.unwrap();
        assert!(other.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_has_single_winner() {
        for _ in 0..50 {
            let temp_dir = tempdir().unwrap();
            let root = temp_dir.path().to_path_buf();

            let (a, b) = tokio::join!(
                tokio::spawn({
                    let root = root.clone();
                    async move { RunLock::acquire(&root).await }
                }),
                tokio::spawn({
                    let root = root.clone();
                    async move { RunLock::acquire(&root).await }
                }),
            );
            let results = [a.unwrap(), b.unwrap()];

            let acquired = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(acquired, 1, "exactly one run may hold the lock");
            assert!(
                results
                    .iter()
                    .any(|r| matches!(r, Err(PublishError::Locked { .. })))
            );
        }
    }

    #[tokio::test]
    async fn test_fresh_unreadable_lock_is_held() {
        let temp_dir = tempdir().unwrap();
        let lock_path = RunLock::lock_path(temp_dir.path());
        std::fs::create_dir_all(lock_path.parent().unwrap()).unwrap();
        // 作成直後で未書き込みのロック
        std::fs::write(&lock_path, "").unwrap();

        let result = RunLock::acquire(temp_dir.path()).await;
        assert!(matches!(result, Err(PublishError::Locked { .. })));
        assert!(lock_path.exists());
    }

    #[tokio::test]
    async fn test_second_acquire_fails() {
        let temp_dir = tempdir().unwrap();
        let _lock = RunLock::acquire(temp_dir.path()).await.unwrap();

        let second = RunLock::acquire(temp_dir.path()).await;
        assert!(matches!(second, Err(PublishError::Locked { .. })));
    }

    #[tokio::test]
    async fn test_stale_lock_is_replaced() {
        let temp_dir = tempdir().unwrap();
        let lock_path = RunLock::lock_path(temp_dir.path());
        std::fs::create_dir_all(lock_path.parent().unwrap()).unwrap();

        let stale = LockInfo {
            holder: "old-host".to_string(),
            pid: 1,
            acquired_at: Utc::now() - Duration::hours(3),
        };
        std::fs::write(&lock_path, serde_json::to_string(&stale).unwrap()).unwrap();

        let lock = RunLock::acquire(temp_dir.path()).await.unwrap();
        let info: LockInfo =
            serde_json::from_str(&std::fs::read_to_string(&lock_path).unwrap()).unwrap();
        assert_eq!(info.pid, std::process::id());
        lock.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_removes_lock() {
        let temp_dir = tempdir().unwrap();
        let lock_path = RunLock::lock_path(temp_dir.path());
        {
            let _lock = RunLock::acquire(temp_dir.path()).await.unwrap();
            assert!(lock_path.exists());
        }
        assert!(!lock_path.exists());
    }
}

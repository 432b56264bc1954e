//! デバッグシンボル用のビルドプロファイル切り替え
//!
//! 共有の `Cargo.toml` に `[profile.release] debug = true` を追記し、
//! ガードが破棄されるときに必ず元の内容へ戻す。

use crate::error::{PublishError, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 追記するディレクティブ（前の空行は既存内容との区切り）
pub const DEBUG_DIRECTIVE: &str = "\n\n[profile.release]\ndebug = true\n";

pub struct DebugProfile;

impl DebugProfile {
    /// ディレクティブを追記し、復元用のガードを返す
    ///
    /// 追記前の内容はメモリ上に保持するため、ファイルがバージョン管理下にある必要はない。
    pub fn activate(path: &Path) -> Result<ProfileGuard> {
        let original = std::fs::read(path).map_err(|source| PublishError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;

        let guard = ProfileGuard {
            path: path.to_path_buf(),
            original,
            restored: false,
        };

        // 途中で失敗した場合もガードのDropで元に戻る
        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|source| PublishError::ConfigFile {
                path: path.to_path_buf(),
                source,
            })?;
        file.write_all(DEBUG_DIRECTIVE.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|source| PublishError::ConfigFile {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!("Enabled debug symbols in {}", path.display());
        Ok(guard)
    }
}

/// 追記したディレクティブを取り消すスコープガード
#[derive(Debug)]
pub struct ProfileGuard {
    path: PathBuf,
    original: Vec<u8>,
    restored: bool,
}

impl ProfileGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 元の内容に戻す
    pub fn restore(mut self) -> Result<()> {
        self.write_original()
            .map_err(|source| PublishError::ConfigFile {
                path: self.path.clone(),
                source,
            })?;
        self.restored = true;
        tracing::info!("Restored {}", self.path.display());
        Ok(())
    }

    fn write_original(&self) -> std::io::Result<()> {
        std::fs::write(&self.path, &self.original)
    }
}

impl Drop for ProfileGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        match self.write_original() {
            Ok(()) => tracing::info!("Restored {} after abort", self.path.display()),
            Err(e) => tracing::error!(
                "Failed to restore {}: {} (debug profile is still enabled)",
                self.path.display(),
                e
            ),
        }
    }
}

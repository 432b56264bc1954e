pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// プロジェクトルートを直接指定する環境変数
pub const PROJECT_ROOT_ENV: &str = "SHIPWRIGHT_PROJECT_ROOT";

/// プロジェクトルートの目印（両方が必要）
pub const ROOT_MARKERS: [&str; 2] = ["Cargo.toml", "Dockerfile.useCurrentArch"];

/// デバッグシンボル設定を書き込むビルド設定ファイル
pub const DEFAULT_CONFIG_FILE: &str = "Cargo.toml";

/// ディレクトリがプロジェクトルートかどうか
pub fn is_project_root(dir: &Path) -> bool {
    ROOT_MARKERS.iter().all(|marker| dir.join(marker).is_file())
}

/// プロジェクトルートを探す
///
/// 以下の優先順位で検索:
/// 1. 明示的な指定（--project-root）
/// 2. 環境変数 SHIPWRIGHT_PROJECT_ROOT
/// 3. カレントディレクトリから上位に向かって、目印のファイルがあるディレクトリ
pub fn find_project_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return existing_dir(path.to_path_buf());
    }

    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        tracing::debug!("Using project root from {}: {}", PROJECT_ROOT_ENV, root);
        return existing_dir(PathBuf::from(root));
    }

    let current_dir = std::env::current_dir()?;
    find_project_root_from(&current_dir)
}

/// `start` から上位に向かってプロジェクトルートを探す
pub fn find_project_root_from(start: &Path) -> Result<PathBuf> {
    for dir in start.ancestors() {
        if is_project_root(dir) {
            tracing::debug!("Found project root: {}", dir.display());
            return Ok(dir.to_path_buf());
        }
    }

    Err(ConfigError::ProjectRootNotFound(start.to_path_buf()))
}

fn existing_dir(path: PathBuf) -> Result<PathBuf> {
    if path.is_dir() {
        Ok(path)
    } else {
        Err(ConfigError::ProjectRootMissing(path))
    }
}

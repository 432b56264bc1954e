use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "プロジェクトルートが見つかりません（{0} から上位を検索）。\n\
        Cargo.toml と Dockerfile.useCurrentArch の両方があるディレクトリで実行するか、\n\
        --project-root または SHIPWRIGHT_PROJECT_ROOT 環境変数で直接指定してください"
    )]
    ProjectRootNotFound(PathBuf),

    #[error("指定されたプロジェクトルートが存在しません: {0}")]
    ProjectRootMissing(PathBuf),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// ユーザー向けのエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ProjectRootMissing(path) => format!(
                "指定されたプロジェクトルートが存在しません: {}\n\
                 \n\
                 --project-root または SHIPWRIGHT_PROJECT_ROOT の値を確認してください。",
                path.display()
            ),
            _ => self.to_string(),
        }
    }
}

//! Publish pipeline error types

use crate::engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Build failed for {name} ({image}): {source}")]
    BuildFailed {
        name: String,
        image: String,
        #[source]
        source: EngineError,
    },

    #[error("Push failed for {image}: {source}")]
    PushFailed {
        image: String,
        /// このランで既にレジストリに公開済みのイメージ
        published: Vec<String>,
        #[source]
        source: EngineError,
    },

    #[error("Interrupted")]
    Interrupted,

    #[error("Publish is locked by {holder} since {since}")]
    Locked { holder: String, since: String },

    #[error("Build config file error ({path}): {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PublishError {
    /// プロセスの終了コード
    ///
    /// 1: 使い方・環境エラー, 2: ビルド失敗, 3: プッシュ失敗, 130: 中断（SIGINT）
    pub fn exit_code(&self) -> i32 {
        match self {
            PublishError::BuildFailed { .. } => 2,
            PublishError::PushFailed { .. } => 3,
            PublishError::Interrupted => 130,
            _ => 1,
        }
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            PublishError::BuildFailed {
                name,
                image,
                source,
            } => {
                format!(
                    "{} のビルドに失敗しました: {}\n\
                     イメージ: {}\n\
                     \n\
                     以降のビルドとプッシュは実行されていません。",
                    name, source, image
                )
            }
            PublishError::PushFailed {
                image,
                published,
                source,
            } => {
                let mut msg = format!(
                    "{} のプッシュに失敗しました: {}\n\
                     \n\
                     以降のプッシュは実行されていません。",
                    image, source
                );
                if published.is_empty() {
                    msg.push_str("\nレジストリに公開されたイメージはありません。");
                } else {
                    msg.push_str("\n既に公開済みのイメージ（ロールバックされません）:");
                    for published_image in published {
                        msg.push_str(&format!("\n  - {}", published_image));
                    }
                }
                msg
            }
            PublishError::Interrupted => "中断されました。\n\
                 \n\
                 ビルド設定ファイルは元に戻し、ロックは解放しました。\n\
                 中断前に完了したプッシュはロールバックされません。"
                .to_string(),
            PublishError::Locked { holder, since } => {
                format!(
                    "別の公開処理が実行中です（{} / {} から）\n\
                     \n\
                     同じ作業ディレクトリで同時に公開することはできません。\n\
                     前回の実行が異常終了した場合は .shipwright/publish.lock を削除してください。",
                    holder, since
                )
            }
            PublishError::ConfigFile { path, source } => {
                format!(
                    "ビルド設定ファイルを操作できません: {}\n\
                     原因: {}",
                    path.display(),
                    source
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PublishError>;

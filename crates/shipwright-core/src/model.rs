//! 公開パイプラインのデータモデル

use crate::error::{PublishError, Result};
use std::fmt;

/// リリースタグ
///
/// 全サービスイメージのタグとしてそのまま使われる。空でなければ形式は問わない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag(String);

impl ReleaseTag {
    /// 位置引数からリリースタグを取得
    ///
    /// 未指定または空文字列の場合は使い方エラー
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(tag) if !tag.is_empty() => Ok(Self(tag.to_string())),
            _ => Err(PublishError::Usage(
                "release tag is required".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// デバッグシンボル付きビルドの指定
///
/// 文字列 `"true"` のときだけ有効。それ以外（未指定を含む）はすべて無効。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DebugFlag {
    #[default]
    Off,
    On,
}

impl DebugFlag {
    pub fn from_arg(raw: Option<&str>) -> Self {
        match raw {
            Some("true") => DebugFlag::On,
            _ => DebugFlag::Off,
        }
    }

    pub fn is_enabled(self) -> bool {
        self == DebugFlag::On
    }
}

impl fmt::Display for DebugFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugFlag::On => write!(f, "debug"),
            DebugFlag::Off => write!(f, "release"),
        }
    }
}

/// ビルドコンテキストの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// プロジェクトルートをコンテキストとして送る
    ProjectRoot,
    /// Dockerfileだけを送る（空のコンテキスト）
    DefinitionOnly,
}

/// カタログの1エントリ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpec {
    /// 論理サービス名（例: "server"）
    pub name: &'static str,
    /// レジストリ込みのイメージ名（タグなし）
    pub image: &'static str,
    /// プロジェクトルートからのDockerfileパス
    pub dockerfile: &'static str,
    pub context: ContextKind,
}

impl ImageSpec {
    /// レジストリ上書きを適用したリポジトリ名
    ///
    /// 上書き時はイメージ名の最後のパス要素だけを残す。
    /// - `ghcr.io/revoltchat/server` + `registry.example.com/revolt` -> `registry.example.com/revolt/server`
    pub fn repository(&self, registry: Option<&str>) -> String {
        match registry {
            Some(prefix) => {
                let short = self.image.rsplit('/').next().unwrap_or(self.image);
                format!("{}/{}", prefix.trim_end_matches('/'), short)
            }
            None => self.image.to_string(),
        }
    }
}

/// タグ付きイメージ参照
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

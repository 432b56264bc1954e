//! コンテナエンジンの抽象化

use crate::model::ImageRef;
use crate::plan::BuildStep;
use async_trait::async_trait;

/// エンジン側のエラー（呼び出し元は成功/失敗だけを見る）
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// イメージのビルドとプッシュを行う外部エンジン
///
/// 各呼び出しは完了（成功または失敗）するまで戻らない。
#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// 1つのビルドステップを実行し、ローカルのイメージストアにタグ付けする
    async fn build(&self, step: &BuildStep) -> EngineResult<()>;

    /// ローカルのイメージをレジストリにプッシュする
    async fn push(&self, image: &ImageRef) -> EngineResult<()>;
}

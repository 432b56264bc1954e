//! 公開プラン
//!
//! カタログとリリースタグから、実行するステップの順序付きリストを組み立てる。
//! ビルドはすべてプッシュより前に並ぶ。

use crate::catalog::{BASE_TAG, Catalog};
use crate::model::{ContextKind, DebugFlag, ImageRef, ImageSpec, ReleaseTag};
use std::fmt;

/// プラン生成オプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// サービスイメージのレジストリ名前空間を上書き
    pub registry: Option<String>,
    /// レイヤーキャッシュを使用しない
    pub no_cache: bool,
    /// ベースイメージのビルド時に親イメージをpullする
    pub pull_base: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub name: String,
    pub image: ImageRef,
    /// プロジェクトルートからの相対パス
    pub dockerfile: String,
    pub context: ContextKind,
    pub no_cache: bool,
    pub pull: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushStep {
    pub name: String,
    pub image: ImageRef,
}

/// パイプラインの1ステップ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    DebugProfileOn,
    Build(&'a BuildStep),
    DebugProfileOff,
    Push(&'a PushStep),
}

impl fmt::Display for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::DebugProfileOn => write!(f, "enable debug profile"),
            Step::Build(build) => write!(f, "build {} -> {}", build.name, build.image),
            Step::DebugProfileOff => write!(f, "restore build config"),
            Step::Push(push) => write!(f, "push {}", push.image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    pub tag: ReleaseTag,
    pub debug: DebugFlag,
    /// ベースイメージが先頭
    pub builds: Vec<BuildStep>,
    /// ベースイメージは含まない
    pub pushes: Vec<PushStep>,
}

impl PublishPlan {
    pub fn new(catalog: &Catalog, tag: ReleaseTag, debug: DebugFlag, options: &PlanOptions) -> Self {
        let mut builds = Vec::with_capacity(catalog.services.len() + 1);

        // ベースイメージは常に固定名・latest（サービスのDockerfileが名前で参照するため上書きしない）
        builds.push(build_step(
            &catalog.base,
            ImageRef::new(catalog.base.image, BASE_TAG),
            options.no_cache,
            options.pull_base,
        ));

        let registry = options.registry.as_deref();
        let mut pushes = Vec::with_capacity(catalog.services.len());
        for spec in &catalog.services {
            let image = ImageRef::new(spec.repository(registry), tag.as_str());
            // サービスはローカルのベースイメージを使うのでpullしない
            builds.push(build_step(spec, image.clone(), options.no_cache, false));
            pushes.push(PushStep {
                name: spec.name.to_string(),
                image,
            });
        }

        Self {
            tag,
            debug,
            builds,
            pushes,
        }
    }

    /// 実行順のステップ
    pub fn steps(&self) -> Vec<Step<'_>> {
        let mut steps = Vec::with_capacity(self.builds.len() + self.pushes.len() + 2);
        if self.debug.is_enabled() {
            steps.push(Step::DebugProfileOn);
        }
        steps.extend(self.builds.iter().map(Step::Build));
        if self.debug.is_enabled() {
            steps.push(Step::DebugProfileOff);
        }
        steps.extend(self.pushes.iter().map(Step::Push));
        steps
    }
}

fn build_step(spec: &ImageSpec, image: ImageRef, no_cache: bool, pull: bool) -> BuildStep {
    BuildStep {
        name: spec.name.to_string(),
        image,
        dockerfile: spec.dockerfile.to_string(),
        context: spec.context,
        no_cache,
        pull,
    }
}

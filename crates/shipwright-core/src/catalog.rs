//! 公開対象イメージのカタログ
//!
//! イメージの追加・削除はこのテーブルの変更だけで済む。

use crate::model::{ContextKind, ImageSpec};

/// 既定のレジストリ名前空間
pub const REGISTRY_NAMESPACE: &str = "ghcr.io/revoltchat";

/// ベースイメージのタグ（リリースタグは付かない）
pub const BASE_TAG: &str = "latest";

/// 全サービスイメージが `FROM` で参照する共有ベースイメージ
pub const BASE_IMAGE: ImageSpec = ImageSpec {
    name: "base",
    image: "ghcr.io/revoltchat/base",
    dockerfile: "Dockerfile.useCurrentArch",
    context: ContextKind::ProjectRoot,
};

/// サービスイメージ（ビルド順・プッシュ順）
pub const SERVICE_IMAGES: [ImageSpec; 7] = [
    ImageSpec {
        name: "server",
        image: "ghcr.io/revoltchat/server",
        dockerfile: "crates/delta/Dockerfile",
        context: ContextKind::DefinitionOnly,
    },
    ImageSpec {
        name: "bonfire",
        image: "ghcr.io/revoltchat/bonfire",
        dockerfile: "crates/bonfire/Dockerfile",
        context: ContextKind::DefinitionOnly,
    },
    ImageSpec {
        name: "autumn",
        image: "ghcr.io/revoltchat/autumn",
        dockerfile: "crates/services/autumn/Dockerfile",
        context: ContextKind::DefinitionOnly,
    },
    ImageSpec {
        name: "january",
        image: "ghcr.io/revoltchat/january",
        dockerfile: "crates/services/january/Dockerfile",
        context: ContextKind::DefinitionOnly,
    },
    ImageSpec {
        name: "gifbox",
        image: "ghcr.io/revoltchat/gifbox",
        dockerfile: "crates/services/gifbox/Dockerfile",
        context: ContextKind::DefinitionOnly,
    },
    ImageSpec {
        name: "crond",
        image: "ghcr.io/revoltchat/crond",
        dockerfile: "crates/daemons/crond/Dockerfile",
        context: ContextKind::DefinitionOnly,
    },
    ImageSpec {
        name: "pushd",
        image: "ghcr.io/revoltchat/pushd",
        dockerfile: "crates/daemons/pushd/Dockerfile",
        context: ContextKind::DefinitionOnly,
    },
];

/// ベースイメージ1つと、順序付きのサービスイメージ群
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub base: ImageSpec,
    pub services: Vec<ImageSpec>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn new(base: ImageSpec, services: Vec<ImageSpec>) -> Self {
        Self { base, services }
    }

    /// 組み込みカタログ
    pub fn builtin() -> Self {
        Self::new(BASE_IMAGE, SERVICE_IMAGES.to_vec())
    }
}

//! Docker Engine による `ImageEngine` の実装

use crate::builder::ImageBuilder;
use crate::context::ContextBuilder;
use crate::error::BuildError;
use crate::pusher::ImagePusher;
use crate::resolver::BuildResolver;
use async_trait::async_trait;
use bollard::Docker;
use shipwright_core::{BuildStep, EngineResult, ImageEngine, ImageRef};
use std::path::PathBuf;

pub struct DockerEngine {
    builder: ImageBuilder,
    pusher: ImagePusher,
    resolver: BuildResolver,
}

impl DockerEngine {
    pub fn new(docker: Docker, project_root: PathBuf) -> Self {
        Self {
            builder: ImageBuilder::new(docker.clone()),
            pusher: ImagePusher::new(docker),
            resolver: BuildResolver::new(project_root),
        }
    }
}

#[async_trait]
impl ImageEngine for DockerEngine {
    async fn build(&self, step: &BuildStep) -> EngineResult<()> {
        let resolved = self.resolver.resolve(step)?;

        println!("  → Dockerfile: {}", resolved.dockerfile.display());
        if let Some(context) = &resolved.context {
            println!("  → Context: {}", context.display());
        }

        // アーカイブ作成はブロッキングI/O
        let context = tokio::task::spawn_blocking(move || {
            ContextBuilder::create_context(resolved.context.as_deref(), &resolved.dockerfile)
        })
        .await
        .map_err(|e| BuildError::InvalidConfig(format!("Context task failed: {}", e)))??;

        self.builder
            .build_image(context, &step.image.to_string(), step.no_cache, step.pull)
            .await?;
        Ok(())
    }

    async fn push(&self, image: &ImageRef) -> EngineResult<()> {
        let reference = image.to_string();
        if !self.builder.image_exists(&reference).await? {
            return Err(BuildError::PushFailed {
                message: format!("image {} is not in the local image store", reference),
            }
            .into());
        }

        self.pusher.push(image).await?;
        Ok(())
    }
}

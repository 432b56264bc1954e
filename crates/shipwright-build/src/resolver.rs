use crate::error::{BuildError, BuildResult};
use shipwright_core::{BuildStep, ContextKind, PublishPlan};
use std::path::PathBuf;

/// プロジェクトルート基準で解決したビルドソース
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBuild {
    pub dockerfile: PathBuf,
    /// `None` はDockerfileのみのビルド
    pub context: Option<PathBuf>,
}

pub struct BuildResolver {
    project_root: PathBuf,
}

impl BuildResolver {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// ビルドステップのDockerfileとコンテキストを解決
    pub fn resolve(&self, step: &BuildStep) -> BuildResult<ResolvedBuild> {
        let dockerfile = self.resolve_dockerfile(&step.dockerfile)?;
        let context = match step.context {
            ContextKind::ProjectRoot => Some(self.resolve_context()?),
            ContextKind::DefinitionOnly => None,
        };

        tracing::debug!(
            "Resolved {}: dockerfile={}, context={:?}",
            step.name,
            dockerfile.display(),
            context
        );

        Ok(ResolvedBuild {
            dockerfile,
            context,
        })
    }

    /// 外部呼び出しの前に、プランの全ビルドソースが存在するか確認
    pub fn preflight(&self, plan: &PublishPlan) -> BuildResult<Vec<ResolvedBuild>> {
        plan.builds.iter().map(|step| self.resolve(step)).collect()
    }

    fn resolve_dockerfile(&self, relative: &str) -> BuildResult<PathBuf> {
        let path = self.project_root.join(relative);
        if path.is_file() {
            Ok(path)
        } else {
            Err(BuildError::DockerfileNotFound(path))
        }
    }

    fn resolve_context(&self) -> BuildResult<PathBuf> {
        let context = self.project_root.clone();

        if !context.exists() {
            return Err(BuildError::ContextNotFound(context));
        }

        if !context.is_dir() {
            return Err(BuildError::InvalidConfig(format!(
                "Build context is not a directory: {}",
                context.display()
            )));
        }

        Ok(context)
    }
}

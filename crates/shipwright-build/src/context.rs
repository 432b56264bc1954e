use crate::error::{BuildError, BuildResult};
use flate2::Compression;
use flate2::write::GzEncoder;
use ignore::WalkBuilder;
use shipwright_core::LOCK_DIR;
use std::io::Write;
use std::path::Path;
use tar::Builder;

/// コンテキスト内で無視リストを読み込むファイル名
const DOCKERIGNORE: &str = ".dockerignore";

/// Dockerfileのみのビルドでアーカイブに入れる名前
const DEFINITION_ONLY_DOCKERFILE: &str = "Dockerfile";

/// Docker Engine に送るビルドコンテキスト
#[derive(Debug)]
pub struct BuildContext {
    /// tar.gz アーカイブ
    pub archive: Vec<u8>,
    /// アーカイブ内のDockerfileのパス
    pub dockerfile: String,
}

pub struct ContextBuilder;

impl ContextBuilder {
    /// ビルドコンテキストをtar.gzアーカイブとして作成
    ///
    /// `context_path` が `None` の場合はDockerfileだけを含むアーカイブになる
    /// （`docker build - < Dockerfile` と同じ）。
    /// ディレクトリの場合、Dockerfileはコンテキスト内の相対パスのまま参照する。
    pub fn create_context(
        context_path: Option<&Path>,
        dockerfile_path: &Path,
    ) -> BuildResult<BuildContext> {
        let dockerfile_content = std::fs::read(dockerfile_path)
            .map_err(|_| BuildError::DockerfileNotFound(dockerfile_path.to_path_buf()))?;

        let mut archive = Vec::new();
        let dockerfile;
        {
            let encoder = GzEncoder::new(&mut archive, Compression::default());
            let mut tar = Builder::new(encoder);
            // シンボリックリンクはリンクのまま送る
            tar.follow_symlinks(false);

            match context_path {
                Some(context_path) => {
                    tracing::debug!("Creating build context from: {}", context_path.display());
                    if !context_path.is_dir() {
                        return Err(BuildError::ContextNotFound(context_path.to_path_buf()));
                    }
                    let relative = dockerfile_path.strip_prefix(context_path).map_err(|_| {
                        BuildError::InvalidConfig(format!(
                            "Dockerfile {} is outside the build context {}",
                            dockerfile_path.display(),
                            context_path.display()
                        ))
                    })?;
                    dockerfile = relative.to_string_lossy().replace('\\', "/");

                    let included = Self::append_context_dir(&mut tar, context_path, dockerfile_path)?;
                    // .dockerignore で除外されていてもDockerfileは送る
                    if !included {
                        Self::append_file(&mut tar, &dockerfile, &dockerfile_content)?;
                    }
                }
                None => {
                    tracing::debug!(
                        "Creating definition-only context for: {}",
                        dockerfile_path.display()
                    );
                    dockerfile = DEFINITION_ONLY_DOCKERFILE.to_string();
                    Self::append_file(&mut tar, &dockerfile, &dockerfile_content)?;
                }
            }

            let mut encoder = tar.into_inner()?;
            encoder.flush()?;
            encoder.finish()?;
        }

        tracing::debug!("Build context created: {} bytes", archive.len());

        Self::check_context_size(archive.len());

        Ok(BuildContext {
            archive,
            dockerfile,
        })
    }

    fn append_file<W: Write>(tar: &mut Builder<W>, name: &str, content: &[u8]) -> BuildResult<()> {
        let mut header = tar::Header::new_gnu();
        header
            .set_path(name)
            .map_err(|e| BuildError::InvalidConfig(format!("Failed to set path {}: {}", name, e)))?;
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();

        tar.append(&header, content)?;
        Ok(())
    }

    /// `.dockerignore` を考慮してディレクトリを追加
    ///
    /// Dockerfileがアーカイブに入ったかどうかを返す。
    fn append_context_dir<W: Write>(
        tar: &mut Builder<W>,
        context_path: &Path,
        dockerfile_path: &Path,
    ) -> BuildResult<bool> {
        let walker = WalkBuilder::new(context_path)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .add_custom_ignore_filename(DOCKERIGNORE)
            // 公開ロックはイメージに入れない
            .filter_entry(|entry| !(entry.depth() == 1 && entry.file_name() == LOCK_DIR))
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut entries = 0usize;
        let mut dockerfile_included = false;
        for entry in walker {
            let entry = entry.map_err(|e| {
                BuildError::InvalidConfig(format!("Failed to walk build context: {}", e))
            })?;
            let path = entry.path();
            if path == context_path {
                continue;
            }

            let relative_path = path.strip_prefix(context_path).map_err(|e| {
                BuildError::InvalidConfig(format!("Failed to strip context prefix: {}", e))
            })?;

            match entry.file_type() {
                Some(file_type) if file_type.is_dir() => {
                    tar.append_dir(relative_path, path)?;
                }
                Some(_) => {
                    tar.append_path_with_name(path, relative_path)?;
                    dockerfile_included |= path == dockerfile_path;
                    entries += 1;
                }
                None => {}
            }
        }

        tracing::debug!("Added {} files from build context", entries);
        Ok(dockerfile_included)
    }

    /// コンテキストサイズのチェックと警告
    fn check_context_size(size: usize) {
        const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024; // 500MB

        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "警告: ビルドコンテキストが大きすぎます（{}MB）\n\
                 .dockerignoreファイルで不要なファイルを除外することを推奨します。",
                size / 1024 / 1024
            );
        }
    }
}

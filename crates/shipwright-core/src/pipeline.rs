//! 公開パイプラインの実行
//!
//! プランのステップを順番に1つずつ実行し、最初の失敗で中断する。
//! デバッグプロファイルはガードで保持するので、どの経路で終了しても元に戻る。

use crate::engine::ImageEngine;
use crate::error::{PublishError, Result};
use crate::lock::RunLock;
use crate::model::ImageRef;
use crate::plan::{PublishPlan, Step};
use crate::profile::{DebugProfile, ProfileGuard};
use colored::Colorize;
use std::path::PathBuf;

/// 実行結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub built: Vec<ImageRef>,
    pub pushed: Vec<ImageRef>,
}

pub struct Pipeline<'a, E: ImageEngine + ?Sized> {
    engine: &'a E,
    project_root: PathBuf,
    config_file: PathBuf,
}

impl<'a, E: ImageEngine + ?Sized> Pipeline<'a, E> {
    /// `config_file` はプロジェクトルートからの相対パス
    pub fn new(engine: &'a E, project_root: impl Into<PathBuf>, config_file: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            project_root: project_root.into(),
            config_file: config_file.into(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.project_root.join(&self.config_file)
    }

    /// ロックを取得してプランを実行
    ///
    /// Ctrl-C を受けた場合は実行中のステップを破棄し、設定ファイルを戻してから
    /// `Interrupted` を返す。
    pub async fn run(&self, plan: &PublishPlan) -> Result<PublishReport> {
        self.run_until(plan, ctrl_c()).await
    }

    /// `shutdown` が完了した時点で中断する
    pub async fn run_until<F>(&self, plan: &PublishPlan, shutdown: F) -> Result<PublishReport>
    where
        F: Future<Output = ()>,
    {
        let lock = RunLock::acquire(&self.project_root).await?;

        // execute のフューチャはここで破棄され、ProfileGuard が復元する
        let outcome = tokio::select! {
            outcome = self.execute(plan) => outcome,
            () = shutdown => {
                tracing::warn!("Publish interrupted");
                Err(PublishError::Interrupted)
            }
        };

        if let Err(e) = lock.release().await {
            tracing::warn!("Failed to release publish lock: {}", e);
        }
        outcome
    }

    async fn execute(&self, plan: &PublishPlan) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        let mut profile: Option<ProfileGuard> = None;

        tracing::info!(
            "Publishing tag {} ({} builds, {} pushes, {})",
            plan.tag,
            plan.builds.len(),
            plan.pushes.len(),
            plan.debug
        );

        for step in plan.steps() {
            tracing::debug!("Step: {}", step);
            match step {
                Step::DebugProfileOn => {
                    let path = self.config_path();
                    println!(
                        "{} {} にデバッグシンボル設定を追加",
                        "⚙".yellow(),
                        path.display().to_string().cyan()
                    );
                    profile = Some(DebugProfile::activate(&path)?);
                }
                Step::Build(build) => {
                    println!();
                    println!(
                        "{}",
                        format!("🔨 {} をビルド中...", build.name).green().bold()
                    );
                    println!("  → Image: {}", build.image.to_string().cyan());

                    self.engine.build(build).await.map_err(|source| {
                        PublishError::BuildFailed {
                            name: build.name.clone(),
                            image: build.image.to_string(),
                            source,
                        }
                    })?;

                    println!("  {} {}", "✓".green(), build.image);
                    report.built.push(build.image.clone());
                }
                Step::DebugProfileOff => {
                    if let Some(guard) = profile.take() {
                        println!();
                        println!(
                            "{} {} を元に戻しました",
                            "⚙".yellow(),
                            guard.path().display().to_string().cyan()
                        );
                        guard.restore()?;
                    }
                }
                Step::Push(push) => {
                    if report.pushed.is_empty() {
                        println!();
                        println!("{}", "📤 レジストリにプッシュ中...".green().bold());
                    }

                    self.engine.push(&push.image).await.map_err(|source| {
                        PublishError::PushFailed {
                            image: push.image.to_string(),
                            published: report.pushed.iter().map(ToString::to_string).collect(),
                            source,
                        }
                    })?;

                    report.pushed.push(push.image.clone());
                }
            }
        }

        tracing::info!("Published {} images for tag {}", report.pushed.len(), plan.tag);
        Ok(report)
    }
}

/// SIGINT を待つ。ハンドラを登録できなければ中断しない
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::engine::EngineResult;
    use crate::model::{DebugFlag, ReleaseTag};
    use crate::plan::{BuildStep, PlanOptions};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};

    const MANIFEST: &str = "[workspace]\nmembers = [\"crates/delta\"]\n";

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Build(String),
        Push(String),
    }

    /// 呼び出しを記録するエンジン
    struct RecordingEngine {
        config_path: PathBuf,
        fail_on: Option<Call>,
        /// このビルドは完了しない（中断のテスト用）
        hang_on: Option<String>,
        calls: Mutex<Vec<Call>>,
        /// 各ビルド時点の設定ファイル内容
        config_seen: Mutex<Vec<String>>,
    }

    impl RecordingEngine {
        fn new(config_path: PathBuf) -> Self {
            Self {
                config_path,
                fail_on: None,
                hang_on: None,
                calls: Mutex::new(Vec::new()),
                config_seen: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, call: Call) -> Self {
            self.fail_on = Some(call);
            self
        }

        fn hanging_on(mut self, image: &str) -> Self {
            self.hang_on = Some(image.to_string());
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn builds(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Build(image) => Some(image),
                    Call::Push(_) => None,
                })
                .collect()
        }

        fn pushes(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Push(image) => Some(image),
                    Call::Build(_) => None,
                })
                .collect()
        }

        fn record(&self, call: Call) -> EngineResult<()> {
            self.calls.lock().unwrap().push(call.clone());
            if self.fail_on.as_ref() == Some(&call) {
                return Err(format!("simulated failure: {:?}", call).into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ImageEngine for RecordingEngine {
        async fn build(&self, step: &BuildStep) -> EngineResult<()> {
            let seen = fs::read_to_string(&self.config_path).unwrap_or_default();
            self.config_seen.lock().unwrap().push(seen);
            let image = step.image.to_string();
            if self.hang_on.as_deref() == Some(image.as_str()) {
                self.calls.lock().unwrap().push(Call::Build(image));
                std::future::pending::<()>().await;
            }
            self.record(Call::Build(step.image.to_string()))
        }

        async fn push(&self, image: &ImageRef) -> EngineResult<()> {
            self.record(Call::Push(image.to_string()))
        }
    }

    fn project() -> (TempDir, PathBuf) {
        let temp_dir = tempdir().unwrap();
        let manifest = temp_dir.path().join("Cargo.toml");
        fs::write(&manifest, MANIFEST).unwrap();
        (temp_dir, manifest)
    }

    fn plan(tag: &str, debug: Option<&str>) -> PublishPlan {
        PublishPlan::new(
            &Catalog::builtin(),
            ReleaseTag::parse(Some(tag)).unwrap(),
            DebugFlag::from_arg(debug),
            &PlanOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_release_run_builds_then_pushes() {
        let (temp_dir, manifest) = project();
        let engine = RecordingEngine::new(manifest.clone());
        let pipeline = Pipeline::new(&engine, temp_dir.path(), "Cargo.toml");

        let report = pipeline.run(&plan("20230826-1", Some("false"))).await.unwrap();

        assert_eq!(
            engine.builds(),
            vec![
                "ghcr.io/revoltchat/base:latest",
                "ghcr.io/revoltchat/server:20230826-1",
                "ghcr.io/revoltchat/bonfire:20230826-1",
                "ghcr.io/revoltchat/autumn:20230826-1",
                "ghcr.io/revoltchat/january:20230826-1",
                "ghcr.io/revoltchat/gifbox:20230826-1",
                "ghcr.io/revoltchat/crond:20230826-1",
                "ghcr.io/revoltchat/pushd:20230826-1",
            ]
        );
        assert_eq!(engine.pushes(), engine.builds()[1..].to_vec());

        // 全ビルドが最初のプッシュより前
        let calls = engine.calls();
        let first_push = calls.iter().position(|c| matches!(c, Call::Push(_))).unwrap();
        assert_eq!(first_push, 8);

        assert_eq!(report.built.len(), 8);
        assert_eq!(report.pushed.len(), 7);
        assert_eq!(fs::read_to_string(&manifest).unwrap(), MANIFEST);
        assert!(engine.config_seen.lock().unwrap().iter().all(|c| c == MANIFEST));
    }

    #[tokio::test]
    async fn test_release_run_does_not_need_config_file() {
        let temp_dir = tempdir().unwrap();
        let engine = RecordingEngine::new(temp_dir.path().join("Cargo.toml"));
        let pipeline = Pipeline::new(&engine, temp_dir.path(), "Cargo.toml");

        pipeline.run(&plan("v1", None)).await.unwrap();

        assert!(!temp_dir.path().join("Cargo.toml").exists());
        assert_eq!(engine.pushes().len(), 7);
    }

    #[tokio::test]
    async fn test_debug_run_enables_profile_during_builds_and_restores() {
        let (temp_dir, manifest) = project();
        let engine = RecordingEngine::new(manifest.clone());
        let pipeline = Pipeline::new(&engine, temp_dir.path(), "Cargo.toml");

        pipeline.run(&plan("v2", Some("true"))).await.unwrap();

        let seen = engine.config_seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 8);
        for content in seen {
            assert!(content.starts_with(MANIFEST));
            assert!(content.contains("[profile.release]\ndebug = true"));
        }
        assert_eq!(fs::read_to_string(&manifest).unwrap(), MANIFEST);
    }

    #[tokio::test]
    async fn test_debug_run_base_failure_restores_config() {
        let (temp_dir, manifest) = project();
        let engine = RecordingEngine::new(manifest.clone())
            .failing_on(Call::Build("ghcr.io/revoltchat/base:latest".to_string()));
        let pipeline = Pipeline::new(&engine, temp_dir.path(), "Cargo.toml");

        let err = pipeline.run(&plan("v2", Some("true"))).await.unwrap_err();

        assert!(matches!(err, PublishError::BuildFailed { ref name, .. } if name == "base"));
        assert_ne!(err.exit_code(), 0);
        assert_eq!(engine.calls().len(), 1);
        assert!(engine.pushes().is_empty());
        assert_eq!(fs::read_to_string(&manifest).unwrap(), MANIFEST);
    }

    #[tokio::test]
    async fn test_service_failure_stops_later_builds_and_all_pushes() {
        let (temp_dir, manifest) = project();
        let engine = RecordingEngine::new(manifest.clone())
            .failing_on(Call::Build("ghcr.io/revoltchat/january:v3".to_string()));
        let pipeline = Pipeline::new(&engine, temp_dir.path(), "Cargo.toml");

        let err = pipeline.run(&plan("v3", Some("true"))).await.unwrap_err();

        assert_eq!(err.exit_code(), 2);
        let builds = engine.builds();
        assert_eq!(builds.len(), 5);
        assert_eq!(builds.last().unwrap(), "ghcr.io/revoltchat/january:v3");
        assert!(engine.pushes().is_empty());
        assert_eq!(fs::read_to_string(&manifest).unwrap(), MANIFEST);
        // ロックも解放されている
        assert!(!RunLock::lock_path(temp_dir.path()).exists());
    }

    #[tokio::test]
    async fn test_push_failure_reports_published_images() {
        let (temp_dir, manifest) = project();
        let engine = RecordingEngine::new(manifest)
            .failing_on(Call::Push("ghcr.io/revoltchat/january:v4".to_string()));
        let pipeline = Pipeline::new(&engine, temp_dir.path(), "Cargo.toml");

        let err = pipeline.run(&plan("v4", None)).await.unwrap_err();

        assert_eq!(err.exit_code(), 3);
        match err {
            PublishError::PushFailed {
                image, published, ..
            } => {
                assert_eq!(image, "ghcr.io/revoltchat/january:v4");
                assert_eq!(
                    published,
                    vec![
                        "ghcr.io/revoltchat/server:v4",
                        "ghcr.io/revoltchat/bonfire:v4",
                        "ghcr.io/revoltchat/autumn:v4",
                    ]
                );
            }
            other => panic!("Expected PushFailed, got {:?}", other),
        }
        // 失敗したプッシュ以降は実行されない
        assert_eq!(engine.pushes().len(), 4);
    }

    #[tokio::test]
    async fn test_locked_project_runs_nothing() {
        let (temp_dir, manifest) = project();
        let _held = RunLock::acquire(temp_dir.path()).await.unwrap();

        let engine = RecordingEngine::new(manifest.clone());
        let pipeline = Pipeline::new(&engine, temp_dir.path(), "Cargo.toml");

        let err = pipeline.run(&plan("v5", Some("true"))).await.unwrap_err();

        assert!(matches!(err, PublishError::Locked { .. }));
        assert!(engine.calls().is_empty());
        assert_eq!(fs::read_to_string(&manifest).unwrap(), MANIFEST);
    }

    #[tokio::test]
    async fn test_debug_run_missing_config_file_fails_before_builds() {
        let temp_dir = tempdir().unwrap();
        let engine = RecordingEngine::new(temp_dir.path().join("Cargo.toml"));
        let pipeline = Pipeline::new(&engine, temp_dir.path(), "Cargo.toml");

        let err = pipeline.run(&plan("v6", Some("true"))).await.unwrap_err();

        assert!(matches!(err, PublishError::ConfigFile { .. }));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_interrupt_during_build_restores_config_and_lock() {
        let (temp_dir, manifest) = project();
        let engine = RecordingEngine::new(manifest.clone())
            .hanging_on("ghcr.io/revoltchat/autumn:v7");
        let pipeline = Pipeline::new(&engine, temp_dir.path(), "Cargo.toml");

        let shutdown = tokio::time::sleep(Duration::from_millis(50));
        let err = pipeline
            .run_until(&plan("v7", Some("true")), shutdown)
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Interrupted));
        assert_eq!(err.exit_code(), 130);
        assert_eq!(engine.builds().last().unwrap(), "ghcr.io/revoltchat/autumn:v7");
        assert!(engine.pushes().is_empty());
        assert_eq!(fs::read_to_string(&manifest).unwrap(), MANIFEST);
        assert!(!RunLock::lock_path(temp_dir.path()).exists());
    }

    #[tokio::test]
    async fn test_dropping_run_mid_build_restores_config_and_lock() {
        let (temp_dir, manifest) = project();
        let engine = RecordingEngine::new(manifest.clone())
            .hanging_on("ghcr.io/revoltchat/server:v8");
        let pipeline = Pipeline::new(&engine, temp_dir.path(), "Cargo.toml");

        let plan = plan("v8", Some("true"));
        let result = tokio::time::timeout(Duration::from_millis(50), pipeline.run(&plan)).await;

        assert!(result.is_err(), "run should still be blocked in the build");
        assert_eq!(engine.builds().len(), 2);
        assert_eq!(fs::read_to_string(&manifest).unwrap(), MANIFEST);
        assert!(!RunLock::lock_path(temp_dir.path()).exists());
    }
}

use crate::docker;
use colored::Colorize;
use shipwright_build::{BuildResolver, DockerEngine};
use shipwright_core::{Pipeline, PublishPlan, PublishReport};
use std::path::Path;

/// 実行プランを表示（--dry-run）
pub fn print_plan(plan: &PublishPlan) {
    println!("{}", "公開プラン (dry-run)".green().bold());
    println!("タグ: {}", plan.tag.as_str().cyan());
    println!("モード: {}", plan.debug.to_string().cyan());
    println!();
    for (index, step) in plan.steps().iter().enumerate() {
        println!("{:>3}. {}", index + 1, step);
    }
}

/// 公開コマンドを処理
///
/// 外部呼び出しの前にビルドソースとビルド設定ファイルを確認する。
pub async fn handle_publish_command(
    project_root: &Path,
    config_file: &Path,
    plan: &PublishPlan,
) -> anyhow::Result<PublishReport> {
    println!("{}", "Revoltイメージを公開中...".green());
    println!("タグ: {}", plan.tag.as_str().cyan());
    println!("モード: {}", plan.debug.to_string().cyan());
    println!("プロジェクト: {}", project_root.display().to_string().cyan());

    println!();
    println!(
        "{}",
        format!(
            "ビルド対象 ({} 個) / プッシュ対象 ({} 個):",
            plan.builds.len(),
            plan.pushes.len()
        )
        .bold()
    );
    for build in &plan.builds {
        println!("  • {} {}", build.name.cyan(), build.image.to_string().dimmed());
    }

    // ビルドソースの確認
    let resolver = BuildResolver::new(project_root.to_path_buf());
    resolver.preflight(plan)?;

    if plan.debug.is_enabled() {
        let config_path = project_root.join(config_file);
        if !config_path.is_file() {
            anyhow::bail!(
                "ビルド設定ファイルが見つかりません: {}",
                config_path.display()
            );
        }
    }

    // Docker接続
    println!();
    println!("{}", "Dockerに接続中...".blue());
    let docker_conn = docker::init_docker_with_error_handling().await?;

    let engine = DockerEngine::new(docker_conn, project_root.to_path_buf());
    let pipeline = Pipeline::new(&engine, project_root, config_file);

    Ok(pipeline.run(plan).await?)
}

/// 完了サマリー
pub fn print_summary(plan: &PublishPlan, report: &PublishReport) {
    println!();
    println!(
        "{}",
        format!(
            "✓ {} 個のイメージを {} で公開しました",
            report.pushed.len(),
            plan.tag
        )
        .green()
        .bold()
    );
    for image in &report.pushed {
        println!("  • {}", image.to_string().cyan());
    }
}

mod docker;
mod publish;

use clap::Parser;
use colored::Colorize;
use shipwright_build::BuildError;
use shipwright_config::{ConfigError, DEFAULT_CONFIG_FILE};
use shipwright_core::{Catalog, DebugFlag, PlanOptions, PublishError, PublishPlan, ReleaseTag};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shipwright", version)]
#[command(
    about = "Revoltのサービスイメージを一括ビルドし、リリースタグでレジストリに公開",
    long_about = None
)]
struct Cli {
    /// リリースタグ（全サービスイメージのタグ、例: 20230826-1）
    tag: Option<String>,
    /// "true" のときデバッグシンボル付きでビルド
    debug_build: Option<String>,
    /// 3つ目以降の位置引数は無視する
    #[arg(hide = true)]
    _rest: Vec<String>,
    /// プロジェクトルート（省略時は SHIPWRIGHT_PROJECT_ROOT またはカレントから上位を検索）
    #[arg(long, value_name = "DIR")]
    project_root: Option<PathBuf>,
    /// デバッグシンボル設定を追記するビルド設定ファイル（プロジェクトルートからの相対パス）
    #[arg(long, env = "SHIPWRIGHT_CONFIG_FILE", default_value = DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,
    /// サービスイメージのレジストリ名前空間（例: ghcr.io/owner）
    #[arg(long, env = "SHIPWRIGHT_REGISTRY")]
    registry: Option<String>,
    /// キャッシュを使用しない
    #[arg(long)]
    no_cache: bool,
    /// ベースイメージのビルド時に親イメージをpullする
    #[arg(long)]
    pull: bool,
    /// 実行内容を表示するだけで、ビルド・プッシュしない
    #[arg(long)]
    dry_run: bool,
}

fn print_usage() {
    eprintln!("{} shipwright <TAG> [DEBUG_BUILD]", "Usage:".yellow().bold());
    eprintln!();
    eprintln!("  TAG          リリースタグ（例: 20230826-1）");
    eprintln!("  DEBUG_BUILD  \"true\" でデバッグシンボル付きビルド（省略時はリリースビルド）");
    eprintln!();
    eprintln!("例: shipwright 20230826-1");
    eprintln!("    shipwright 20230826-1 true");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ログはstderrに出力（RUST_LOG で制御）
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let tag = match ReleaseTag::parse(cli.tag.as_deref()) {
        Ok(tag) => tag,
        Err(_) => {
            print_usage();
            std::process::exit(1);
        }
    };
    let debug = DebugFlag::from_arg(cli.debug_build.as_deref());

    let options = PlanOptions {
        registry: cli.registry.clone(),
        no_cache: cli.no_cache,
        pull_base: cli.pull,
    };
    let plan = PublishPlan::new(&Catalog::builtin(), tag, debug, &options);

    if cli.dry_run {
        publish::print_plan(&plan);
        return;
    }

    if let Err(e) = run(&cli, &plan).await {
        eprintln!();
        eprintln!("{} {}", "✗".red().bold(), error_message(&e));
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: &Cli, plan: &PublishPlan) -> anyhow::Result<()> {
    let project_root = shipwright_config::find_project_root(cli.project_root.as_deref())?;
    let report = publish::handle_publish_command(&project_root, &cli.config_file, plan).await?;
    publish::print_summary(plan, &report);
    Ok(())
}

fn error_message(error: &anyhow::Error) -> String {
    if let Some(e) = error.downcast_ref::<PublishError>() {
        return e.user_message();
    }
    if let Some(e) = error.downcast_ref::<BuildError>() {
        return e.user_message();
    }
    if let Some(e) = error.downcast_ref::<ConfigError>() {
        return e.user_message();
    }
    format!("{:#}", error)
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<PublishError>()
        .map(PublishError::exit_code)
        .unwrap_or(1)
}

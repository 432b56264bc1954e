use colored::Colorize;

/// Docker接続を初期化（エラーハンドリング付き）
pub async fn init_docker_with_error_handling() -> anyhow::Result<bollard::Docker> {
    let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
        print_connection_help(&e);
        anyhow::anyhow!("Docker接続に失敗しました")
    })?;

    // 接続テスト
    docker.ping().await.map_err(|e| {
        print_connection_help(&e);
        anyhow::anyhow!("Docker接続に失敗しました")
    })?;

    tracing::debug!("Connected to Docker engine");
    Ok(docker)
}

fn print_connection_help(error: &bollard::errors::Error) {
    eprintln!();
    eprintln!("{}", "✗ Docker接続エラー".red().bold());
    eprintln!();
    eprintln!("{}", "原因:".yellow());
    eprintln!("  {}", error);
    eprintln!();
    eprintln!("{}", "解決方法:".yellow());
    eprintln!("  • Dockerが起動しているか確認してください");
    eprintln!("  • DOCKER_HOST 環境変数が正しいソケットを指しているか確認してください");
    eprintln!("  • docker ps コマンドが正常に動作するか確認してください");
}

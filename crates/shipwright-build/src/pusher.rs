//! イメージプッシュ処理
//!
//! ビルドしたイメージをコンテナレジストリにプッシュします。

use crate::auth::RegistryAuth;
use crate::error::{BuildError, BuildResult};
use crate::progress::PushProgress;
use bollard::Docker;
use bollard::models::PushImageInfo;
use colored::Colorize;
use futures_util::StreamExt;
use shipwright_core::ImageRef;

/// イメージプッシュを実行するハンドラ
pub struct ImagePusher {
    docker: Docker,
    auth: RegistryAuth,
}

impl ImagePusher {
    pub fn new(docker: Docker) -> Self {
        Self {
            docker,
            auth: RegistryAuth::new(),
        }
    }

    /// イメージをレジストリにプッシュ
    ///
    /// タグの形式はチェックしない（不正なタグはエンジン側で拒否される）。
    pub async fn push(&self, image: &ImageRef) -> BuildResult<()> {
        let full_image = image.to_string();
        let credentials = self.auth.get_credentials(&full_image)?;

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> {
            tag: image.tag.clone(),
        };

        println!("  → {}", full_image.cyan());
        let progress = PushProgress::new(&full_image);

        #[allow(deprecated)]
        let mut stream = self
            .docker
            .push_image(&image.repository, Some(options), credentials);

        let mut error_message: Option<String> = None;

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(err) = info.error {
                        error_message = Some(err);
                    } else {
                        self.handle_progress(&info, &progress);
                    }
                }
                Err(e) => {
                    progress.finish_error(&e.to_string());
                    return Err(BuildError::PushFailed {
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(err) = error_message {
            progress.finish_error(&err);
            return Err(BuildError::PushFailed { message: err });
        }

        progress.finish_success(&full_image);
        Ok(())
    }

    /// プッシュ進捗を表示
    fn handle_progress(&self, info: &PushImageInfo, progress: &PushProgress) {
        let Some(status) = &info.status else {
            return;
        };

        match status.as_str() {
            "Pushing" => {
                let detail = info.progress.as_deref().unwrap_or("");
                progress.set_message(&format!("↑ Pushing {}", detail));
            }
            "Pushed" | "Layer already exists" => {
                progress.println(&format!("  {} {}", "✓".green(), status));
            }
            // 準備中は表示をスキップ（ノイズ軽減）
            "Preparing" | "Waiting" => {}
            other => {
                progress.set_message(other);
            }
        }
    }
}

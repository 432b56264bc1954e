use indicatif::{ProgressBar, ProgressStyle};

/// プッシュ中のスピナー表示
pub struct PushProgress {
    progress_bar: ProgressBar,
}

impl PushProgress {
    pub fn new(image: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("  {spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        pb.set_message(format!("Pushing {}...", image));

        Self { progress_bar: pb }
    }

    pub fn set_message(&self, msg: &str) {
        self.progress_bar.set_message(msg.to_string());
    }

    /// スピナーを止めずに1行出力
    pub fn println(&self, line: &str) {
        self.progress_bar.println(line);
    }

    pub fn finish_success(&self, image: &str) {
        self.progress_bar.finish_with_message(format!("Pushed {} ✓", image));
    }

    pub fn finish_error(&self, error: &str) {
        self.progress_bar
            .finish_with_message(format!("Push failed: {}", error));
    }
}

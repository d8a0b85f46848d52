use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// File-count progress bar. Purely informational.
pub struct Bar {
    bar: ProgressBar,
}

impl Bar {
    pub fn new(total: u64, description: &str) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
            .expect("valid template")
            .progress_chars("●○ ");

        bar.set_style(style);
        bar.set_message(description.to_owned());

        Self { bar }
    }

    /// A bar that never draws, for tests and quiet runs.
    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }

    #[inline]
    pub fn add(&self, delta: u64) {
        self.bar.inc(delta);
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Done");
    }
}

impl Drop for Bar {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

use indicatif::{ProgressBar, ProgressStyle};

/// Byte progress of a signing run.
///
/// Shared by reference between engine threads; a hidden bar costs nothing
/// but the counter update.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn new(total: u64, description: &str) -> Self {
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})") {
            bar.set_style(style.progress_chars("●○ "));
        }
        bar.set_message(description.to_owned());

        Self { bar }
    }

    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }

    #[inline]
    pub fn add(&self, delta: u64) {
        self.bar.inc(delta);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Done");
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

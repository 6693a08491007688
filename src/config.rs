use std::path::{Path, PathBuf};

pub const DEFAULT_BACKGROUND: &str = "image_cd111d.png";

/// Process settings resolved from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub background: PathBuf,
    /// Seeds the mock data generator; random when absent.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            background: PathBuf::from(DEFAULT_BACKGROUND),
            seed: None,
        }
    }
}

impl Config {
    pub fn new(background: impl AsRef<Path>, seed: Option<u64>) -> Self {
        Self {
            background: background.as_ref().to_path_buf(),
            seed,
        }
    }

    /// Warning to show on the landing view when the background image is
    /// missing. Absence only degrades the look.
    pub fn background_warning(&self) -> Option<String> {
        if self.background.is_file() {
            return None;
        }
        tracing::warn!(path = %self.background.display(), "background image not found");
        Some(format!(
            "Background image '{}' not found. Place it next to the binary for the full landing page look.",
            self.background.display()
        ))
    }
}

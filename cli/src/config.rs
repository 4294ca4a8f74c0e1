use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory (platform default unless overridden) and
    /// create it if needed.
    pub fn load(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir_override {
            Some(dir) => dir,
            None => ProjectDirs::from("", "", "nibble")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join("nibble.db"),
            reports_dir: data_dir.join("reports"),
            data_dir,
        })
    }

    pub fn ensure_reports_dir(&self) -> Result<&PathBuf> {
        std::fs::create_dir_all(&self.reports_dir).with_context(|| {
            format!(
                "Failed to create reports directory: {}",
                self.reports_dir.display()
            )
        })?;
        Ok(&self.reports_dir)
    }
}

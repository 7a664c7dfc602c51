//! `novelsmith init`: create the project state directory.
//!
//! ```text
//! .novelsmith/
//! ├── novel.toml       # Project configuration (defaults written on init)
//! ├── project.json     # Current project document (written by runs)
//! ├── saves/           # Timestamped snapshots
//! ├── exports/         # Markdown exports
//! ├── logs/            # Run logs
//! └── styles/          # Style guides for `start --style <name>`
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::ProjectPaths;
use crate::novel_config::NovelToml;

/// Result of initializing a project directory.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the state directory
    pub state_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
    /// Whether a default novel.toml was written
    pub config_written: bool,
}

/// Initialize `project_dir`, completing the layout if it already exists.
///
/// An existing `novel.toml` is never overwritten.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let paths = ProjectPaths::new(project_dir);
    let created = !paths.is_initialized();
    paths.ensure_directories()?;

    let config_file = paths.config_file();
    let config_written = if config_file.exists() {
        false
    } else {
        NovelToml::default()
            .save(&config_file)
            .with_context(|| format!("Failed to create {}", config_file.display()))?;
        true
    };

    Ok(InitResult {
        state_dir: paths.state_dir,
        created,
        config_written,
    })
}

/// Whether a saved project exists in `project_dir`.
pub fn has_project(project_dir: &Path) -> bool {
    ProjectPaths::new(project_dir).project_file().exists()
}

/// Read a style guide by name from the styles directory, or from a path.
///
/// `name` is tried as given, then as `styles/<name>`, `styles/<name>.md`
/// and `styles/<name>.txt`.
pub fn read_style(paths: &ProjectPaths, name: &str) -> Result<String> {
    let styles = paths.styles_dir();
    let candidates = [
        PathBuf::from(name),
        styles.join(name),
        styles.join(format!("{}.md", name)),
        styles.join(format!("{}.txt", name)),
    ];
    let path = candidates
        .iter()
        .find(|p| p.is_file())
        .with_context(|| format!("Style '{}' not found in {}", name, styles.display()))?;
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read style file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_layout_and_config() {
        let dir = tempdir().unwrap();
        let result = init_project(dir.path()).unwrap();
        assert!(result.created);
        assert!(result.config_written);

        let paths = ProjectPaths::new(dir.path());
        assert!(paths.saves_dir().is_dir());
        assert!(paths.exports_dir().is_dir());
        assert!(paths.styles_dir().is_dir());
        assert_eq!(NovelToml::load(&paths.config_file()).unwrap(), NovelToml::default());
        assert!(!has_project(dir.path()));
    }

    #[test]
    fn test_init_is_idempotent_and_keeps_config() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();
        let config = ProjectPaths::new(dir.path()).config_file();
        std::fs::write(&config, "[workflow]\nchapter_words = 900\n").unwrap();

        let again = init_project(dir.path()).unwrap();
        assert!(!again.created);
        assert!(!again.config_written);
        assert_eq!(
            std::fs::read_to_string(&config).unwrap(),
            "[workflow]\nchapter_words = 900\n"
        );
    }

    #[test]
    fn test_read_style_by_name_and_extension() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();
        let paths = ProjectPaths::new(dir.path());
        std::fs::write(paths.styles_dir().join("noir.md"), "Short sentences.").unwrap();

        assert_eq!(read_style(&paths, "noir").unwrap(), "Short sentences.");
        assert_eq!(
            read_style(&paths, paths.styles_dir().join("noir.md").to_str().unwrap()).unwrap(),
            "Short sentences."
        );
        assert!(read_style(&paths, "gothic").is_err());
    }
}

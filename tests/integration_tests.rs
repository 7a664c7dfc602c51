//! Integration tests for the novelsmith CLI
//!
//! These run the binary against temporary project directories. Nothing here
//! talks to a generation provider.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

use novelsmith::config::ProjectPaths;
use novelsmith::orchestrator::{RunSignals, RunState};
use novelsmith::persistence::{PersistenceManager, SavedSettings};
use novelsmith::project::{LengthClass, Project};
use novelsmith::workflow::{self, concept_stage};

/// Helper to create a novelsmith Command
fn novelsmith() -> Command {
    let mut cmd = cargo_bin_cmd!("novelsmith");
    cmd.env_remove("GEMINI_API_KEY")
        .env_remove("DEEPSEEK_API_KEY")
        .env_remove("NOVELSMITH_PROVIDER");
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

fn init_project(dir: &TempDir) {
    novelsmith()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();
}

/// Save a two-chapter project the way a run would.
fn save_project(dir: &TempDir) {
    let paths = ProjectPaths::new(dir.path());
    paths.ensure_directories().unwrap();
    let mut project = Project::new("Salt Road", "fantasy", "Smugglers", LengthClass::Short).unwrap();
    project.commit(&concept_stage().tasks[0], "Islands of salt and tide.");
    project.commit(
        &workflow::write_chapter_task(1),
        "Chapter 1: The Bell\n\nRain on the harbour.\n\nA bell rang twice.",
    );
    project.commit(
        &workflow::write_chapter_task(2),
        "Chapter 2: Low Water\n\nThe ship sat in mud.",
    );

    let mut state = RunState::new(RunSignals::new());
    state.reset(30);
    PersistenceManager::new(
        paths,
        SavedSettings {
            provider: Default::default(),
            model: "gemini-2.5-pro".into(),
            auto_approve: true,
            pause_on_milestone: true,
            task_interval_ms: 2000,
            chapter_words: 3000,
        },
    )
    .save(&project, &state, None)
    .unwrap();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        novelsmith().arg("--help").assert().success();
    }

    #[test]
    fn test_version() {
        novelsmith().arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = create_temp_project();

        novelsmith()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized novelsmith project"));

        assert!(dir.path().join(".novelsmith").exists());
        assert!(dir.path().join(".novelsmith/novel.toml").exists());
        assert!(dir.path().join(".novelsmith/saves").exists());
        assert!(dir.path().join(".novelsmith/exports").exists());
    }

    #[test]
    fn test_init_idempotent() {
        let dir = create_temp_project();
        init_project(&dir);

        novelsmith()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));
    }

    #[test]
    fn test_status_uninitialized() {
        let dir = create_temp_project();

        novelsmith()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not initialized"));
    }

    #[test]
    fn test_status_without_save() {
        let dir = create_temp_project();
        init_project(&dir);

        novelsmith()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("No saved project yet"));
    }

    #[test]
    fn test_status_with_saved_project() {
        let dir = create_temp_project();
        save_project(&dir);

        novelsmith()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("Salt Road"))
            .stdout(predicate::str::contains("Chapters:     2/20"))
            .stdout(predicate::str::contains("Next chapter: 3"));
    }
}

// =============================================================================
// Run control
// =============================================================================

mod control {
    use super::*;

    #[test]
    fn test_pause_without_active_run() {
        let dir = create_temp_project();
        init_project(&dir);

        novelsmith()
            .current_dir(dir.path())
            .arg("pause")
            .assert()
            .success()
            .stdout(predicate::str::contains("No novel run is currently active"));
        assert!(!dir.path().join(".novelsmith/pause").exists());
    }

    #[test]
    fn test_continue_removes_stale_pause_file() {
        let dir = create_temp_project();
        init_project(&dir);
        fs::write(dir.path().join(".novelsmith/pause"), "pause").unwrap();

        novelsmith()
            .current_dir(dir.path())
            .arg("continue")
            .assert()
            .success()
            .stdout(predicate::str::contains("Continue signal sent"));
        assert!(!dir.path().join(".novelsmith/pause").exists());
    }

    #[test]
    fn test_stop_and_save_without_active_run() {
        let dir = create_temp_project();
        init_project(&dir);

        for command in ["stop", "save"] {
            novelsmith()
                .current_dir(dir.path())
                .arg(command)
                .assert()
                .success()
                .stdout(predicate::str::contains("No novel run is currently active"));
        }
    }
}

// =============================================================================
// Starting and resuming
// =============================================================================

mod runs {
    use super::*;

    #[test]
    fn test_start_requires_api_key() {
        let dir = create_temp_project();

        novelsmith()
            .current_dir(dir.path())
            .args(["start", "--title", "Salt Road", "--concept", "Smugglers"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_start_rejects_unknown_length() {
        let dir = create_temp_project();

        novelsmith()
            .current_dir(dir.path())
            .args([
                "start", "--title", "Salt Road", "--concept", "Smugglers", "--length", "epic",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown length class"));
    }

    #[test]
    fn test_start_refuses_to_overwrite_saved_project() {
        let dir = create_temp_project();
        save_project(&dir);

        novelsmith()
            .current_dir(dir.path())
            .args(["start", "--title", "Other", "--concept", "Something else"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("novelsmith resume"));
    }

    #[test]
    fn test_resume_reports_changed_settings() {
        let dir = create_temp_project();
        save_project(&dir);
        fs::write(
            dir.path().join(".novelsmith/novel.toml"),
            "[workflow]\nchapter_words = 1800\n",
        )
        .unwrap();

        novelsmith()
            .current_dir(dir.path())
            .arg("resume")
            .assert()
            .failure()
            .stdout(predicate::str::contains("chapter_words: 3000 -> 1800"))
            .stderr(predicate::str::contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_resume_without_save() {
        let dir = create_temp_project();
        init_project(&dir);

        novelsmith()
            .current_dir(dir.path())
            .arg("resume")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No saved project found"));
    }
}

// =============================================================================
// Export
// =============================================================================

mod export {
    use super::*;

    #[test]
    fn test_export_full_novel() {
        let dir = create_temp_project();
        save_project(&dir);

        novelsmith()
            .current_dir(dir.path())
            .arg("export")
            .assert()
            .success()
            .stdout(predicate::str::contains("Exported to"));

        let content =
            fs::read_to_string(dir.path().join(".novelsmith/exports/Salt_Road_full.md")).unwrap();
        assert!(content.starts_with("# Salt Road"));
        assert!(content.contains("## Chapter 1 The Bell"));
        assert!(content.contains("## Chapter 2 Low Water"));
    }

    #[test]
    fn test_export_single_chapter_to_default_path() {
        let dir = create_temp_project();
        save_project(&dir);

        novelsmith()
            .current_dir(dir.path())
            .args(["export", "--chapter", "2"])
            .assert()
            .success();

        assert!(
            dir.path()
                .join(".novelsmith/exports/Salt_Road_chapter_002.md")
                .exists()
        );
    }

    #[test]
    fn test_export_missing_chapter_fails() {
        let dir = create_temp_project();
        save_project(&dir);

        novelsmith()
            .current_dir(dir.path())
            .args(["export", "--chapter", "9"])
            .assert()
            .failure();
    }

    #[test]
    fn test_export_without_project() {
        let dir = create_temp_project();
        init_project(&dir);

        novelsmith()
            .current_dir(dir.path())
            .arg("export")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No saved project found"));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();

        novelsmith()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using default configuration"))
            .stdout(predicate::str::contains("provider = \"gemini\""));
    }

    #[test]
    fn test_config_init_then_exists() {
        let dir = create_temp_project();

        novelsmith()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created novel.toml"));

        novelsmith()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_validate_no_config() {
        let dir = create_temp_project();

        novelsmith()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using defaults (valid)"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        init_project(&dir);
        fs::write(
            dir.path().join(".novelsmith/novel.toml"),
            "[generation]\ntemperature = 3.5\n",
        )
        .unwrap();

        novelsmith()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"))
            .stdout(predicate::str::contains("temperature"));
    }

    #[test]
    fn test_config_show_reads_project_file() {
        let dir = create_temp_project();
        init_project(&dir);
        fs::write(
            dir.path().join(".novelsmith/novel.toml"),
            "[generation]\nprovider = \"deepseek\"\n\n[workflow]\nrevision = \"never\"\n",
        )
        .unwrap();

        novelsmith()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("provider = \"deepseek\""))
            .stdout(predicate::str::contains("revision = \"never\""))
            .stdout(predicate::str::contains("api_key = missing"));
    }
}

// =============================================================================
// Global flags
// =============================================================================

mod global_flags {
    use super::*;

    #[test]
    fn test_project_dir_flag() {
        let dir = create_temp_project();

        novelsmith()
            .arg("--project-dir")
            .arg(dir.path())
            .arg("init")
            .assert()
            .success();

        assert!(dir.path().join(".novelsmith/novel.toml").exists());
    }
}

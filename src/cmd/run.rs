//! Writing runs: `novelsmith start` and `novelsmith resume`.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;

use novelsmith::backend::{GenerationBackend, build_backend};
use novelsmith::novel_config::NovelConfig;
use novelsmith::persistence::SavedSettings;
use novelsmith::project::Project;

use super::super::Cli;

/// Parameters of `novelsmith start`.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub title: String,
    pub concept: String,
    pub genre: String,
    pub length: String,
    pub style: Option<String>,
    pub chapters: Option<u32>,
}

pub async fn cmd_start(cli: &Cli, project_dir: &Path, request: StartRequest) -> Result<()> {
    use novelsmith::init::{has_project, init_project, read_style};
    use novelsmith::project::LengthClass;

    init_project(project_dir)?;
    let config = NovelConfig::with_cli_args(project_dir, cli.verbose, cli.yes, cli.task_interval)?;

    if has_project(project_dir) {
        anyhow::bail!(
            "A novel already exists in {}. Run 'novelsmith resume' to continue it.",
            config.paths.state_dir.display()
        );
    }

    let length: LengthClass = request.length.parse()?;
    let mut project = Project::new(&request.title, &request.genre, &request.concept, length)?;
    if let Some(name) = &request.style {
        let content = read_style(&config.paths, name)?;
        project = project.with_style(name, &content);
    }
    if let Some(chapters) = request.chapters {
        if chapters == 0 {
            anyhow::bail!("--chapters must be at least 1");
        }
        project = project.with_target_chapters(chapters);
    }

    let backend = build_backend(&config.toml)?;

    println!(
        "Starting {} ({}, {} chapters) with {}",
        style(&project.title).bold(),
        project.genre,
        project.target_chapters,
        backend.name()
    );

    run_project(&config, project, backend).await
}

pub async fn cmd_resume(cli: &Cli, project_dir: &Path, from: Option<&Path>) -> Result<()> {
    use novelsmith::persistence::{load_from, reconstruct};

    let config = NovelConfig::with_cli_args(project_dir, cli.verbose, cli.yes, cli.task_interval)?;
    let doc = match from {
        Some(path) => load_from(path)?,
        None => {
            let path = config.paths.project_file();
            if !path.exists() {
                anyhow::bail!("No saved project found. Run 'novelsmith start' first.");
            }
            load_from(&path)?
        }
    };

    let mut project = doc.project;
    if project.is_complete() {
        println!(
            "{} is already complete ({} chapters).",
            project.title,
            project.chapters.len()
        );
        return Ok(());
    }

    for change in doc.settings.differences(&saved_settings(&config)) {
        println!("{} {}", style("Setting changed since last save:").yellow(), change);
    }

    let backend = build_backend(&config.toml)?;

    println!(
        "Resuming {} at chapter {} of {}",
        style(&project.title).bold(),
        project.next_chapter_number(),
        project.target_chapters
    );
    if let Some(line) = doc.workflow.interruption() {
        println!("  Interrupted during: {}", line);
    }

    let model = config.toml.model_config();
    if reconstruct(&mut project, backend.as_ref(), &model).await {
        println!("  Context restored from saved history");
    }

    run_project(&config, project, backend).await
}

/// Generation settings recorded with every save.
fn saved_settings(config: &NovelConfig) -> SavedSettings {
    let model = config.toml.model_config();
    SavedSettings {
        provider: model.provider,
        model: model.model,
        auto_approve: config.auto_approve(),
        pause_on_milestone: config.pause_on_milestone(),
        task_interval_ms: config.task_interval().as_millis() as u64,
        chapter_words: config.toml.workflow.chapter_words,
    }
}

/// Wire the run services together and drive `project` to completion or stop.
async fn run_project(
    config: &NovelConfig,
    project: Project,
    backend: Arc<dyn GenerationBackend>,
) -> Result<()> {
    use novelsmith::export::MarkdownExporter;
    use novelsmith::orchestrator::{
        ExecutorSettings, RunController, RunOutcome, RunSettings, RunSignals, StatusReport,
        TaskExecutor,
    };
    use novelsmith::persistence::PersistenceManager;
    use novelsmith::review::{ReviewGate, TerminalReviewSurface, serve_reviews};
    use novelsmith::signals::{RunLock, clear_stale, spawn_watcher};
    use novelsmith::ui::OrchestratorUI;

    let paths = config.paths.clone();
    paths.ensure_directories()?;
    let lock = RunLock::acquire(&paths)?;
    clear_stale(&paths)?;

    let ui = Arc::new(OrchestratorUI::new(
        u64::from(project.target_chapters),
        project.chapters.len() as u64,
        config.verbose,
    ));

    let (gate, inbox) = ReviewGate::channel();
    let review_task = tokio::spawn(serve_reviews(
        inbox,
        TerminalReviewSurface::new(Some(ui.clone())),
    ));

    let workflow = &config.toml.workflow;
    let model = config.toml.model_config();
    let executor = TaskExecutor::new(
        backend,
        gate,
        ExecutorSettings {
            auto_approve: config.auto_approve(),
            pause_on_milestone: config.pause_on_milestone(),
            auto_export_chapters: workflow.auto_export_chapters,
            model,
            prompts: config.toml.prompt_settings(),
        },
    )
    .with_exporter(MarkdownExporter::new(paths.exports_dir()))
    .with_ui(Some(ui.clone()));

    let persistence = PersistenceManager::new(paths.clone(), saved_settings(config));

    let signals = RunSignals::new();
    let watcher = spawn_watcher(paths.clone(), signals.clone());
    let interrupt = {
        let signals = signals.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signals.stop();
            }
        })
    };

    let settings = RunSettings {
        forward_planning_interval: workflow.forward_planning_interval,
        autosave_interval: workflow.autosave_interval,
        task_interval: config.task_interval(),
        revision: workflow.revision,
    };
    let mut controller = RunController::new(project, executor, persistence, signals, settings)
        .with_ui(Some(ui));

    let result = controller.run().await;

    watcher.abort();
    interrupt.abort();
    review_task.abort();

    if let Err(e) = StatusReport::capture(controller.project(), controller.state())
        .write(&paths.status_file())
    {
        tracing::debug!(error = %e, "Could not write final status");
    }
    drop(lock);

    // The UI has already printed the final banner
    if result.context("Writing run failed")? == RunOutcome::Complete {
        println!(
            "Run 'novelsmith export' to assemble {}. Chapter files are in {}",
            controller.project().title,
            paths.exports_dir().display()
        );
    }

    Ok(())
}

//! Project initialization, status and export commands.

use anyhow::Result;
use console::style;
use std::path::Path;

use novelsmith::config::ProjectPaths;
use novelsmith::export::MarkdownExporter;
use novelsmith::orchestrator::StatusReport;
use novelsmith::persistence::load_from;
use novelsmith::signals::is_run_active;

pub fn cmd_init(project_dir: &Path) -> Result<()> {
    use novelsmith::init::init_project;

    let result = init_project(project_dir)?;

    if result.created {
        println!(
            "Initialized novelsmith project at {}",
            result.state_dir.display()
        );
        println!();
        println!("Created directory structure:");
        println!("  .novelsmith/");
        println!("  ├── novel.toml    # Configuration (provider, workflow, logging)");
        println!("  ├── saves/        # Save snapshots");
        println!("  ├── exports/      # Markdown exports");
        println!("  ├── logs/         # Run logs");
        println!("  └── styles/       # Style guides for `--style`");
        println!();
        println!("Next steps:");
        println!("  1. Set GEMINI_API_KEY or DEEPSEEK_API_KEY (or edit novel.toml)");
        println!("  2. Run `novelsmith start --title <title> --concept <premise>`");
    } else {
        println!(
            "novelsmith project already initialized at {}",
            result.state_dir.display()
        );
        if result.config_written {
            println!("Wrote default novel.toml.");
        }
        println!("Directory structure verified.");
    }

    Ok(())
}

pub fn cmd_status(project_dir: &Path) -> Result<()> {
    let paths = ProjectPaths::new(project_dir);

    println!();
    println!("Novel Status");
    println!("============");
    println!();

    if !paths.is_initialized() {
        println!("Project: Not initialized");
        println!();
        println!("Run 'novelsmith init' to initialize the project.");
        println!();
        return Ok(());
    }

    let active = is_run_active(&paths);
    let status_file = paths.status_file();
    if status_file.exists() {
        match StatusReport::read(&status_file) {
            Ok(report) => print_report(&report, active),
            Err(e) => eprintln!(
                "Warning: Could not parse status file (may be partially written): {}",
                e
            ),
        }
    } else {
        println!("Run:      {}", if active { "running" } else { "not running" });
    }

    let project_file = paths.project_file();
    if project_file.exists() {
        let doc = load_from(&project_file)?;
        println!();
        println!("Last save: {}", doc.state.last_save_time.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("  Title:        {}", doc.project.title);
        println!(
            "  Chapters:     {}/{}",
            doc.project.chapters.len(),
            doc.project.target_chapters
        );
        println!("  Next chapter: {}", doc.workflow.next_chapter_number);
        println!("  Plot stage:   {}", doc.context.plot_stage.label());
        if let Some(task) = &doc.workflow.pending_task {
            println!("  Pending task: {}", task);
        }
    } else {
        println!();
        println!("No saved project yet. Run 'novelsmith start' to begin.");
    }
    println!();

    Ok(())
}

fn print_report(report: &StatusReport, active: bool) {
    let state = if active && report.paused {
        style("paused").yellow()
    } else if active {
        style("running").green()
    } else {
        style("not running").dim()
    };
    println!("Run:      {} ({})", state, report.title);
    if let Some(stage) = report.current_stage {
        match report.current_chapter {
            Some(n) => println!("Stage:    {} (chapter {})", stage.label(), n),
            None => println!("Stage:    {}", stage.label()),
        }
    }
    if let (Some(task), Some(role)) = (&report.current_task, report.current_role) {
        println!("Task:     {} - {}", role.label(), task);
    }
    let pct = if report.total_tasks > 0 {
        f64::from(report.completed_tasks) / f64::from(report.total_tasks) * 100.0
    } else {
        0.0
    };
    println!(
        "Progress: {}/{} tasks ({:.1}%)",
        report.completed_tasks, report.total_tasks, pct
    );
    println!(
        "Chapters: {}/{}",
        report.chapters_written, report.target_chapters
    );
    if report.running && !active {
        println!(
            "{}",
            style("The process that wrote this status is no longer running.").yellow()
        );
    }
}

pub fn cmd_export(project_dir: &Path, chapter: Option<u32>, output: Option<&Path>) -> Result<()> {
    let paths = ProjectPaths::new(project_dir);
    let project_file = paths.project_file();
    if !project_file.exists() {
        anyhow::bail!("No saved project found. Run 'novelsmith start' first.");
    }

    let doc = load_from(&project_file)?;
    let exporter = MarkdownExporter::new(paths.exports_dir());
    let path = match chapter {
        Some(n) => exporter.export_chapter(&doc.project, n)?,
        None => exporter.export_full(&doc.project, output)?,
    };

    println!("Exported to {}", style(path.display()).green());
    Ok(())
}

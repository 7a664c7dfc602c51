use crate::ui::icons::{BOOK, CHECK, CROSS, CRYSTAL, PAUSE, PEN, RESUME, SAVE, SKIP, SPARKLE, STOP};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Terminal UI for a writing run, rendered via `indicatif` progress bars.
///
/// Three bars are stacked vertically:
/// - Chapter bar: chapters written out of the target
/// - Stage bar: tasks finished in the current stage
/// - Task spinner: the running task with its elapsed time
///
/// Output from every method goes through `MultiProgress` so it does not
/// tear the bars.
pub struct OrchestratorUI {
    multi: MultiProgress,
    chapter_bar: ProgressBar,
    stage_bar: ProgressBar,
    task_bar: ProgressBar,
    verbose: bool,
    current_task: Mutex<Option<(String, Instant)>>,
}

impl OrchestratorUI {
    /// Create the UI with the chapter bar positioned at `written` of `target`.
    pub fn new(target: u64, written: u64, verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let chapter_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let chapter_bar = multi.add(ProgressBar::new(target));
        chapter_bar.set_style(chapter_style);
        chapter_bar.set_prefix("Chapters");
        chapter_bar.set_position(written);

        let stage_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.green/white}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let stage_bar = multi.add(ProgressBar::new(0));
        stage_bar.set_style(stage_style);
        stage_bar.set_prefix("   Stage");

        let task_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let task_bar = multi.add(ProgressBar::new_spinner());
        task_bar.set_style(task_style);
        task_bar.set_prefix("    Task");

        Self {
            multi,
            chapter_bar,
            stage_bar,
            task_bar,
            verbose,
            current_task: Mutex::new(None),
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` if the rich UI fails.
    pub fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Hide the bars while `f` owns the terminal (interactive prompts).
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.multi.suspend(f)
    }

    pub fn start_stage(&self, title: &str, len: usize) {
        self.stage_bar.set_length(len as u64);
        self.stage_bar.set_position(0);
        self.stage_bar.set_message(title.to_string());
        self.print_line(format!("\n{} {}", BOOK, style(title).bold()));
    }

    pub fn stage_progress(&self, done: usize, len: usize) {
        self.stage_bar.set_length(len as u64);
        self.stage_bar.set_position(done as u64);
    }

    /// Start the task spinner for `role_label: task_name`.
    pub fn start_task(&self, role_label: &str, task_name: &str) {
        let label = format!("{}: {}", style(role_label).cyan(), task_name);
        if let Ok(mut current) = self.current_task.lock() {
            *current = Some((label.clone(), Instant::now()));
        }
        self.task_bar.set_message(format!("{} {}", PEN, label));
        self.task_bar.enable_steady_tick(Duration::from_millis(100));
    }

    /// Refresh the task spinner from the running task's start time.
    ///
    /// Called from the periodic ticker task; does nothing between tasks.
    pub fn tick(&self) {
        let current = self.current_task.lock().ok().and_then(|c| c.clone());
        if let Some((label, started)) = current {
            self.update_elapsed(&label, started.elapsed());
        }
    }

    /// Formats as `Xs` or `Xm Ys`.
    fn update_elapsed(&self, label: &str, elapsed: Duration) {
        let secs = elapsed.as_secs();
        let time_str = if secs >= 60 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}s", secs)
        };
        self.task_bar.set_message(format!(
            "{} {} {}",
            PEN,
            label,
            style(format!("({})", time_str)).dim()
        ));
    }

    fn clear_task(&self) {
        if let Ok(mut current) = self.current_task.lock() {
            *current = None;
        }
    }

    pub fn log_step(&self, msg: &str) {
        if self.verbose {
            self.print_line(format!("    {} {}", style("→").dim(), style(msg).dim()));
        }
    }

    pub fn task_committed(&self, task_name: &str, auto_approved: bool) {
        self.clear_task();
        let how = if auto_approved { "auto-approved" } else { "approved" };
        self.print_line(format!(
            "  {}{} {}",
            CHECK,
            task_name,
            style(format!("({})", how)).dim()
        ));
    }

    pub fn task_skipped(&self, task_name: &str, reason: &str) {
        self.clear_task();
        self.print_line(format!(
            "  {}{} {}",
            SKIP,
            style(task_name).dim(),
            style(format!("({})", reason)).dim()
        ));
    }

    pub fn task_failed(&self, task_name: &str, reason: &str) {
        self.print_line(format!(
            "  {}{} {}",
            CROSS,
            style(task_name).red(),
            style(reason).red()
        ));
    }

    pub fn chapter_complete(&self, number: u32) {
        self.chapter_bar.set_position(u64::from(number));
        self.chapter_bar
            .set_message(format!("chapter {} written", style(number).green()));
    }

    pub fn forward_planning(&self, after_chapter: u32) {
        self.print_line(format!(
            "\n{} Forward planning after chapter {}",
            CRYSTAL,
            style(after_chapter).yellow()
        ));
    }

    pub fn paused(&self) {
        self.task_bar.set_message(format!("{} paused", PAUSE));
        self.print_line(format!("{} Paused. Run `novelsmith continue` to resume.", PAUSE));
    }

    pub fn resumed(&self) {
        self.print_line(format!("{} Continuing", RESUME));
    }

    pub fn saved(&self, path: &Path) {
        self.print_line(format!("{} Saved to {}", SAVE, style(path.display()).dim()));
    }

    pub fn exported(&self, path: &Path) {
        self.log_step(&format!("Exported {}", path.display()));
    }

    /// Clear the bars and print the final banner.
    pub fn finish_complete(&self, chapters: usize) {
        self.task_bar.finish_and_clear();
        self.stage_bar.finish_and_clear();
        self.chapter_bar.finish();
        self.print_line(format!(
            "\n{} Novel complete: {} chapters\n",
            SPARKLE,
            style(chapters).green().bold()
        ));
    }

    pub fn finish_stopped(&self, chapters: usize) {
        self.task_bar.finish_and_clear();
        self.stage_bar.finish_and_clear();
        self.chapter_bar.abandon();
        self.print_line(format!(
            "\n{} Stopped after {} chapters. Run `novelsmith resume` to pick up again.\n",
            STOP,
            style(chapters).yellow().bold()
        ));
    }
}

//! Markdown export of single chapters and the whole novel.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use regex::Regex;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::project::{ArtifactSlot, ChapterRecord, Project};
use crate::util::{safe_file_stem, truncate_chars};

const WORLDVIEW_EXCERPT_CHARS: usize = 1000;
const CHARACTERS_EXCERPT_CHARS: usize = 1500;
const FALLBACK_TITLE_CHARS: usize = 20;
const TITLE_LINE_MAX_CHARS: usize = 50;

static CHAPTER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:chapter\s+[\w]+|第[\d\p{Han}]+章)\s*[:：.\-–—]?\s*").expect("valid regex")
});

/// Writes Markdown files into the project's exports directory.
#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    exports_dir: PathBuf,
}

impl MarkdownExporter {
    pub fn new(exports_dir: impl Into<PathBuf>) -> Self {
        Self {
            exports_dir: exports_dir.into(),
        }
    }

    /// Export chapter `number`, overwriting any earlier export of it.
    pub fn export_chapter(&self, project: &Project, number: u32) -> Result<PathBuf> {
        let chapter = project
            .chapter(number)
            .with_context(|| format!("Chapter {} has not been written", number))?;
        let path = self.exports_dir.join(format!(
            "{}_chapter_{:03}.md",
            safe_file_stem(&project.title),
            number
        ));
        write_file(&path, &render_chapter(project, chapter))?;
        Ok(path)
    }

    /// Export the whole novel to `output`, or to the exports directory.
    pub fn export_full(&self, project: &Project, output: Option<&Path>) -> Result<PathBuf> {
        if project.chapters.is_empty() {
            anyhow::bail!("No chapters to export yet");
        }
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => self
                .exports_dir
                .join(format!("{}_full.md", safe_file_stem(&project.title))),
        };
        write_file(&path, &render_full(project))?;
        Ok(path)
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write export: {}", path.display()))
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Markdown document for one chapter.
pub fn render_chapter(project: &Project, chapter: &ChapterRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", project.title);
    let _ = writeln!(out, "## Chapter {}\n", chapter.number);
    let _ = writeln!(out, "**Written**: {}  ", local_time(chapter.created_at));
    let _ = writeln!(out, "**Genre**: {}  ", project.genre);
    let _ = writeln!(out, "**Length**: about {} characters\n", chapter.char_count());
    out.push_str("---\n\n");
    out.push_str(&format_body(&chapter.content));
    out.push_str("\n\n---\n");
    out
}

/// Markdown document for the whole novel.
pub fn render_full(project: &Project) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", project.title);
    let _ = writeln!(out, "**Genre**: {}  ", project.genre);
    let _ = writeln!(
        out,
        "**Style**: {}  ",
        project.style.as_deref().unwrap_or("default")
    );
    let _ = writeln!(out, "**Chapters**: {}  ", project.chapters.len());
    let _ = writeln!(out, "**Length**: about {} characters  ", rounded_total(project));
    let _ = writeln!(out, "**Written**: {}  ", creation_range(project));
    let _ = writeln!(out, "**Exported**: {}\n", local_time(Utc::now()));
    out.push_str("---\n\n## Synopsis\n\n");
    out.push_str(project.concept.trim());
    out.push_str("\n\n---\n\n## Contents\n\n");

    for chapter in &project.chapters {
        let title = extract_chapter_title(&chapter.content);
        let heading = heading_text(chapter.number, &title);
        let _ = writeln!(out, "- [{}](#{})", heading, anchor(&heading));
    }
    out.push_str("\n---\n\n");

    if let Some(world) = project.context.slot(ArtifactSlot::Worldview) {
        out.push_str("## World\n\n");
        out.push_str(&excerpt(world, WORLDVIEW_EXCERPT_CHARS));
        out.push_str("\n\n---\n\n");
    }
    if let Some(characters) = project.context.slot(ArtifactSlot::Characters) {
        out.push_str("## Characters\n\n");
        out.push_str(&excerpt(characters, CHARACTERS_EXCERPT_CHARS));
        out.push_str("\n\n---\n\n");
    }

    out.push_str("# Story\n\n");
    let last = project.chapters.len().saturating_sub(1);
    for (i, chapter) in project.chapters.iter().enumerate() {
        let title = extract_chapter_title(&chapter.content);
        let _ = writeln!(out, "## {}\n", heading_text(chapter.number, &title));
        out.push_str(&format_body(&strip_title_line(&chapter.content)));
        if i < last {
            out.push_str("\n\n---\n\n");
        }
    }
    out.push('\n');
    out
}

fn heading_text(number: u32, title: &str) -> String {
    if title.is_empty() {
        format!("Chapter {}", number)
    } else {
        format!("Chapter {} {}", number, title)
    }
}

/// GitHub-style heading anchor.
fn anchor(heading: &str) -> String {
    heading
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!(
            "{}\n\n*(More detail appears in the story itself.)*",
            truncate_chars(text.trim(), max_chars)
        )
    } else {
        text.trim().to_string()
    }
}

/// Plain text gets paragraphs normalised; Markdown is kept as is.
fn format_body(content: &str) -> String {
    if content.contains('#') || content.contains("**") {
        return content.trim().to_string();
    }
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn strip_title_line(content: &str) -> String {
    let mut lines = content.lines().skip_while(|l| l.trim().is_empty());
    match lines.next() {
        Some(first) if is_title_line(first) => lines.collect::<Vec<_>>().join("\n"),
        _ => content.to_string(),
    }
}

fn is_title_line(line: &str) -> bool {
    let line = line.trim().trim_start_matches('#').trim();
    line.chars().count() < TITLE_LINE_MAX_CHARS && CHAPTER_PREFIX.is_match(line)
}

/// Title for a chapter: the text after a `Chapter N:` prefix on a short line,
/// else the start of the first non-empty line.
pub fn extract_chapter_title(content: &str) -> String {
    for line in content.lines() {
        let line = line.trim().trim_start_matches('#').trim();
        if line.is_empty() || line.chars().count() >= TITLE_LINE_MAX_CHARS {
            continue;
        }
        if let Some(m) = CHAPTER_PREFIX.find(line) {
            let title = line[m.end()..].trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }

    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|first| {
            if first.chars().count() > FALLBACK_TITLE_CHARS {
                truncate_chars(first, FALLBACK_TITLE_CHARS)
            } else {
                first.to_string()
            }
        })
        .unwrap_or_default()
}

/// Total length rounded to the nearest thousand characters.
fn rounded_total(project: &Project) -> usize {
    let total: usize = project.chapters.iter().map(ChapterRecord::char_count).sum();
    ((total + 500) / 1000) * 1000
}

fn creation_range(project: &Project) -> String {
    match (project.chapters.first(), project.chapters.last()) {
        (Some(first), Some(last)) => {
            let start = first.created_at.with_timezone(&Local).format("%Y-%m-%d").to_string();
            let end = last.created_at.with_timezone(&Local).format("%Y-%m-%d").to_string();
            if start == end {
                start
            } else {
                format!("{} - {}", start, end)
            }
        }
        _ => "-".to_string(),
    }
}

//! Prompt construction.
//!
//! Every prompt is the shared system identity, the role persona, optional
//! style guidance, the project context block and the task instructions. A
//! correction from the reviewer is appended on a modify retry.

use crate::project::{ArtifactSlot, Project, history_key};
use crate::util::truncate_chars;
use crate::workflow::{Role, Task, TaskKind};

const SYSTEM_IDENTITY: &str = "You are part of a collaborative novel-writing system. \
Several specialist roles share one project context and hand work to each other: \
a chief architect, a character designer, a plot strategist, a narrative writer, \
a continuity checker, a quality assessor and a director. Stay consistent with \
everything already established in the project context and answer only with the \
requested document.";

/// Limit applied to each artifact excerpt in the resume priming prompt.
pub const RECONSTRUCTION_EXCERPT_CHARS: usize = 500;

/// Knobs that shape prompts but live in configuration.
#[derive(Debug, Clone)]
pub struct PromptSettings {
    pub chapter_words: u32,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self { chapter_words: 3000 }
    }
}

/// Build the full prompt for `task` against the current project state.
pub fn build_prompt(
    task: &Task,
    project: &Project,
    settings: &PromptSettings,
    feedback: Option<&str>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(SYSTEM_IDENTITY);
    prompt.push_str("\n\n");
    prompt.push_str(task.role.persona());
    prompt.push_str("\n\n");

    if uses_style(task.kind)
        && let Some(style) = project.style_content.as_deref().filter(|s| !s.trim().is_empty())
    {
        prompt.push_str("## Writing style guidance\n");
        prompt.push_str(style.trim());
        prompt.push_str("\n\n");
    }

    prompt.push_str("## Project\n");
    prompt.push_str(&project_context(project));

    if let Some(n) = task.kind.chapter()
        && !matches!(task.kind, TaskKind::WriteChapter(_))
    {
        prompt.push_str(&chapter_under_review(project, n));
    }

    if let TaskKind::ReviseChapter(n) | TaskKind::Revalidate(n) = task.kind {
        prompt.push_str(&review_notes(project, n));
    }

    prompt.push_str("\n## Task: ");
    prompt.push_str(&task.name);
    prompt.push('\n');
    prompt.push_str(&instructions(task.kind, project, settings));

    if let Some(feedback) = feedback {
        prompt.push_str(&correction(feedback));
    }

    prompt
}

/// The block appended when a reviewer asked for changes.
pub fn correction(feedback: &str) -> String {
    format!(
        "\n\n## Reviewer correction\nThe previous output needs changes.\nReviewer suggestion: {}\nRedo the task, applying the suggestion.\n",
        feedback.trim()
    )
}

/// Priming prompt sent once after loading a saved project.
pub fn reconstruction_prompt(project: &Project) -> String {
    let mut prompt = String::new();
    prompt.push_str(SYSTEM_IDENTITY);
    prompt.push_str("\n\n## Resuming project\n");
    prompt.push_str(&format!(
        "Resuming work on \"{}\".\nChapters written: {}\nTarget chapters: {}\nCurrent plot stage: {}\n",
        project.title,
        project.chapters.len(),
        project.target_chapters,
        project.plot_stage().label()
    ));

    if let Some(last) = project.last_chapter() {
        prompt.push_str(&format!(
            "\n## Latest chapter (chapter {})\n- Key events: {}\n- Open hook: {}\n",
            last.number,
            last.leading_lines(3),
            last.trailing_lines(3)
        ));
    }

    for (heading, slot) in [
        ("World", ArtifactSlot::Worldview),
        ("Characters", ArtifactSlot::Characters),
        ("Outline", ArtifactSlot::Outline),
    ] {
        if let Some(text) = project.context.slot(slot) {
            prompt.push_str(&format!(
                "\n## {}\n{}\n",
                heading,
                truncate_chars(text, RECONSTRUCTION_EXCERPT_CHARS)
            ));
        }
    }

    prompt.push_str(
        "\nConfirm your understanding of where the story stands and what the next chapter must accomplish.\n",
    );
    prompt
}

fn uses_style(kind: TaskKind) -> bool {
    matches!(
        kind,
        TaskKind::CoreConcept | TaskKind::WriteChapter(_) | TaskKind::ReviseChapter(_)
    )
}

fn project_context(project: &Project) -> String {
    let mut out = format!(
        "Title: {}\nGenre: {}\nLength: {} (target {} chapters)\nInitial concept: {}\n",
        project.title,
        project.genre,
        project.length,
        project.target_chapters,
        project.concept
    );

    for (heading, slot) in [
        ("World", ArtifactSlot::Worldview),
        ("Characters", ArtifactSlot::Characters),
        ("Story structure", ArtifactSlot::PlotStructure),
        ("Chapter outline", ArtifactSlot::Outline),
        ("Forward plan", ArtifactSlot::ForwardPlan),
    ] {
        if let Some(text) = project.context.slot(slot).filter(|t| !t.trim().is_empty()) {
            out.push_str(&format!("\n### {}\n{}\n", heading, text.trim()));
        }
    }

    if let Some(primer) = project.artifact("reconstructed_context") {
        out.push_str(&format!("\n### Resume notes\n{}\n", primer.trim()));
    }

    let written = project.chapters.len() as u32;
    out.push_str(&format!(
        "\nChapters written: {}\nChapters remaining: {}\n",
        written,
        project.target_chapters.saturating_sub(written)
    ));

    if let Some(last) = project.last_chapter() {
        out.push_str(&format!(
            "Previous chapter {} ended with: {}\n",
            last.number,
            last.trailing_lines(3)
        ));
    }

    out
}

fn chapter_under_review(project: &Project, n: u32) -> String {
    match project.chapter(n) {
        Some(chapter) => format!("\n## Chapter {} text\n{}\n", n, chapter.content.trim()),
        None => format!("\n## Chapter {} text\n(not written yet)\n", n),
    }
}

fn review_notes(project: &Project, n: u32) -> String {
    let mut out = String::from("\n## Review notes\n");
    for (role, name) in [
        (Role::Continuity, "Continuity check"),
        (Role::Quality, "Quality assessment"),
        (Role::Director, "Chapter review"),
    ] {
        if let Some(entry) = project.context.latest_for_chapter(&history_key(role, name), n) {
            out.push_str(&format!("### {}\n{}\n", role.label(), entry.content.trim()));
        }
    }
    out
}

fn instructions(kind: TaskKind, project: &Project, settings: &PromptSettings) -> String {
    let target = project.target_chapters;
    match kind {
        TaskKind::CoreConcept => "Expand the initial concept into a complete world document:\n\
1. Deepen the high concept\n2. Define the world's rules and background\n\
3. Establish the core conflict and themes\n4. Set tone and atmosphere\n\
5. Identify the key world elements"
            .to_string(),
        TaskKind::CharacterConcept => format!(
            "Design 3-5 principal characters that fit the world: the protagonist, \
major allies and the antagonist, their relationships, core motivations and arcs \
sized for {} chapters.",
            target
        ),
        TaskKind::PlotStructure => format!(
            "Design the overall story structure: narrative shape, main plot lines \
and turning points, escalation of the core conflict, pacing, and a first idea of \
the climax and ending. The story must open, develop and resolve within {} chapters.",
            target
        ),
        TaskKind::ConceptReview => "Review the concept work: judge how world, characters \
and structure fit together, name strengths and problems, propose adjustments and \
give direction for detailed planning."
            .to_string(),
        TaskKind::ChapterPlanning => {
            let opening = target * 2 / 10;
            let development = target * 7 / 10;
            let climax = target * 9 / 10;
            format!(
                "Write the full chapter outline for all {target} chapters. For each chapter give \
its title and purpose, main events, scenes, and foreshadowing.\n\
- Opening (1-{opening}): set-up, introductions, the world\n\
- Development ({}-{development}): rising conflict, deepening mysteries\n\
- Climax ({}-{climax}): confrontations and revelations\n\
- Resolution ({}-{target}): resolution and aftermath",
                opening + 1,
                development + 1,
                climax + 1
            )
        }
        TaskKind::CharacterDevelopment => "Deepen the cast: backstories, inner conflicts, \
growth arcs across the outline, and how relationships change."
            .to_string(),
        TaskKind::WorldBuilding => "Flesh out the setting the outline needs: geography, \
history, institutions, culture and any systems the plot relies on."
            .to_string(),
        TaskKind::PlanningAssessment => "Assess the plan: feasibility, pacing, risks of \
sagging middles or rushed endings, and concrete fixes."
            .to_string(),
        TaskKind::PlanningReview => "Sign off the plan or state the changes required \
before writing begins."
            .to_string(),
        TaskKind::WriteChapter(n) => format!(
            "Write the complete text of chapter {n}, about {} words. Follow the outline, keep \
voice and facts consistent with earlier chapters, and manage scene transitions \
and pacing. Start with the chapter title on its own line.",
            settings.chapter_words
        ),
        TaskKind::ContinuityCheck(n) => format!(
            "Check chapter {n} against everything established: facts, timeline, character \
behaviour and world rules. List every inconsistency with a suggested fix."
        ),
        TaskKind::QualityAssessment(n) => format!(
            "Assess chapter {n}: prose, pacing, dialogue, tension and fit with the outline. \
Give an overall score in the form `Score: N/10` and list concrete improvements."
        ),
        TaskKind::ChapterReview(n) => format!(
            "Using the continuity and quality findings, decide whether chapter {n} is \
ready or which revisions it needs."
        ),
        TaskKind::ReviseChapter(n) => format!(
            "Rewrite chapter {n} applying the review notes. Output the complete revised \
chapter, starting with its title on its own line."
        ),
        TaskKind::Revalidate(n) => format!(
            "Re-check the revised chapter {n} and confirm the earlier issues are resolved."
        ),
        TaskKind::FinalScore(n) => format!(
            "Give chapter {n} its final score in the form `Score: N/10` with a short justification."
        ),
        TaskKind::ProgressAnalysis => format!(
            "Analyse the story so far ({} of {} chapters): what is working, open threads, \
pacing against the outline.",
            project.chapters.len(),
            target
        ),
        TaskKind::ForwardPlanning => format!(
            "Plan the next chapters in detail, starting from chapter {}: events, reveals \
and which threads to advance or close.",
            project.next_chapter_number()
        ),
        TaskKind::StrategicDecision => "Decide the direction for the next stretch of the \
story and any course corrections the writers must follow."
            .to_string(),
    }
}

//! Configuration view and validation commands: `novelsmith config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use novelsmith::config::ProjectPaths;
    use novelsmith::novel_config::{NovelConfig, NovelToml};

    let paths = ProjectPaths::new(project_dir);
    let config_path = paths.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Novelsmith Configuration");
            println!("========================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                NovelToml::load(&config_path)?
            } else {
                println!("No novel.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                NovelToml::default()
            };
            print_toml(&toml);

            if config_path.exists() {
                // Layers the user file and environment on top of the project file
                println!("Effective values (with env/CLI overrides):");
                let config = NovelConfig::new(project_dir)?;
                let model = config.toml.model_config();
                println!("  provider = \"{}\"", model.provider);
                println!("  model = \"{}\"", model.model);
                println!(
                    "  api_key = {}",
                    if config.toml.api_key(model.provider).is_some() {
                        "set"
                    } else {
                        "missing"
                    }
                );
                println!();
            } else {
                println!("Run 'novelsmith config init' to create a novel.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No novel.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = NovelToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("novel.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !paths.state_dir.exists() {
                std::fs::create_dir_all(&paths.state_dir)?;
            }

            NovelToml::default().save(&config_path)?;

            println!("Created novel.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [generation] provider, temperature, max_output_tokens");
            println!("  - [gemini] / [deepseek] model, endpoint");
            println!("  - [workflow] auto_approve, pause_on_milestone, revision");
            println!();
        }
    }

    Ok(())
}

fn print_toml(toml: &novelsmith::novel_config::NovelToml) {
    println!("[generation]");
    println!("  provider = \"{}\"", toml.generation.provider);
    println!("  temperature = {}", toml.generation.temperature);
    println!("  max_output_tokens = {}", toml.generation.max_output_tokens);
    println!(
        "  request_timeout_secs = {}",
        toml.generation.request_timeout_secs
    );
    println!();

    println!("[gemini]");
    println!("  model = \"{}\"", toml.gemini.model);
    println!("  endpoint = \"{}\"", toml.gemini.endpoint);
    println!();

    println!("[deepseek]");
    println!("  model = \"{}\"", toml.deepseek.model);
    println!("  endpoint = \"{}\"", toml.deepseek.endpoint);
    println!();

    let workflow = &toml.workflow;
    println!("[workflow]");
    println!("  auto_approve = {}", workflow.auto_approve);
    println!("  pause_on_milestone = {}", workflow.pause_on_milestone);
    println!("  task_interval_ms = {}", workflow.task_interval_ms);
    println!("  chapter_words = {}", workflow.chapter_words);
    println!("  auto_export_chapters = {}", workflow.auto_export_chapters);
    println!(
        "  forward_planning_interval = {}",
        workflow.forward_planning_interval
    );
    println!("  autosave_interval = {}", workflow.autosave_interval);
    println!("  revision = \"{}\"", workflow.revision);
    println!();

    println!("[logging]");
    println!("  level = \"{}\"", toml.logging.level);
    println!("  json = {}", toml.logging.json);
    println!();
}

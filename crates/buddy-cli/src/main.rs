//! buddy - terminal coding assistant backed by Gemini

mod analyzer;
mod commander;
mod config;
mod generator;
mod history;
mod prompt;
mod tools;
mod ui;
mod utils;

use anyhow::Context;
use buddy_agent::{
    ConversationEngine, ConversationTurn, EngineConfig, StreamEvent, ToolDispatcher, spawn_turn,
};
use buddy_ai::providers::GeminiClient;
use clap::Parser;
use config::Config;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// buddy - terminal coding assistant
#[derive(Parser, Debug)]
#[command(name = "buddy")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gemini model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Humor level, 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    humor: Option<u8>,

    /// Session history file
    #[arg(long)]
    history_file: Option<PathBuf>,

    /// Working directory
    #[arg(short, long)]
    working_dir: Option<PathBuf>,

    /// Skip project analysis on startup
    #[arg(long)]
    no_analyze: bool,

    /// Run a single prompt without the TUI
    #[arg(short, long)]
    prompt: Option<String>,

    /// Print one-shot events as JSON lines
    #[arg(long, requires = "prompt")]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

impl Args {
    /// CLI flags take precedence over file and environment
    fn apply_to(&self, cfg: &mut Config) {
        if let Some(model) = &self.model {
            cfg.model = model.clone();
        }
        if let Some(humor) = self.humor {
            cfg.humor_level = humor;
        }
        if let Some(path) = &self.history_file {
            cfg.history_file = path.clone();
        }
        if self.no_analyze {
            cfg.auto_analyze = false;
        }
    }
}

/// Install the tracing subscriber. The TUI owns the terminal, so interactive
/// sessions log to a file.
fn init_logging(cfg: &Config, verbose: bool, to_stderr: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = if verbose { "buddy=debug" } else { cfg.log_level.as_str() };
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    if to_stderr {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    let dir = Config::data_dir();
    let file = std::fs::create_dir_all(&dir).and_then(|_| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("buddy.log"))
    });
    match file {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init(),
        Err(e) => eprintln!("Warning: logging disabled, cannot open log file: {}", e),
    }
}

/// Save the conversation, logging instead of failing
fn persist(
    path: &Path,
    history: &[ConversationTurn],
    project: Option<&analyzer::ProjectInfo>,
    humor_level: u8,
) {
    if let Err(e) = history::save(path, history, project, humor_level) {
        warn!("Failed to save session: {}", e);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize config and exit
    if args.init_config {
        match Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let mut cfg = Config::load();
    args.apply_to(&mut cfg);

    if let Some(dir) = &args.working_dir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("cannot change to {}", dir.display()))?;
    }
    let cwd = std::env::current_dir()?;

    init_logging(&cfg, args.verbose, args.prompt.is_some());
    info!(model = %cfg.model, cwd = %cwd.display(), "starting");

    // Restore the previous session
    let history_path = cfg.history_path(&cwd);
    let session = history::load(&history_path).unwrap_or_else(|e| {
        warn!("Could not load session history: {}", e);
        None
    });
    let (history, mut project, session_humor) = match session {
        Some(data) => {
            info!(
                turns = data.conversations.len(),
                sessions = data.total_sessions,
                "session restored"
            );
            (data.conversations, data.project_info, data.humor_level)
        }
        None => (Vec::new(), None, 0),
    };
    let humor_level = if cfg.humor_level > 0 {
        cfg.humor_level
    } else {
        session_humor
    };

    if cfg.auto_analyze && project.is_none() {
        match analyzer::analyze(&cwd) {
            Ok(info) => {
                persist(&history_path, &history, Some(&info), humor_level);
                project = Some(info);
            }
            Err(e) => warn!("Project analysis failed: {}", e),
        }
    }

    let Some(api_key) = cfg.api_key.clone() else {
        eprintln!("Error: no Gemini API key found");
        eprintln!();
        eprintln!("Set one with: export GEMINI_API_KEY=your-key");
        eprintln!("Or add it to the config file: buddy --init-config");
        std::process::exit(1);
    };

    let dispatcher = Arc::new(tools::Dispatcher::new(
        cwd.clone(),
        cfg.allowed_commands.clone(),
        project.clone(),
    ));
    let declarations = dispatcher.declarations();
    let system_instruction =
        prompt::system_instruction(&declarations, project.as_ref(), humor_level);

    let client = Arc::new(GeminiClient::new(api_key, cfg.model.clone()).with_tools(declarations));
    let engine = Arc::new(ConversationEngine::new(
        client,
        dispatcher.clone(),
        EngineConfig {
            max_stream_advances: cfg.max_stream_advances,
            turn_timeout: cfg.turn_timeout(),
            system_instruction: Some(system_instruction),
        },
    ));

    // Non-interactive mode
    if let Some(input) = args.prompt {
        let mut history = history;
        let reply = run_prompt(engine, &history, input.clone(), args.json).await?;
        buddy_agent::conversation::commit_turn(&mut history, &input, &reply);
        persist(
            &history_path,
            &history,
            dispatcher.cached_project().as_ref(),
            humor_level,
        );
        return Ok(());
    }

    let state = ui::TuiState::new(
        cfg.model.clone(),
        history,
        project.as_ref().map(|p| p.label()),
    );
    ui::run_tui(engine, state, |history| {
        persist(
            &history_path,
            history,
            dispatcher.cached_project().as_ref(),
            humor_level,
        )
    })
    .await
}

/// Run one turn, printing its events to stdout
async fn run_prompt(
    engine: Arc<ConversationEngine>,
    history: &[ConversationTurn],
    input: String,
    json: bool,
) -> anyhow::Result<String> {
    let mut rx = spawn_turn(engine, history.to_vec(), input);
    let mut stdout = std::io::stdout();
    let mut printed_text = false;

    while let Some(event) = rx.recv().await {
        if json {
            writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
        }

        match event {
            StreamEvent::TextChunk { text } => {
                if !json {
                    write!(stdout, "{}", text)?;
                    stdout.flush()?;
                }
                printed_text = true;
            }
            StreamEvent::ToolCallStarted { name, args } if !json => {
                writeln!(
                    stdout,
                    "\n[Running {} {}]",
                    name,
                    utils::args_summary(&args, 120)
                )?;
            }
            StreamEvent::ToolCallFinished {
                name,
                output,
                error,
            } if !json => match error {
                Some(e) => writeln!(stdout, "[{} failed: {}]", name, e)?,
                None => writeln!(
                    stdout,
                    "[{}: {}]",
                    name,
                    utils::truncate_chars(&output, 200)
                )?,
            },
            StreamEvent::TurnComplete { final_text } => {
                if !json {
                    if !printed_text {
                        write!(stdout, "{}", final_text)?;
                    }
                    writeln!(stdout)?;
                }
                return Ok(final_text);
            }
            StreamEvent::TurnError { error } => {
                anyhow::bail!("{}", error);
            }
            _ => {}
        }
    }

    anyhow::bail!("turn ended without a reply")
}

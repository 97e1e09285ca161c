//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use notesgen_core::{
    GenerationOptions, GenerationProgress, IndexStage, LocalContentStage, LocalIndexStage,
    NotesOutcome, Orchestrator, ProgressReporter,
};
use notesgen_generation::{GenerationClient, OllamaClient, OllamaConfig};
use notesgen_shared::{
    AppConfig, BREADCRUMB_SEPARATOR, SyllabusTree, TopicNode, TreeId, init_config, load_config,
    validate_config,
};
use notesgen_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// notesgen: turn a course syllabus into structured study notes.
#[derive(Parser)]
#[command(
    name = "notesgen",
    version,
    about = "Turn a course syllabus into a topic tree and generate study notes for every topic.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides the configured one).
    #[arg(long, global = true, env = "NOTESGEN_DB")]
    pub db: Option<PathBuf>,

    /// Root topic for locally parsed syllabi (overrides the configured one).
    #[arg(long, global = true)]
    pub root_topic: Option<String>,

    /// Notes model (overrides the configured one).
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Flag values that take precedence over the config file.
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    db: Option<PathBuf>,
    root_topic: Option<String>,
    model: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(db) = &self.db {
            config.defaults.db_path = db.to_string_lossy().into_owned();
        }
        if let Some(topic) = &self.root_topic {
            config.defaults.root_topic = topic.clone();
        }
        if let Some(model) = &self.model {
            config.generation.notes_model = model.clone();
        }
    }

    /// Load the config file and apply these overrides on top.
    fn load(&self) -> Result<AppConfig> {
        let mut config = load_config()?;
        self.apply(&mut config);
        Ok(config)
    }
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Syllabus input: inline text or a file.
#[derive(clap::Args)]
#[group(required = true, multiple = false)]
pub(crate) struct SyllabusInput {
    /// Syllabus text.
    text: Option<String>,

    /// Read the syllabus from a file.
    #[arg(short, long)]
    file: Option<PathBuf>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build a tree from a syllabus and generate notes for every topic.
    Produce {
        #[command(flatten)]
        input: SyllabusInput,
    },

    /// Build and store a tree without generating notes.
    Create {
        #[command(flatten)]
        input: SyllabusInput,
    },

    /// Generate (or resume) notes for a stored tree.
    Generate {
        /// Tree ID.
        #[arg(long)]
        id: String,
    },

    /// Print a stored tree.
    Show {
        /// Tree ID.
        #[arg(long)]
        id: String,

        /// Print the notes themselves instead of present/empty markers.
        #[arg(long)]
        full: bool,
    },

    /// List all stored trees.
    List,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "notesgen=info",
        1 => "notesgen=debug",
        _ => "notesgen=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so command output stays pipeable.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        db: cli.db,
        root_topic: cli.root_topic,
        model: cli.model,
    };
    match cli.command {
        Command::Produce { input } => cmd_produce(&input, &overrides).await,
        Command::Create { input } => cmd_create(&input, &overrides).await,
        Command::Generate { id } => cmd_generate(&id, &overrides).await,
        Command::Show { id, full } => cmd_show(&id, full, &overrides).await,
        Command::List => cmd_list(&overrides).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&overrides).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Everything a pipeline command needs.
struct Runtime {
    config: AppConfig,
    storage: Arc<Storage>,
}

impl Runtime {
    /// Resolve config (file plus flags), validate it, and open the database.
    async fn open(overrides: &Overrides) -> Result<Self> {
        let config = overrides.load()?;
        validate_config(&config)?;
        let storage = Arc::new(open_storage(&config).await?);
        Ok(Self { config, storage })
    }

    fn index_stage(&self) -> Result<LocalIndexStage> {
        let client: Arc<dyn GenerationClient> =
            Arc::new(OllamaClient::new(OllamaConfig::structure(&self.config))?);
        Ok(LocalIndexStage::new(
            self.storage.clone(),
            client,
            self.config.defaults.root_topic.clone(),
        ))
    }

    fn content_stage(&self, progress: Arc<dyn GenerationProgress>) -> Result<LocalContentStage> {
        let client: Arc<dyn GenerationClient> =
            Arc::new(OllamaClient::new(OllamaConfig::notes(&self.config))?);
        let options = GenerationOptions {
            lease_ttl: Duration::from_secs(self.config.runs.lease_ttl_secs),
        };
        Ok(LocalContentStage::new(
            self.storage.clone(),
            client,
            options,
            progress,
        ))
    }
}

async fn open_storage(config: &AppConfig) -> Result<Storage> {
    let path = config.db_path()?;
    info!(db = %path.display(), "opening database");
    Ok(Storage::open(&path).await?)
}

fn read_syllabus(input: &SyllabusInput) -> Result<String> {
    match (&input.text, &input.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read syllabus file '{}'", path.display())),
        (None, None) => Err(eyre!("provide syllabus text or --file")),
    }
}

fn parse_id(id: &str) -> Result<TreeId> {
    id.parse::<TreeId>()
        .map_err(|e| eyre!("invalid tree id '{id}': {e}"))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_produce(input: &SyllabusInput, overrides: &Overrides) -> Result<()> {
    let text = read_syllabus(input)?;
    let runtime = Runtime::open(overrides).await?;

    let progress = Arc::new(CliProgress::new());
    let index = runtime.index_stage()?;
    let content = runtime.content_stage(progress.clone())?;

    info!(text_len = text.len(), "producing notes");
    let outcome = Orchestrator::new(&index, &content)
        .produce_notes(&text, progress.as_ref())
        .await;

    print_outcome(&outcome);
    into_result(outcome)
}

async fn cmd_create(input: &SyllabusInput, overrides: &Overrides) -> Result<()> {
    let text = read_syllabus(input)?;
    let runtime = Runtime::open(overrides).await?;

    let id = runtime.index_stage()?.create_tree(&text).await?;
    let tree = runtime.storage.require_tree(&id).await?;

    println!();
    println!("  Tree created.");
    println!("  ID:     {id}");
    println!("  Topic:  {}", tree.root_topic);
    println!("  Nodes:  {}", tree.progress().total);
    println!();

    Ok(())
}

async fn cmd_generate(id: &str, overrides: &Overrides) -> Result<()> {
    let id = parse_id(id)?;
    let runtime = Runtime::open(overrides).await?;

    let progress = Arc::new(CliProgress::new());
    let content = runtime.content_stage(progress.clone())?;

    info!(tree_id = %id, "resuming notes generation");
    let outcome = Orchestrator::resume_only(&content)
        .resume_notes(&id, progress.as_ref())
        .await;

    print_outcome(&outcome);
    into_result(outcome)
}

async fn cmd_show(id: &str, full: bool, overrides: &Overrides) -> Result<()> {
    let id = parse_id(id)?;
    let storage = open_storage(&overrides.load()?).await?;
    let tree = storage.require_tree(&id).await?;

    print!("{}", render_tree(&tree, full));
    Ok(())
}

async fn cmd_list(overrides: &Overrides) -> Result<()> {
    let storage = open_storage(&overrides.load()?).await?;
    let trees = storage.list_trees().await?;

    if trees.is_empty() {
        println!("No trees stored yet.");
        return Ok(());
    }

    for summary in trees {
        println!(
            "{}  {:>4}/{:<4} {}  ({})",
            summary.id,
            summary.progress.resolved,
            summary.progress.total,
            summary.root_topic,
            summary.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(overrides: &Overrides) -> Result<()> {
    let config: AppConfig = overrides.load()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_outcome(outcome: &NotesOutcome) {
    println!();
    match &outcome.tree_id {
        Some(id) => println!("  ID:        {id}"),
        None => println!("  ID:        (none)"),
    }
    println!("  Status:    {}", outcome.status);
    if let Some(report) = &outcome.report {
        println!("  Generated: {}", report.generated);
        println!("  Skipped:   {}", report.skipped);
        if !report.fully_persisted() {
            println!("  Not saved: {}", report.update_misses.len());
            for miss in report.update_miss_errors() {
                println!("    - {miss}");
            }
        }
    }
    if let Some(failure) = &outcome.failure {
        println!("  Error:     {failure}");
    }
    println!("  Time:      {:.1}s", outcome.elapsed.as_secs_f64());
    println!();
}

fn into_result(outcome: NotesOutcome) -> Result<()> {
    outcome.into_result()?;
    Ok(())
}

fn render_tree(tree: &SyllabusTree, full: bool) -> String {
    fn render_node(node: &TopicNode, depth: usize, full: bool, out: &mut String) {
        out.push_str(&render_line(&node.name, &node.result, depth, full));
        for child in &node.children {
            render_node(child, depth + 1, full, out);
        }
    }

    let mut out = format!("{}\n", tree.id);
    out.push_str(&render_line(&tree.root_topic, &tree.result, 0, full));
    for child in &tree.children {
        render_node(child, 1, full, &mut out);
    }

    let progress = tree.progress();
    out.push_str(&format!("\n{}/{} topics have notes\n", progress.resolved, progress.total));
    out
}

fn render_line(name: &str, result: &str, depth: usize, full: bool) -> String {
    let indent = "  ".repeat(depth);
    if !full {
        let marker = if result.is_empty() { "(empty)" } else { "(present)" };
        return format!("{indent}{name} {marker}\n");
    }

    let mut line = format!("{indent}# {name}\n");
    if result.is_empty() {
        line.push_str(&format!("{indent}  (no notes yet)\n"));
    } else {
        for text in result.lines() {
            line.push_str(&format!("{indent}  {text}\n"));
        }
    }
    line.push('\n');
    line
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

/// Last breadcrumb segment, for compact spinner messages.
fn leaf_name(breadcrumb: &str) -> &str {
    breadcrumb
        .rsplit(BREADCRUMB_SEPARATOR)
        .next()
        .unwrap_or(breadcrumb)
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _outcome: &NotesOutcome) {
        self.spinner.finish_and_clear();
    }
}

impl GenerationProgress for CliProgress {
    fn node_started(&self, breadcrumb: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Generating [{current}/{total}] {}", leaf_name(breadcrumb)));
    }

    fn node_skipped(&self, breadcrumb: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Skipping [{current}/{total}] {}", leaf_name(breadcrumb)));
    }

    fn node_generated(&self, breadcrumb: &str, current: usize, total: usize) {
        self.spinner.println(format!("  ✓ [{current}/{total}] {breadcrumb}"));
    }
}

//! CLI binary for pdf2short.
//!
//! A thin shim over the library crate: session commands map onto
//! `SessionStore`, `create` drives a `CreationWorkflow` end to end.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2short::storage::DEFAULT_STATE_FILE;
use pdf2short::{
    plans, resolve_upload, upgrade, AiModel, BackendClient, ClientConfig, CreationWorkflow, Plan,
    ProgressCallback, RemoteCall, ScriptSource, SessionObserver, SessionStore, Settings,
    ShortsError, Step, Theme, UserPatch, WorkflowProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the workflow: the prefix shows the step, the message
/// the call in flight, and every finished call leaves a log line.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Step 1/3");
        bar.set_message("reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn elapsed(&self) -> String {
        let secs = self
            .started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl WorkflowProgressCallback for CliProgressCallback {
    fn on_call_start(&self, call: RemoteCall) {
        if let Ok(mut s) = self.started.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(format!("{call}…"));
    }

    fn on_call_complete(&self, call: RemoteCall) {
        self.bar
            .println(format!("  {} {:<28} {}", green("✓"), call, self.elapsed()));
    }

    fn on_call_error(&self, call: RemoteCall, error: &str) {
        let msg = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} {:<28} {}  {}",
            red("✗"),
            call,
            red(msg),
            self.elapsed()
        ));
    }

    fn on_step_changed(&self, step: Step) {
        match step.number() {
            Some(n) => self.bar.set_prefix(format!("Step {n}/3")),
            None => self.bar.set_prefix("Done"),
        }
    }
}

/// Surface write-through failures; the command itself still succeeds.
struct PersistWarning;

impl SessionObserver for PersistWarning {
    fn on_persist_error(&self, error: &ShortsError) {
        eprintln!("{} session not saved: {}", red("!"), error);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Sign in with the demo account and store a Groq key
  pdf2short login --email user@example.com --password pass
  pdf2short keys set groq gsk_...

  # Turn a PDF into a subtitled short about the ocean
  pdf2short create report.pdf --theme ocean --subtitles

  # Use OpenAI and fetch the PDF from a URL
  pdf2short create --model openai https://arxiv.org/pdf/1706.03762

  # Let the backend write the script with its own credentials
  pdf2short create report.pdf --script-via-backend

  # List videos as JSON
  pdf2short videos --json

MODELS:
  groq     llama-3.1-8b-instant (default)
  openai   gpt-3.5-turbo
  gemini   gemini-2.0-flash

ENVIRONMENT VARIABLES:
  PDF2SHORT_BACKEND_URL      Rendering backend origin (default http://localhost:5050)
  PDF2SHORT_STATE            Session file (default ~/.config/pdf2short/auth-storage.json)
  PDF2SHORT_MODEL            Model for `create` when --model is not given
  PDF2SHORT_API_TIMEOUT      Per-request timeout in seconds (default: none)
  PDF2SHORT_DOWNLOAD_TIMEOUT URL download timeout in seconds
  RUST_LOG                   Override the log filter
"#;

/// Turn PDFs into short narrated videos.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2short",
    version,
    about = "Turn PDFs into short narrated videos",
    long_about = "Upload a PDF to the rendering backend, have an LLM (Groq, OpenAI or Gemini) \
condense it into a short script, and render it as a narrated video over themed footage with \
optional burned-in subtitles.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Rendering backend origin.
    #[arg(long, global = true, env = "PDF2SHORT_BACKEND_URL")]
    backend_url: Option<String>,

    /// Session file holding the user, keys and videos.
    #[arg(long, global = true, env = "PDF2SHORT_STATE")]
    state: Option<PathBuf>,

    /// Per-request timeout in seconds for backend and provider calls.
    #[arg(long, global = true, env = "PDF2SHORT_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, global = true, env = "PDF2SHORT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2SHORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2SHORT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in.
    Login {
        #[arg(long, env = "PDF2SHORT_EMAIL")]
        email: String,
        #[arg(long, env = "PDF2SHORT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PDF2SHORT_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: String,
    },
    /// Sign out. Videos stay on this machine.
    Logout,
    /// Show the signed-in user.
    Whoami {
        #[arg(long)]
        json: bool,
    },
    /// Manage provider API keys.
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Show or change preferences.
    Settings(SettingsArgs),
    /// List produced videos, newest first.
    Videos {
        #[arg(long)]
        json: bool,
    },
    /// Turn a PDF into a video.
    Create(CreateArgs),
    /// Show the subscription plans.
    Plans {
        #[arg(long)]
        json: bool,
    },
    /// Open a checkout session for a paid plan.
    Upgrade {
        /// free, pro or enterprise.
        plan: Plan,
    },
    /// Delete the backend's scratch files.
    Cleanup,
}

#[derive(Subcommand, Debug)]
enum KeysAction {
    /// Store the key for a provider.
    Set {
        model: AiModel,
        key: String,
    },
    /// Remove the key for a provider.
    Clear { model: AiModel },
    /// Show which providers have a key.
    List,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Model preselected in new workflows.
    #[arg(long)]
    default_model: Option<AiModel>,

    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,

    #[arg(long)]
    notifications: Option<bool>,

    /// Display name.
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Provider that writes the script. Defaults to the user's preference.
    #[arg(long, env = "PDF2SHORT_MODEL")]
    model: Option<AiModel>,

    /// Background-footage search query.
    #[arg(long, default_value = "")]
    theme: String,

    /// Burn subtitles into the video.
    #[arg(long)]
    subtitles: bool,

    /// Ask the backend to write the script instead of calling a provider.
    #[arg(long)]
    script_via_backend: bool,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2SHORT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Print the generated script to stderr.
    #[arg(long)]
    show_script: bool,

    /// Disable the spinner.
    #[arg(long, env = "PDF2SHORT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(v: ThemeArg) -> Self {
        match v {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // While the spinner is up, only warnings get through; the spinner
    // already reports each call.
    let show_progress = match &cli.command {
        Command::Create(args) => !cli.quiet && !args.no_progress,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut session = open_session(&cli)?;
    session.subscribe(Arc::new(PersistWarning));

    match &cli.command {
        Command::Login { email, password } => {
            session.login(email, password).context("Login failed")?;
            if let Some(user) = session.user() {
                println!("Signed in as {} <{}>", bold(&user.name), user.email);
            }
        }
        Command::Register {
            email,
            password,
            name,
        } => {
            session.register(email, password, name);
            println!("Registered and signed in as {} <{}>", bold(name), email);
        }
        Command::Logout => {
            session.logout();
            println!("Signed out");
        }
        Command::Whoami { json } => whoami(&session, *json)?,
        Command::Keys { action } => keys(&mut session, action)?,
        Command::Settings(args) => settings(&mut session, args)?,
        Command::Videos { json } => videos(&session, *json)?,
        Command::Create(args) => create(&cli, &mut session, args, show_progress).await?,
        Command::Plans { json } => list_plans(&session, *json)?,
        Command::Upgrade { plan } => {
            let config = build_config(&cli, None, ScriptSource::Provider, None)?;
            let backend = BackendClient::new(&config).context("Failed to create backend client")?;
            match upgrade(&backend, &config, &session, *plan)
                .await
                .context("Upgrade failed")?
            {
                Some(checkout) => {
                    println!("Checkout session: {}", bold(&checkout.id));
                    println!("Complete the payment in the hosted checkout to activate {plan}.");
                }
                None => println!("Nothing to pay for: {plan} needs no checkout."),
            }
        }
        Command::Cleanup => {
            let config = build_config(&cli, None, ScriptSource::Provider, None)?;
            BackendClient::new(&config)
                .context("Failed to create backend client")?
                .cleanup()
                .await
                .context("Cleanup failed")?;
            if !cli.quiet {
                eprintln!("{} backend scratch files removed", green("✔"));
            }
        }
    }

    Ok(())
}

/// `$PDF2SHORT_STATE`, else `~/.config/pdf2short/auth-storage.json`.
fn state_path(cli: &Cli) -> PathBuf {
    if let Some(p) = &cli.state {
        return p.clone();
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".config")
            .join("pdf2short")
            .join(DEFAULT_STATE_FILE),
        None => PathBuf::from(DEFAULT_STATE_FILE),
    }
}

fn open_session(cli: &Cli) -> Result<SessionStore> {
    let path = state_path(cli);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory {}", dir.display()))?;
    }
    SessionStore::open_file(&path)
        .with_context(|| format!("Failed to open session at {}", path.display()))
}

fn require_login(session: &SessionStore) -> Result<()> {
    if session.is_authenticated() {
        Ok(())
    } else {
        Err(ShortsError::NotAuthenticated.into())
    }
}

fn whoami(session: &SessionStore, json: bool) -> Result<()> {
    let user = session.user().ok_or(ShortsError::NotAuthenticated)?;
    if json {
        // Keys never leave the machine through stdout.
        let mut redacted = user.clone();
        redacted.api_keys = Default::default();
        println!(
            "{}",
            serde_json::to_string_pretty(&redacted).context("Failed to serialize user")?
        );
        return Ok(());
    }
    println!("Name:          {}", user.name);
    println!("Email:         {}", user.email);
    println!("Plan:          {}", user.subscription.plan);
    println!(
        "Valid until:   {}",
        user.subscription.valid_until.format("%Y-%m-%d")
    );
    println!("Default model: {}", user.settings.default_model);
    let with_keys: Vec<&str> = AiModel::ALL
        .iter()
        .filter(|m| user.api_keys.get(**m).is_some())
        .map(|m| m.as_str())
        .collect();
    println!(
        "API keys:      {}",
        if with_keys.is_empty() {
            "none".to_string()
        } else {
            with_keys.join(", ")
        }
    );
    Ok(())
}

fn keys(session: &mut SessionStore, action: &KeysAction) -> Result<()> {
    require_login(session)?;
    match action {
        KeysAction::Set { model, key } => {
            session.set_api_key(*model, Some(key.trim().to_string()));
            println!("Stored {model} key");
        }
        KeysAction::Clear { model } => {
            session.set_api_key(*model, None);
            println!("Removed {model} key");
        }
        KeysAction::List => {
            for model in AiModel::ALL {
                let status = if session.api_key_for(model).is_some() {
                    green("set")
                } else {
                    dim("not set")
                };
                println!("{:<8} {}", model.as_str(), status);
            }
        }
    }
    Ok(())
}

fn settings(session: &mut SessionStore, args: &SettingsArgs) -> Result<()> {
    let user = session.user().ok_or(ShortsError::NotAuthenticated)?;
    let current: Settings = user.settings.clone();

    let changed = args.default_model.is_some()
        || args.theme.is_some()
        || args.notifications.is_some()
        || args.name.is_some();
    if changed {
        let settings = Settings {
            default_model: args
                .default_model
                .map(|m| m.as_str().to_string())
                .unwrap_or(current.default_model),
            theme: args.theme.clone().map(Theme::from).unwrap_or(current.theme),
            notifications: args.notifications.unwrap_or(current.notifications),
        };
        session.update_user(UserPatch {
            name: args.name.clone(),
            settings: Some(settings),
            ..Default::default()
        });
    }

    let settings = session
        .user()
        .map(|u| u.settings.clone())
        .unwrap_or_default();
    println!("Default model: {}", settings.default_model);
    println!("Theme:         {}", settings.theme);
    println!("Notifications: {}", settings.notifications);
    Ok(())
}

fn videos(session: &SessionStore, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(session.videos()).context("Failed to serialize videos")?
        );
        return Ok(());
    }
    if session.videos().is_empty() {
        println!("No videos yet. Run `pdf2short create <PDF>` to make one.");
        return Ok(());
    }
    for v in session.videos() {
        println!(
            "{}  {}  {:<16} {}",
            dim(v.id.get(..8).unwrap_or(v.id.as_str())),
            v.created_at.format("%Y-%m-%d %H:%M"),
            v.title,
            v.url
        );
    }
    Ok(())
}

fn list_plans(session: &SessionStore, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(plans()).context("Failed to serialize plans")?
        );
        return Ok(());
    }
    let current = session.user().map(|u| u.subscription.plan);
    for info in plans() {
        let marker = if current == Some(info.plan) {
            green(" (current)")
        } else {
            String::new()
        };
        println!("{} ${}/month{}", bold(info.name), info.price_usd, marker);
        for f in info.features {
            println!("  · {f}");
        }
    }
    Ok(())
}

async fn create(
    cli: &Cli,
    session: &mut SessionStore,
    args: &CreateArgs,
    show_progress: bool,
) -> Result<()> {
    require_login(session)?;

    let system_prompt = match &args.system_prompt {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        ),
        None => None,
    };

    let spinner = show_progress.then(CliProgressCallback::new);
    let progress = spinner
        .clone()
        .map(|cb| cb as Arc<dyn WorkflowProgressCallback>);
    let source = if args.script_via_backend {
        ScriptSource::Backend
    } else {
        ScriptSource::Provider
    };
    let config = build_config(cli, progress, source, system_prompt)?;

    let result = run_workflow(&config, session, args).await;
    if let Some(cb) = &spinner {
        cb.finish();
    }
    let video = result?;

    if !cli.quiet {
        eprintln!(
            "{} {}  {}  →  {}",
            green("✔"),
            bold(&video.title),
            dim(&video.id),
            video.url
        );
    }
    Ok(())
}

async fn run_workflow(
    config: &ClientConfig,
    session: &mut SessionStore,
    args: &CreateArgs,
) -> Result<pdf2short::Video> {
    let pdf = resolve_upload(&args.input, config.download_timeout_secs)
        .await
        .context("Failed to read input")?;

    let mut workflow =
        CreationWorkflow::open(config, session).context("Failed to start workflow")?;
    if let Some(model) = args.model {
        workflow.select_model(model);
    }
    workflow.set_theme(args.theme.clone());
    workflow.set_subtitles(args.subtitles);

    workflow.upload(&pdf).await.context("Upload failed")?;
    workflow
        .generate_script(session)
        .await
        .context("Script generation failed")?;
    if args.show_script {
        if let Some(script) = workflow.script() {
            eprintln!("{}\n{}\n", bold("Script:"), script);
        }
    }
    let video = workflow
        .generate_video(session)
        .await
        .context("Video generation failed")?;
    Ok(video)
}

/// Map CLI args to `ClientConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    source: ScriptSource,
    system_prompt: Option<String>,
) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .download_timeout_secs(cli.download_timeout)
        .script_source(source);

    if let Some(url) = &cli.backend_url {
        builder = builder.backend_url(url.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

use std::{
    fs,
    io::{self, BufRead},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tfdrag::config::{
    self, file::default_config_path, LiveTunables, Tunables, TunablesFile, TunablesSource,
};
use tfdrag::io::{CursorError, CursorSink, PointerCommand};
use tfdrag::replay::{self, ReplayRecord};
use tfdrag::runtime::GestureRuntime;
use tfdrag::shell::{LogNotifier, NoticeLevel, Notifier, StartupManager, XdgAutostart};

const APP_NAME: &str = "tfdrag";

#[derive(Debug, Parser)]
#[command(name = "tfdrag")]
#[command(about = "Three-finger drag gesture engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a recorded contact trace and print the pointer commands.
    Replay(ReplayArgs),
    /// Feed `touch_contacts` lines from stdin to the live runtime.
    Run(RunArgs),
    Config(ConfigArgs),
    Autostart(AutostartArgs),
}

#[derive(Debug, Args)]
struct ReplayArgs {
    trace: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    /// File with the expected command kinds, one per line.
    #[arg(long)]
    expect: Option<PathBuf>,
    /// Drive the threaded runtime with real sleeps instead of a virtual clock.
    #[arg(long)]
    realtime: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
    #[arg(long, global = true)]
    path: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Write a config file with every key set to its default.
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the effective tunables.
    Show,
}

#[derive(Debug, Args)]
struct AutostartArgs {
    #[command(subcommand)]
    action: AutostartAction,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum AutostartAction {
    Enable,
    Disable,
    Status,
}

/// Writes every pointer command to stdout.
struct StdoutCursor;

impl CursorSink for StdoutCursor {
    fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), CursorError> {
        println!("pointer,move,{dx},{dy}");
        Ok(())
    }

    fn button_down(&mut self) -> Result<(), CursorError> {
        println!("pointer,down,0,0");
        Ok(())
    }

    fn button_up(&mut self) -> Result<(), CursorError> {
        println!("pointer,up,0,0");
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Replay(args) => run_replay(&args),
        Commands::Run(args) => run_live(&args),
        Commands::Config(args) => run_config(&args),
        Commands::Autostart(args) => run_autostart(args.action),
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(default_config_path)
}

fn load_effective(explicit: Option<&Path>) -> Result<Tunables> {
    let Some(path) = resolve_config_path(explicit) else {
        return Ok(Tunables::default());
    };
    match config::load_tunables(&path) {
        Ok(tunables) => Ok(tunables),
        Err(err) if err.is_not_found() && explicit.is_none() => Ok(Tunables::default()),
        Err(err) => Err(err).with_context(|| format!("loading {}", path.display())),
    }
}

fn run_replay(args: &ReplayArgs) -> Result<()> {
    let reports = replay::read_trace(&args.trace)?;
    let tunables = load_effective(args.config.as_deref())?;

    let records: Vec<ReplayRecord> = if args.realtime {
        let source: Arc<dyn TunablesSource> = Arc::new(LiveTunables::new(tunables));
        replay::replay_realtime(&reports, source)
            .context("starting runtime")?
            .into_iter()
            .map(|command| ReplayRecord { t_ms: 0, command })
            .collect()
    } else {
        replay::replay(&reports, &tunables)
    };

    println!("pointer,ms,kind,dx,dy");
    for record in &records {
        let (dx, dy) = match record.command {
            PointerCommand::Move { dx, dy } => (dx, dy),
            _ => (0, 0),
        };
        println!(
            "pointer,{},{},{},{}",
            record.t_ms,
            record.command.kind(),
            dx,
            dy
        );
    }

    if let Some(expect_path) = &args.expect {
        let text = fs::read_to_string(expect_path)
            .with_context(|| format!("reading {}", expect_path.display()))?;
        let expected = replay::parse_expected_kinds(&text)
            .with_context(|| format!("parsing {}", expect_path.display()))?;
        let actual: Vec<&'static str> = records.iter().map(|r| r.command.kind()).collect();
        if actual != expected {
            eprintln!("expected kinds: {}", expected.join(","));
            eprintln!("actual kinds:   {}", actual.join(","));
            bail!("pointer command sequence mismatch");
        }
    }
    Ok(())
}

fn run_live(args: &RunArgs) -> Result<()> {
    let source: Arc<dyn TunablesSource> = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Arc::new(TunablesFile::open(path)),
        None => Arc::new(Tunables::default()),
    };
    let mut runtime = GestureRuntime::start(StdoutCursor, source).context("starting runtime")?;
    let sender = runtime.sender();
    let notifier = LogNotifier;
    notifier.notify(NoticeLevel::Info, APP_NAME, "reading contact reports from stdin");

    for (idx, line) in io::stdin().lock().lines().enumerate() {
        let line = line.context("reading stdin")?;
        match replay::parse_trace(&line) {
            Ok(reports) => {
                for report in reports {
                    sender.submit(report.contacts);
                }
            }
            Err(err) => {
                let body = format!("stdin:{}: {err}", idx + 1);
                notifier.notify(NoticeLevel::Warning, "bad report", &body);
            }
        }
    }

    runtime.shutdown();
    Ok(())
}

fn run_config(args: &ConfigArgs) -> Result<()> {
    let path = resolve_config_path(args.path.as_deref())
        .context("no config path: pass --path or set HOME")?;
    match args.action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force)", path.display());
            }
            config::save_tunables(&path, &Tunables::default())?;
            println!("wrote {}", path.display());
        }
        ConfigAction::Show => {
            let tunables = load_effective(args.path.as_deref())?;
            print!("{}", config::file::render_tunables(&tunables)?);
        }
    }
    Ok(())
}

fn run_autostart(action: AutostartAction) -> Result<()> {
    let autostart = XdgAutostart::for_current_user(APP_NAME)?;
    match action {
        AutostartAction::Enable => autostart.enable()?,
        AutostartAction::Disable => autostart.disable()?,
        AutostartAction::Status => {}
    }
    println!(
        "autostart: {} entry={}",
        if autostart.is_enabled() { "enabled" } else { "disabled" },
        autostart.entry_path().display()
    );
    Ok(())
}

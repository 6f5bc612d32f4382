use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use drivesync_lib::input_validation::{rumble_hint, validate_slot};
use drivesync_lib::mapping::SlotChoice;
use drivesync_lib::{
    get_app_version, AutoConfirm, ClientConfig, CommitOutcome, HttpDriveApi, Session,
    SlotTrigger, TerminalPrompt, UiState, UploadOutcome, UserPrompt,
};

#[derive(Parser)]
#[command(name = "drive-cli")]
#[command(about = "Drive emulator client", long_about = None)]
struct Cli {
    /// Server base URL, overrides the config file
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the server and redraw the drive table on every change
    Watch,
    /// Load a local image file into a drive
    Load { slot: i64, file: PathBuf },
    /// Search the server's image repository
    Search {
        term: String,
        /// Drive to load the picked hit into
        #[arg(long, requires = "pick")]
        load: Option<i64>,
        /// Hit number to pick, starting at 1
        #[arg(long)]
        pick: Option<usize>,
    },
    /// Unload a drive
    Unload { slot: i64 },
    /// List the files on a drive's cartridge
    Ls { slot: i64 },
    /// Show or change the hardware drive mapping
    Map {
        #[command(subcommand)]
        action: Option<MapAction>,
    },
    /// Show or set the rumble level
    Rumble { level: Option<i64> },
    /// Re-detect the attached client
    Resync,
    /// Show client and server versions
    Version,
}

#[derive(Subcommand)]
enum MapAction {
    /// Map hardware drives onto slots start..=end
    Set { start: i64, end: i64 },
    /// Disable hardware drives
    Off,
}

enum Prompt {
    Auto(AutoConfirm),
    Terminal(TerminalPrompt),
}

impl UserPrompt for Prompt {
    async fn confirm(&self, title: &str, question: &str) -> bool {
        match self {
            Prompt::Auto(p) => p.confirm(title, question).await,
            Prompt::Terminal(p) => p.confirm(title, question).await,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = ClientConfig::load(cli.config.as_deref())?.with_server(cli.server)?;
    let session = Session::connect(config)?;
    let prompt = if cli.yes {
        Prompt::Auto(AutoConfirm(true))
    } else {
        Prompt::Terminal(TerminalPrompt)
    };

    match cli.command {
        Command::Watch => watch(&session).await,
        Command::Load { slot, file } => {
            let slot = validate_slot(slot)?;
            session.initialize().await;

            let pb = spinner(format!("Loading {} into drive {slot}...", file.display()))?;
            match session.load_file(slot, &file).await {
                Ok(outcome) => report_load(&pb, outcome),
                Err(e) => {
                    pb.abandon_with_message("❌ Load failed!");
                    eprintln!("❌ Error: {e:#}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Command::Search { term, load, pick } => {
            let slot = load.map(validate_slot).transpose()?;

            println!("🔍 Searching for '{term}'...");
            let Some(results) = session.search_now(&term).await else {
                println!("   No results (queries need at least {} characters)", session.config().min_search_len);
                return Ok(());
            };

            println!("📊 {} total hits, showing {}:", results.total, results.hits.len());
            for (i, hit) in results.hits.iter().enumerate() {
                println!("   {:>3}. {hit}", i + 1);
            }

            let Some(pick) = pick else {
                return Ok(());
            };
            let hit = pick
                .checked_sub(1)
                .and_then(|i| results.hits.get(i))
                .ok_or_else(|| anyhow::anyhow!("No hit number {pick}"))?;

            if !session.select_search_result(hit, &prompt).await {
                println!("❎ Selection cancelled");
                return Ok(());
            }
            println!("📌 Selected {hit}");

            if let Some(slot) = slot {
                session.initialize().await;
                let pb = spinner(format!("Loading {hit} into drive {slot}..."))?;
                match session.trigger_slot(slot).await {
                    SlotTrigger::Reference(outcome) => report_load(&pb, outcome),
                    SlotTrigger::Disabled => {
                        pb.abandon_with_message(format!("⚠️  Drive {slot} is not accepting loads"));
                    }
                    SlotTrigger::PickFile => {
                        pb.abandon_with_message("⚠️  Nothing selected");
                    }
                }
            }
            Ok(())
        }
        Command::Unload { slot } => {
            let slot = validate_slot(slot)?;
            if session.unload(slot, &prompt).await? {
                println!("⏏️  Unload of drive {slot} requested");
            } else {
                println!("❎ Unload cancelled");
            }
            Ok(())
        }
        Command::Ls { slot } => {
            let slot = validate_slot(slot)?;
            let listing = session.list_files(slot).await?;
            println!("📝 {}", listing.display());
            Ok(())
        }
        Command::Map { action } => map(&session, action, &prompt).await,
        Command::Rumble { level } => {
            let level = match level {
                Some(level) => Some(session.set_rumble(level).await?),
                None => session.refresh_rumble().await?,
            };
            println!("📳 Rumble: {}", rumble_hint(level));
            Ok(())
        }
        Command::Resync => {
            session.resync().await?;
            println!("🔄 Client resync requested");
            Ok(())
        }
        Command::Version => {
            let server = session.refresh_version().await?;
            println!("drive-cli {}", get_app_version());
            println!("server    {server}");
            Ok(())
        }
    }
}

async fn watch(session: &Session<HttpDriveApi>) -> anyhow::Result<()> {
    println!("👀 Watching {} (Ctrl-C to stop)", session.config().server);
    let mut ui_rx = session.subscribe_ui();

    session.initialize().await;
    render_slots(&ui_rx.borrow_and_update().clone());

    let render = async {
        while ui_rx.changed().await.is_ok() {
            let state = ui_rx.borrow_and_update().clone();
            render_slots(&state);
        }
    };

    tokio::select! {
        stats = session.run_sync() => {
            println!("📊 {} updates, {} idle polls, {} failures", stats.updates, stats.idle_cycles, stats.failures);
        }
        _ = render => {}
        _ = tokio::signal::ctrl_c() => {
            session.shutdown();
            println!();
            println!("👋 Stopped");
        }
    }
    Ok(())
}

async fn map(
    session: &Session<HttpDriveApi>,
    action: Option<MapAction>,
    prompt: &Prompt,
) -> anyhow::Result<()> {
    session.refresh_mapping().await?;

    match action {
        None => {}
        Some(MapAction::Set { start, end }) => {
            let start = validate_slot(start)?;
            let end = validate_slot(end)?;
            if start.get() > end.get() {
                anyhow::bail!("Start drive {start} is after end drive {end}");
            }
            session.select_map_start(SlotChoice::Slot(start.get()));
            session.select_map_end(SlotChoice::Slot(end.get()));
            report_commit(session.commit_mapping(prompt).await?);
        }
        Some(MapAction::Off) => {
            session.select_map_start(SlotChoice::Off);
            report_commit(session.commit_mapping(prompt).await?);
        }
    }

    let mapping = session.mapping();
    let lock = if mapping.locked { "🔒 locked" } else { "🔓 unlocked" };
    println!(
        "🗺️  Hardware drives: start {} end {} ({lock})",
        mapping.start.label(),
        mapping.end.label()
    );
    Ok(())
}

fn report_commit(outcome: CommitOutcome) {
    match outcome {
        CommitOutcome::Blocked => println!("🔒 Mapping is locked by the server"),
        CommitOutcome::Declined => println!("❎ Mapping unchanged"),
        CommitOutcome::Sent { start: 0, end: 0 } => println!("✅ Hardware drives disabled"),
        CommitOutcome::Sent { start, end } => {
            println!("✅ Hardware drives mapped to {start}..{end}")
        }
    }
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn report_load(pb: &ProgressBar, outcome: UploadOutcome) {
    match outcome {
        UploadOutcome::Sent => pb.finish_with_message("✅ Load request accepted"),
        UploadOutcome::Skipped => pb.abandon_with_message("⚠️  Drive is not accepting loads"),
        UploadOutcome::Failed => {
            pb.abandon_with_message("❌ Load failed!");
            std::process::exit(1);
        }
    }
}

fn render_slots(state: &UiState) {
    println!();
    println!("🔌 Client: {}", or_dash(&state.client.label));
    println!("{:<6} {:<28} {:<24} {:<8}", "DRIVE", "CARTRIDGE", "STATUS", "ACTION");
    println!("{}", "-".repeat(69));

    for (i, view) in state.slots.iter().enumerate() {
        println!(
            "{:<6} {:<28} {:<24} {:<8}",
            i + 1,
            or_dash(&view.label),
            view.icon.class(),
            if view.action_enabled { "load" } else { "-" }
        );
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

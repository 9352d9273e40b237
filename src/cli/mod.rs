#![forbid(unsafe_code)]

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory as _, Parser, Subcommand};

use crate::config::{self, Config};
use crate::core::dispatch::{BatchCommand, Dispatcher};
use crate::core::registry::{self, Registry};
use crate::core::select::{self, Resolution};
use crate::core::summary::{self, RepoState, SummaryRow};
use crate::output::style::Style;
use crate::output::table::Table;

#[derive(Debug, Parser)]
#[command(
    name = "mgit",
    version,
    about = "Run git and shell commands across a registry of repositories"
)]
pub struct Cli {
    /// Target selector: comma-separated indices and fuzzy name queries
    /// (e.g. `-t 0`, `-t re1`, `-t web,2`)
    #[arg(short = 't', long = "target", value_name = "SELECTOR")]
    pub target: Option<String>,

    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register a repository path
    RepoAdd(RepoAddArgs),
    /// Remove a repository by index or path
    RepoRm(RepoRmArgs),
    /// List registered repositories (selector filters and highlights)
    RepoList,
    /// Concurrent status overview of the target repositories
    Summary(SummaryArgs),
    /// Run a shell command in every target repository
    Exec(ExecArgs),
    /// Configuration management
    Config(ConfigArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
    /// Any other command is passed to git in every target repository
    #[command(external_subcommand)]
    Git(Vec<OsString>),
}

#[derive(Debug, Parser)]
pub struct RepoAddArgs {
    /// Path to a git repository
    pub path: String,
}

#[derive(Debug, Parser)]
pub struct RepoRmArgs {
    /// 0-based index or repository path
    pub target: String,
}

#[derive(Debug, Parser)]
pub struct SummaryArgs {
    /// Output in JSON format
    #[arg(long = "json")]
    pub json: bool,
    /// Output in CSV format
    #[arg(long = "csv", conflicts_with = "json")]
    pub csv: bool,
    /// Auto-refresh mode
    #[arg(short = 'w', long = "watch")]
    pub watch: bool,
    /// Refresh interval in seconds for watch mode
    #[arg(short = 'i', long = "interval", default_value_t = 5)]
    pub interval_seconds: u64,
}

#[derive(Debug, Parser)]
#[command(trailing_var_arg = true, allow_hyphen_values = true)]
pub struct ExecArgs {
    /// Shell command words, joined and run through the shell
    #[arg(required = true)]
    pub words: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    /// Print the resolved configuration
    List,
    /// Print one configuration value
    Get(ConfigGetArgs),
    /// Set one configuration value
    Set(ConfigSetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.cmd {
        None => {
            Cli::command().print_help()?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "mgit", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config(args)) => match args.cmd {
            ConfigCmd::List => {
                print!("{}", config::list_resolved_toml()?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Get(get) => {
                let val = config::get_value_string(&get.key)?;
                match val {
                    Some(v) => {
                        println!("{v}");
                        Ok(ExitCode::SUCCESS)
                    }
                    None => anyhow::bail!(
                        "configuration key '{}' not found - use 'mgit config list' to see available keys",
                        get.key
                    ),
                }
            }
            ConfigCmd::Set(set) => {
                config::set_value_string(&set.key, &set.value)?;
                println!("Set {} = {}", set.key, set.value);
                Ok(ExitCode::SUCCESS)
            }
        },
        Some(Commands::RepoAdd(args)) => cmd_repo_add(args).await,
        Some(Commands::RepoRm(args)) => cmd_repo_rm(args).await,
        Some(Commands::RepoList) => cmd_repo_list(cli.target).await,
        Some(Commands::Summary(args)) => cmd_summary(cli.target, args).await,
        Some(Commands::Exec(args)) => {
            let line = args.words.join(" ");
            cmd_batch(cli.target, BatchCommand::Shell(line)).await
        }
        Some(Commands::Git(words)) => cmd_batch(cli.target, BatchCommand::Git(words)).await,
    }
}

struct App {
    registry: Registry,
    registry_path: PathBuf,
    style: Style,
}

async fn load_app() -> anyhow::Result<App> {
    let (cfg, registry_path) =
        tokio::task::spawn_blocking(|| -> anyhow::Result<(Config, PathBuf)> {
            let (cfg, paths) = config::load()?;
            let registry_path = config::registry_file(&cfg, &paths)?;
            Ok((cfg, registry_path))
        })
        .await??;

    let style = Style::from_mode(cfg.ui.color);
    let registry = match Registry::load(&registry_path) {
        Ok(reg) => reg,
        Err(e) => {
            // A broken registry file degrades to an empty registry; batch
            // commands still work, nothing is overwritten until a save.
            eprintln!("{}", style.warn(&format!("failed to load registry: {e:#}")));
            Registry::default()
        }
    };

    Ok(App {
        registry,
        registry_path,
        style,
    })
}

impl App {
    fn save_registry(&self) {
        if let Err(e) = self.registry.save(&self.registry_path) {
            eprintln!(
                "{}",
                self.style.warn(&format!("failed to save registry: {e:#}"))
            );
        }
    }

    fn resolve_targets(&self, selector: Option<&str>) -> Resolution {
        let res = select::resolve(selector, &self.registry);
        for token in &res.unmatched {
            eprintln!(
                "{}",
                self.style
                    .warn(&format!("warning: no repository matches '{token}'"))
            );
        }
        res
    }
}

async fn cmd_repo_add(args: RepoAddArgs) -> anyhow::Result<ExitCode> {
    let mut app = load_app().await?;
    let path = config::expand_path(&args.path)?;
    app.registry.add(path.clone())?;
    app.save_registry();
    println!(
        "{}",
        app.style.ok(&format!("Added repository: {}", path.display()))
    );
    Ok(ExitCode::SUCCESS)
}

async fn cmd_repo_rm(args: RepoRmArgs) -> anyhow::Result<ExitCode> {
    let mut app = load_app().await?;
    let resolved = config::expand_path(&args.target).ok();
    let removed = app.registry.remove(&args.target, resolved.as_deref())?;
    app.save_registry();
    println!(
        "{}",
        app.style
            .ok(&format!("Removed repository: {}", removed.display()))
    );
    Ok(ExitCode::SUCCESS)
}

async fn cmd_repo_list(selector: Option<String>) -> anyhow::Result<ExitCode> {
    let app = load_app().await?;
    let res = app.resolve_targets(selector.as_deref());

    println!(
        "{}",
        app.style.header(&format!(
            "Registered repositories ({}/{}):",
            res.targets.len(),
            app.registry.len()
        ))
    );
    for (idx, path) in app.registry.paths().iter().enumerate() {
        let Some(highlights) = res.targets.highlights(path) else {
            continue;
        };
        let name = registry::display_name(path);
        let name = app.style.highlight(&name, highlights, None);
        println!(
            " [{idx}] {name}  {}",
            app.style
                .accent(&format!("({})", config::tilde_path(&path.display().to_string())))
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_batch(selector: Option<String>, command: BatchCommand) -> anyhow::Result<ExitCode> {
    let app = load_app().await?;
    let res = app.resolve_targets(selector.as_deref());
    if res.targets.is_empty() {
        println!("{}", app.style.warn("No repositories selected."));
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{}\n",
        app.style.header(&format!(
            "Running in {} repositories...",
            res.targets.len()
        ))
    );

    let targets = res.targets.snapshot(&app.registry);
    Dispatcher::new(app.style).run(targets, command).await?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_summary(selector: Option<String>, args: SummaryArgs) -> anyhow::Result<ExitCode> {
    if args.watch {
        return cmd_summary_watch(selector, &args).await;
    }

    let app = load_app().await?;
    let res = app.resolve_targets(selector.as_deref());
    if res.targets.is_empty() {
        println!("{}", app.style.warn("No repositories selected."));
        return Ok(ExitCode::SUCCESS);
    }

    let targets = res.targets.snapshot(&app.registry);
    let rows = summary::summarize(targets).await?;
    output_summary(&app.style, &args, &rows)?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_summary_watch(
    selector: Option<String>,
    args: &SummaryArgs,
) -> anyhow::Result<ExitCode> {
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_seconds.max(1)));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                return Ok(ExitCode::SUCCESS);
            }
            _ = ticker.tick() => {
                print!("\x1b[H\x1b[2J");
                // Reload per tick so registry edits show up between refreshes.
                let app = load_app().await?;
                let res = app.resolve_targets(selector.as_deref());
                let targets = res.targets.snapshot(&app.registry);
                let rows = summary::summarize(targets).await?;

                let updated = time::OffsetDateTime::now_utc()
                    .format(&time::format_description::well_known::Rfc3339)
                    .unwrap_or_else(|_| "unknown".to_owned());
                println!("Repository summary - Updated: {updated}\n");
                output_summary(&app.style, args, &rows)?;
                println!("\n[Press Ctrl+C to exit]");
            }
        }
    }
}

fn output_summary(style: &Style, args: &SummaryArgs, rows: &[SummaryRow]) -> anyhow::Result<()> {
    if rows.is_empty() {
        println!("No repositories found");
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    let mut t = Table::new(["REPOSITORY", "BRANCH", "STATUS", "SYNC"])
        .with_min_widths([35, 15, 10, 0]);
    for row in rows {
        t.row([
            style.highlight(&row.name, &row.highlights, None),
            row.branch.clone(),
            format_state(style, row.state),
            format_sync(style, row),
        ]);
    }

    if args.csv {
        t.write_csv()?;
    } else {
        t.print()?;
    }
    Ok(())
}

fn format_state(style: &Style, state: RepoState) -> String {
    match state {
        RepoState::Clean => style.ok("CLEAN"),
        RepoState::Dirty => style.err("CHANGES"),
        RepoState::Error => style.err("ERROR"),
    }
}

fn format_sync(style: &Style, row: &SummaryRow) -> String {
    let Some(sync) = row.sync else {
        return String::new();
    };
    let mut out = String::new();
    if sync.ahead > 0 {
        out.push_str(&style.ok(&format!("↑{} ", sync.ahead)));
    }
    if sync.behind > 0 {
        out.push_str(&style.err(&format!("↓{}", sync.behind)));
    }
    out.trim_end().to_owned()
}

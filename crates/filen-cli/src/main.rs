//! filen: CLI for end-to-end encrypted cloud storage
//!
//! Session commands:
//!   login / logout / whoami
//!
//! Drive commands:
//!   ls, stat, mkdir, mv, rename, trash, restore, delete,
//!   search, find, tree
//!
//! Transfer commands:
//!   upload, download, cp, verify
//!
//! Everything is encrypted and decrypted locally; the service only ever
//! sees ciphertext, filename HMACs, and sizes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use filen_core::{paths, CliConfig, DriveItem, FilenError, Identity, StoredCredentials, TwoFactorChallenge};
use filen_drive::Drive;
use filen_transfer::{BatchController, BatchOptions, BatchSummary, ConflictPolicy};

// ── CLI structure ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "filen",
    version,
    about = "End-to-end encrypted drive client",
    long_about = "filen: manage an end-to-end encrypted drive from the terminal.\n\
                  All content and metadata is encrypted locally before upload."
)]
struct Cli {
    /// Path to the config file (default: ~/.filen-cli/config.toml)
    #[arg(long, short = 'c', env = "FILEN_CLI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and store credentials under ~/.filen-cli
    Login {
        /// Account email (prompted when omitted)
        #[arg(long, env = "FILEN_CLI_EMAIL")]
        email: Option<String>,
        /// Account password (prompted when omitted; prefer the prompt)
        #[arg(long, env = "FILEN_CLI_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Delete the stored credentials
    Logout,

    /// Show the logged-in account
    Whoami,

    /// List a remote folder (or the trash)
    Ls {
        /// Remote path (default: /)
        path: Option<String>,
        /// Long listing: size, modification time, uuid
        #[arg(short = 'l', long)]
        long: bool,
        /// List the trash instead of a path
        #[arg(long)]
        trash: bool,
    },

    /// Show details of one remote item
    Stat { path: String },

    /// Create a folder (recursively, like mkdir -p)
    Mkdir { path: String },

    /// Move an item into another folder
    Mv {
        source: String,
        /// Destination folder
        dest: String,
    },

    /// Rename an item in place
    Rename {
        path: String,
        new_name: String,
    },

    /// Move an item to the trash
    Trash { path: String },

    /// Restore an item from the trash by name
    Restore { name: String },

    /// Permanently delete an item (no trash, no undo)
    Delete {
        path: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Upload files or directories
    #[command(alias = "up")]
    Upload {
        /// Local sources followed by the remote destination folder. A
        /// trailing slash on a directory uploads its contents instead of
        /// the directory itself.
        #[arg(required = true, num_args = 2.., value_name = "SOURCES... TARGET")]
        paths: Vec<String>,
        /// Recurse into directories
        #[arg(long, short = 'r')]
        recursive: bool,
        /// Glob patterns to include (any match permits)
        #[arg(long)]
        include: Vec<String>,
        /// Glob patterns to exclude (any match denies)
        #[arg(long)]
        exclude: Vec<String>,
        /// What to do when the destination exists
        #[arg(long, value_enum)]
        on_conflict: Option<ConflictArg>,
        /// Overwrite conflicts and never prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Preserve local timestamps in the remote metadata
        #[arg(long, short = 'p')]
        preserve: bool,
    },

    /// Download a remote file or folder
    #[command(alias = "down")]
    Download {
        /// Remote path
        remote: String,
        /// Local destination (default: current directory)
        #[arg(long, short = 't', default_value = ".")]
        target: PathBuf,
        /// Recurse into folders
        #[arg(long, short = 'r')]
        recursive: bool,
        #[arg(long)]
        include: Vec<String>,
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(long, value_enum)]
        on_conflict: Option<ConflictArg>,
        /// Overwrite conflicts and never prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Search the whole drive for file names containing a query
    Search {
        query: String,
        /// Maximum folder depth (-1 = unbounded)
        #[arg(long, default_value_t = -1)]
        maxdepth: i32,
    },

    /// Find files under a folder by glob pattern (case-insensitive)
    Find {
        path: String,
        pattern: String,
        /// Maximum folder depth (-1 = unbounded)
        #[arg(long, default_value_t = -1)]
        maxdepth: i32,
    },

    /// Print a folder subtree
    Tree {
        /// Remote path (default: /)
        path: Option<String>,
        /// Maximum depth (-1 = unbounded)
        #[arg(long, short = 'd', default_value_t = -1)]
        depth: i32,
    },

    /// Copy a file (download + re-upload; folders are not supported)
    Cp {
        source: String,
        dest: String,
    },

    /// Check a local file against the remote content hash
    Verify {
        remote: String,
        local: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConflictArg {
    Skip,
    Overwrite,
    Newer,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Skip => ConflictPolicy::Skip,
            ConflictArg::Overwrite => ConflictPolicy::Overwrite,
            ConflictArg::Newer => ConflictPolicy::Newer,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| paths::data_dir().join("config.toml"));
    let config = CliConfig::load(&config_path)?;

    match cli.command {
        Commands::Login { email, password } => cmd_login(&config, email, password).await,
        Commands::Logout => cmd_logout(),
        Commands::Whoami => cmd_whoami(),
        Commands::Ls { path, long, trash } => {
            let drive = open_drive(&config)?;
            cmd_ls(&drive, path.as_deref(), long, trash).await
        }
        Commands::Stat { path } => {
            let drive = open_drive(&config)?;
            cmd_stat(&drive, &path).await
        }
        Commands::Mkdir { path } => {
            let drive = open_drive(&config)?;
            drive.mkdir_p(&path, None, None).await?;
            println!("created {}", paths::normalize(&path));
            Ok(())
        }
        Commands::Mv { source, dest } => {
            let drive = open_drive(&config)?;
            drive.move_item(&source, &dest).await?;
            println!("moved {} -> {}", paths::normalize(&source), paths::normalize(&dest));
            Ok(())
        }
        Commands::Rename { path, new_name } => {
            let drive = open_drive(&config)?;
            drive.rename(&path, &new_name).await?;
            println!("renamed {} -> {new_name}", paths::normalize(&path));
            Ok(())
        }
        Commands::Trash { path } => {
            let drive = open_drive(&config)?;
            drive.trash(&path).await?;
            println!("trashed {}", paths::normalize(&path));
            Ok(())
        }
        Commands::Restore { name } => {
            let drive = open_drive(&config)?;
            drive.restore_from_trash(&name).await?;
            println!("restored {name}");
            Ok(())
        }
        Commands::Delete { path, force } => {
            let drive = open_drive(&config)?;
            cmd_delete(&drive, &path, force).await
        }
        Commands::Upload {
            mut paths,
            recursive,
            include,
            exclude,
            on_conflict,
            force,
            preserve,
        } => {
            let target = paths.pop().expect("clap enforces at least two arguments");
            let sources = paths;
            let drive = open_drive(&config)?;
            let opts = BatchOptions {
                recursive,
                include,
                exclude,
                conflict: resolve_conflict_policy(on_conflict, force, sources.len() == 1),
                force,
                preserve_timestamps: preserve,
            };
            cmd_upload(&config, &drive, &sources, &target, opts).await
        }
        Commands::Download {
            remote,
            target,
            recursive,
            include,
            exclude,
            on_conflict,
            force,
        } => {
            let drive = open_drive(&config)?;
            let opts = BatchOptions {
                recursive,
                include,
                exclude,
                conflict: resolve_conflict_policy(on_conflict, force, !recursive),
                force,
                preserve_timestamps: false,
            };
            cmd_download(&config, &drive, &remote, &target, opts).await
        }
        Commands::Search { query, maxdepth } => {
            let drive = open_drive(&config)?;
            let hits = drive.search(&query, maxdepth).await?;
            for hit in &hits {
                println!("{}", hit.path);
            }
            eprintln!("{} match(es)", hits.len());
            Ok(())
        }
        Commands::Find {
            path,
            pattern,
            maxdepth,
        } => {
            let drive = open_drive(&config)?;
            let hits = drive.find(&path, &pattern, maxdepth).await?;
            for hit in &hits {
                println!("{}", hit.path);
            }
            eprintln!("{} match(es)", hits.len());
            Ok(())
        }
        Commands::Tree { path, depth } => {
            let drive = open_drive(&config)?;
            print!("{}", drive.tree(path.as_deref().unwrap_or("/"), depth).await?);
            Ok(())
        }
        Commands::Cp { source, dest } => {
            let drive = open_drive(&config)?;
            let outcome = filen_transfer::copy_file(&drive, &source, &dest).await?;
            println!(
                "copied {} -> {} ({})",
                paths::normalize(&source),
                paths::normalize(&dest),
                fmt_bytes(outcome.size)
            );
            Ok(())
        }
        Commands::Verify { remote, local } => cmd_verify(&config, &remote, &local).await,
    }
}

// ── Session plumbing ──────────────────────────────────────────────────────────

fn open_drive(config: &CliConfig) -> Result<Drive> {
    let creds = StoredCredentials::load(&StoredCredentials::default_path())?
        .ok_or(FilenError::AuthMissing)?;
    let identity = creds.into_identity()?;
    build_drive(config, identity)
}

fn build_drive(config: &CliConfig, identity: Identity) -> Result<Drive> {
    let transport = filen_client::HttpTransport::new(
        &config.api,
        Some(identity.api_key.clone()),
        Duration::from_secs(config.transfer.chunk_timeout_secs),
    )?;
    Ok(Drive::new(
        Arc::new(transport),
        identity,
        Duration::from_secs(config.cache.listing_ttl_secs),
    ))
}

// ── login / logout / whoami ──────────────────────────────────────────────────

async fn cmd_login(
    config: &CliConfig,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(e) => e,
        None => prompt_line("Email: ")?,
    };
    let password = SecretString::from(match password {
        Some(p) => p,
        None => rpassword::prompt_password("Password: ")
            .context("failed to read password from terminal")?,
    });

    let mut two_factor: Option<String> = None;
    let identity = loop {
        match filen_client::login(&config.api, &email, &password, two_factor.as_deref()).await {
            Ok(identity) => break identity,
            Err(FilenError::AuthChallenge(challenge)) => {
                match challenge {
                    TwoFactorChallenge::Required => {
                        eprintln!("This account requires a two-factor code.")
                    }
                    TwoFactorChallenge::Wrong => eprintln!("That code was not accepted."),
                }
                two_factor = Some(prompt_line("2FA code: ")?);
            }
            Err(e) => return Err(e.into()),
        }
    };

    StoredCredentials::from_identity(&identity).save(&StoredCredentials::default_path())?;
    println!(
        "logged in as {} ({} master key(s))",
        identity.email,
        identity.master_keys.len()
    );
    Ok(())
}

fn cmd_logout() -> Result<()> {
    if StoredCredentials::delete(&StoredCredentials::default_path())? {
        println!("logged out");
    } else {
        println!("no stored credentials");
    }
    Ok(())
}

fn cmd_whoami() -> Result<()> {
    match StoredCredentials::load(&StoredCredentials::default_path())? {
        Some(creds) => {
            println!("{}", creds.email);
            Ok(())
        }
        None => Err(FilenError::AuthMissing.into()),
    }
}

// ── Listings ─────────────────────────────────────────────────────────────────

async fn cmd_ls(drive: &Drive, path: Option<&str>, long: bool, trash: bool) -> Result<()> {
    let items = if trash {
        drive.list_trash().await?
    } else {
        let folder = drive.resolve_folder(path.unwrap_or("/")).await?;
        drive.list(&folder.uuid).await?
    };

    for item in &items {
        match item {
            DriveItem::Folder(f) => {
                if long {
                    println!("{:>10}  {:>16}  {}/", "-", fmt_time(f.timestamp), f.name);
                } else {
                    println!("{}/", f.name);
                }
            }
            DriveItem::File(f) => {
                if long {
                    println!(
                        "{:>10}  {:>16}  {}",
                        fmt_bytes(f.size),
                        fmt_time(f.last_modified_ms),
                        f.name
                    );
                } else {
                    println!("{}", f.name);
                }
            }
        }
    }
    Ok(())
}

async fn cmd_stat(drive: &Drive, path: &str) -> Result<()> {
    match drive.resolve(path).await? {
        filen_drive::ResolvedItem::Folder(f) => {
            println!("{}", paths::normalize(path));
            println!("  kind:     folder");
            println!("  uuid:     {}", f.uuid);
            if f.timestamp > 0 {
                println!("  created:  {}", fmt_time(f.timestamp));
            }
        }
        filen_drive::ResolvedItem::File(f) => {
            println!("{}", paths::normalize(path));
            println!("  kind:     file");
            println!("  uuid:     {}", f.uuid);
            println!("  size:     {} ({} bytes)", fmt_bytes(f.size), f.size);
            println!("  chunks:   {}", f.chunks);
            println!("  mime:     {}", f.mime);
            println!("  modified: {}", fmt_time(f.last_modified_ms));
            if !f.total_hash.is_empty() {
                println!("  sha512:   {}", f.total_hash);
            }
        }
    }
    Ok(())
}

async fn cmd_delete(drive: &Drive, path: &str, force: bool) -> Result<()> {
    if !force {
        let question = format!(
            "permanently delete {} (cannot be undone)?",
            paths::normalize(path)
        );
        if !confirm(&question)? {
            println!("aborted");
            return Ok(());
        }
    }
    drive.delete_permanent(path).await?;
    println!("deleted {}", paths::normalize(path));
    Ok(())
}

// ── Transfers ────────────────────────────────────────────────────────────────

async fn cmd_upload(
    config: &CliConfig,
    drive: &Drive,
    sources: &[String],
    target: &str,
    opts: BatchOptions,
) -> Result<()> {
    let controller = batch_controller(config, drive, opts);
    let summary = controller.run_upload(sources, target).await?;
    print_summary("upload", &summary);
    finish(summary)
}

async fn cmd_download(
    config: &CliConfig,
    drive: &Drive,
    remote: &str,
    target: &Path,
    opts: BatchOptions,
) -> Result<()> {
    let controller = batch_controller(config, drive, opts);
    let summary = controller.run_download(remote, target).await?;
    print_summary("download", &summary);
    finish(summary)
}

fn batch_controller<'a>(
    config: &CliConfig,
    drive: &'a Drive,
    opts: BatchOptions,
) -> BatchController<'a> {
    let bar = make_progress_bar();
    let chunk_bar = bar.clone();
    let task_bar = bar.clone();

    BatchController::new(drive, filen_transfer::state::default_state_dir(), opts)
        .with_save_policy(
            config.transfer.save_chunk_interval,
            Duration::from_secs(config.transfer.save_interval_secs),
        )
        .with_prompt(Arc::new(|question: &str| {
            confirm(question).unwrap_or(false)
        }))
        .with_task_hook(Arc::new(move |index, total, label| {
            task_bar.set_prefix(format!("[{}/{}]", index + 1, total));
            task_bar.set_message(label.to_string());
            task_bar.set_position(0);
            task_bar.set_length(0);
        }))
        .with_progress(Arc::new(move |_done, _chunks, bytes, size| {
            chunk_bar.set_length(size);
            chunk_bar.set_position(bytes);
        }))
}

async fn cmd_verify(config: &CliConfig, remote: &str, local: &Path) -> Result<()> {
    let drive = open_drive(config)?;
    match filen_transfer::verify_file(&drive, remote, local).await {
        Ok(_) => {
            println!("hashes match");
            Ok(())
        }
        Err(FilenError::IntegrityMismatch { local, remote }) => {
            eprintln!("hashes differ");
            eprintln!("  local:  {local}");
            eprintln!("  remote: {remote}");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// No conflict flag on a single-file command on a terminal means: ask.
fn resolve_conflict_policy(
    flag: Option<ConflictArg>,
    force: bool,
    single_item: bool,
) -> ConflictPolicy {
    match flag {
        Some(arg) => arg.into(),
        None if force => ConflictPolicy::Overwrite,
        None if single_item && std::io::stdin().is_terminal() => ConflictPolicy::Ask,
        None => ConflictPolicy::Skip,
    }
}

fn print_summary(kind: &str, summary: &BatchSummary) {
    println!();
    println!("{kind} complete:");
    println!("  done:        {} ({})", summary.completed, fmt_bytes(summary.bytes));
    println!("  skipped:     {}", summary.skipped);
    if summary.interrupted > 0 {
        println!("  interrupted: {} (re-run the command to resume)", summary.interrupted);
    }
    if summary.errors > 0 {
        println!("  errors:      {}", summary.errors);
    }
}

fn finish(summary: BatchSummary) -> Result<()> {
    let code = summary.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

// ── Terminal helpers ─────────────────────────────────────────────────────────

fn make_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{prefix:.bold} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
        )
        .unwrap()
        .progress_chars("=>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading from stdin")?;
    Ok(line.trim().to_string())
}

/// y/N confirmation; anything but an explicit yes is No.
fn confirm(question: &str) -> Result<bool> {
    let answer = prompt_line(&format!("{question} [y/N] "))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

fn fmt_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn fmt_time(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

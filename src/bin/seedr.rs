use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use seedr_dl::api::{self, SeedrClient, Token, TokenStore};
use seedr_dl::{AppConfig, FolderId, Transfer};

#[derive(Parser)]
#[command(name = "seedr")]
#[command(about = "Browse and download files from a Seedr account", version)]
struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory downloads are saved to
    #[arg(long, global = true, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive browser (default)
    Tui,
    /// Print the folder tree with file ids
    List {
        /// Folder to start from
        #[arg(default_value = FolderId::ROOT)]
        folder: String,
    },
    /// Print a download link for a file, or an archive link for a folder
    Get {
        id: String,
        /// Treat the id as a folder and create an archive
        #[arg(long)]
        folder: bool,
    },
    /// Add a magnet link or .torrent file
    Add {
        source: String,
        /// Target folder id
        #[arg(long, default_value = FolderId::ROOT)]
        folder: String,
        /// Treat the source as a wishlist entry id
        #[arg(long)]
        wishlist: bool,
    },
    /// Download files by id
    Download {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete a file, or a folder with --folder
    Rm {
        id: String,
        /// Treat the id as a folder
        #[arg(long)]
        folder: bool,
    },
    /// Authorize this device and save the token
    Login,
}

/// Logs go to stderr, except in the TUI where they would corrupt the screen.
fn init_logging(debug: bool, log_file: Option<PathBuf>) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if debug { "debug" } else { "warn" }),
    );
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(_) => {
                // Nowhere safe to write; stay silent rather than draw over the UI.
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }
    builder.init();
}

/// Loads the saved token, running the device flow when there is none.
async fn session_token(
    http: &reqwest::Client,
    config: &AppConfig,
    store: &TokenStore,
) -> seedr_dl::Result<Token> {
    if let Some(token) = store.load().await? {
        log::debug!("Loaded token from {}", store.path().display());
        return Ok(token);
    }
    log::info!("No token found, starting device authorization");
    login(http, config, store).await
}

#[cfg(feature = "cli")]
async fn login(http: &reqwest::Client, config: &AppConfig, store: &TokenStore) -> seedr_dl::Result<Token> {
    seedr_dl::cli::login(http, &config.api, store).await
}

#[cfg(not(feature = "cli"))]
async fn login(_http: &reqwest::Client, _config: &AppConfig, store: &TokenStore) -> seedr_dl::Result<Token> {
    Err(seedr_dl::Error::Token(format!(
        "no token at {}; log in with a build that has the 'cli' feature",
        store.path().display()
    )))
}

#[tokio::main]
async fn main() -> seedr_dl::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);

    let config_path = cli.config.unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path)?;
    if let Some(dir) = cli.download_dir {
        config.paths.download_dir = dir;
    }

    let tui_mode = matches!(command, Commands::Tui);
    init_logging(cli.debug, tui_mode.then(|| config.paths.log_file()));
    log::debug!("Using config {}", config_path.display());

    let http = api::http_client()?;
    let store = TokenStore::new(config.paths.token_path.clone());

    if matches!(command, Commands::Login) {
        login(&http, &config, &store).await?;
        return Ok(());
    }

    let token = session_token(&http, &config, &store).await?;
    let client = Arc::new(SeedrClient::new(http.clone(), config.api.clone(), token).with_token_store(store));
    let transfer = Transfer::new(
        client.clone(),
        http,
        config.transfer.clone(),
        config.paths.download_dir.clone(),
    );

    match command {
        Commands::Tui => {
            #[cfg(feature = "tui")]
            {
                let services = seedr_dl::tui::Services {
                    remote: client,
                    transfer: Arc::new(transfer),
                    launcher: Arc::new(seedr_dl::SystemLauncher::new(config.external.clone())),
                    metadata_timeout: config.transfer.metadata_timeout(),
                };
                seedr_dl::tui::run(services).await.map_err(seedr_dl::Error::Io)
            }
            #[cfg(not(feature = "tui"))]
            {
                let _ = (client, transfer);
                eprintln!("TUI support not compiled in");
                std::process::exit(1);
            }
        }
        #[cfg(feature = "cli")]
        command => run_cli(command, client.as_ref(), &transfer).await,
        #[cfg(not(feature = "cli"))]
        _ => {
            let _ = (client, transfer);
            eprintln!("CLI support not compiled in");
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "cli")]
async fn run_cli(command: Commands, client: &SeedrClient, transfer: &Transfer) -> seedr_dl::Result<()> {
    use seedr_dl::cli;

    match command {
        Commands::List { folder } => cli::list(client, &FolderId::new(folder)).await,
        Commands::Get { id, folder } => cli::get(client, &id, folder).await,
        Commands::Add {
            source,
            folder,
            wishlist,
        } => cli::add(client, &source, wishlist, &FolderId::new(folder)).await,
        Commands::Download { ids } => cli::download(transfer, &ids).await,
        Commands::Rm { id, folder } => cli::rm(client, &id, folder).await,
        Commands::Tui | Commands::Login => Ok(()),
    }
}

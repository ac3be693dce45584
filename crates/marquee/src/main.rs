mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use marquee::api::{Category, CollectionKind, ItemId};

// ============================================================================
// CLI Types
// ============================================================================

/// Marquee - browse the movie catalog and keep your favorites, watchlist and ratings in sync
#[derive(Parser, Debug)]
#[command(version = marquee::build_info::VERSION, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "marquee.yaml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and store credentials
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(long, env = "MARQUEE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget stored credentials
    Logout,

    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        username: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// Password (prompted when omitted)
        #[arg(long, env = "MARQUEE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show the signed-in user
    Whoami {
        /// Fetch the profile from the server instead of the local copy
        #[arg(long)]
        refresh: bool,
    },

    /// Update profile fields
    Profile {
        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        bio: Option<String>,
    },

    /// Change the account password (prompts for old, new and confirmation)
    Passwd,

    /// Permanently delete the account
    DeleteAccount {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Browse a feed category [popular, top-rated, now-playing, upcoming]
    Browse {
        #[arg(default_value = "popular")]
        category: Category,

        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Search the catalog
    Search {
        query: String,

        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// List one of your collections [favorites, watchlist, watched, rated]
    Collection {
        kind: CollectionKind,

        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Show item details
    Show { id: ItemId },

    /// Toggle favorite
    Favorite { id: ItemId },

    /// Toggle watchlist
    Watchlist { id: ItemId },

    /// Toggle watched
    Watched { id: ItemId },

    /// Rate an item from 0.5 to 10 in half steps, or clear with "clear" / 0
    Rate { id: ItemId, rating: String },
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_str();

    match cli.command {
        Commands::Login { email, password } => commands::auth::login(config, &email, password).await,
        Commands::Logout => commands::auth::logout(config).await,
        Commands::Register {
            email,
            username,
            first_name,
            last_name,
            password,
        } => {
            commands::auth::register(config, email, username, first_name, last_name, password).await
        }
        Commands::Whoami { refresh } => commands::auth::whoami(config, refresh).await,
        Commands::Profile {
            username,
            first_name,
            last_name,
            bio,
        } => commands::auth::profile(config, username, first_name, last_name, bio).await,
        Commands::Passwd => commands::auth::passwd(config).await,
        Commands::DeleteAccount { yes } => commands::auth::delete_account(config, yes).await,
        Commands::Browse { category, page } => commands::browse::feed(config, category, page).await,
        Commands::Search { query, page } => commands::browse::search(config, &query, page).await,
        Commands::Collection { kind, page } => commands::browse::collection(config, kind, page).await,
        Commands::Show { id } => commands::browse::show(config, id).await,
        Commands::Favorite { id } => commands::annotate::favorite(config, id).await,
        Commands::Watchlist { id } => commands::annotate::watchlist(config, id).await,
        Commands::Watched { id } => commands::annotate::watched(config, id).await,
        Commands::Rate { id, rating } => commands::annotate::rate(config, id, &rating).await,
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vibepilot::{Config, Vibe, VibeSorter};

#[derive(Parser)]
#[command(name = "vibepilot")]
#[command(about = "Sort your Spotify liked songs into vibe playlists")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort your liked songs into vibe playlists
    Sort {
        /// Custom prompt steering the model-based classification
        #[arg(long)]
        prompt: Option<String>,

        /// Preview the run without creating playlists or adding tracks
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of liked songs to fetch
        #[arg(long, default_value_t = 1000)]
        limit: usize,
    },

    /// List the vibe categories and their classification rules
    ListVibes,

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Sort {
            prompt,
            dry_run,
            limit,
        } => {
            sort(prompt, dry_run, limit).await?;
        }
        Commands::ListVibes => {
            list_vibes();
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

async fn sort(prompt: Option<String>, dry_run: bool, limit: usize) -> Result<()> {
    println!("{}", "VibePilot".cyan().bold());
    println!("{}", "=".repeat(50));

    if dry_run {
        println!(
            "{}",
            "DRY RUN MODE - No playlists will be touched".yellow()
        );
    }

    let config = Config::from_env().context("Failed to load configuration")?;

    let missing = config.get_missing_config();
    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        println!(
            "\n{}",
            "Please copy .env.example to .env and fill in your credentials.".yellow()
        );
        std::process::exit(1);
    }

    if prompt.is_some() && !config.has_openai_config() {
        println!(
            "{}",
            "OPENAI_API_KEY not set - the prompt will be ignored and the rule table used.".yellow()
        );
    }

    let sorter = VibeSorter::new(&config, prompt)
        .await
        .context("Failed to initialize sorter")?;

    sorter.sort_library(dry_run, limit).await?;

    if !dry_run {
        println!("\n{}", "Run completed!".green());
    } else {
        println!("\n{}", "Dry run completed - no changes made".yellow());
    }

    Ok(())
}

fn list_vibes() {
    println!("{}", "Vibe Categories".cyan().bold());
    println!("{}", "=".repeat(50));

    for (i, vibe) in Vibe::ALL.iter().enumerate() {
        println!("{:2}. {}", i + 1, vibe.name().green());
        println!("     {}", vibe.rule_summary().cyan());
    }
}

fn show_setup_guide() {
    println!("{}", "VibePilot Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Spotify API Setup".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/");
    println!("   - Create a new app");
    println!("   - Copy your Client ID and Client Secret");
    println!("   - Add 'http://127.0.0.1:8080/callback' as a redirect URI");

    println!("\n{}", "2. OpenAI API Setup (optional)".yellow());
    println!("   - Go to https://platform.openai.com/api-keys");
    println!("   - Create an API key");
    println!("   - Without it, classification uses the built-in rule table");

    println!("\n{}", "3. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     SPOTIFY_CLIENT_ID=your_spotify_client_id");
    println!("     SPOTIFY_CLIENT_SECRET=your_spotify_client_secret");
    println!("     SPOTIFY_REDIRECT_URI=http://127.0.0.1:8080/callback");
    println!("     OPENAI_API_KEY=your_openai_api_key");

    println!("\n{}", "4. Usage".yellow());
    println!("   - vibepilot list-vibes                      (to see the categories)");
    println!("   - vibepilot sort --dry-run                  (to preview a run)");
    println!("   - vibepilot sort                            (to sort your liked songs)");
    println!("   - vibepilot sort --prompt \"beach summer\"    (to steer the model)");

    println!("\n{}", "Ready to sort your library!".green());
}

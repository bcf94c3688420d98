use clap::{Parser, Subcommand};
use image_descriptions::Result;
use image_descriptions::commands::{
    DescribeOptions, describe_image, save_description, search_descriptions, show_status,
};
use image_descriptions::config::{Config, run_interactive_config, show_config};
use image_descriptions::describe::DescriptionMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "image-descriptions")]
#[command(about = "Describe images and store the descriptions as embeddings in Qdrant")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.image-descriptions)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure OpenAI and Qdrant settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Describe an image and save the description
    Describe {
        /// PNG or JPEG file to describe
        image: PathBuf,
        /// How the first draft is written; asked for when omitted
        #[arg(long, value_enum)]
        mode: Option<DescriptionMode>,
        /// Final description text, skipping the edit prompt
        #[arg(long)]
        text: Option<String>,
        /// Save without asking for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Save a description given on the command line
    Save {
        /// Description text
        text: String,
    },
    /// Find stored descriptions similar to a query
    Search {
        /// Text to search for
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Show configuration and service status
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::default_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Describe {
            image,
            mode,
            text,
            yes,
        } => {
            let options = DescribeOptions {
                mode,
                text,
                assume_yes: yes,
            };
            describe_image(&config_dir, &image, &options)?;
        }
        Commands::Save { text } => {
            save_description(&config_dir, &text)?;
        }
        Commands::Search { query, limit } => {
            search_descriptions(&config_dir, &query, limit)?;
        }
        Commands::Status => {
            show_status(&config_dir)?;
        }
    }

    Ok(())
}

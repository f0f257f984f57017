//! CLI entry point for mdsite

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mdsite")]
#[command(author = "Tom Larminier")]
#[command(version = "0.1.0")]
#[command(about = "A Markdown-backed personal site with diagram and chart embedding", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the JSON API server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to the configured address)
        #[arg(short, long)]
        ip: Option<String>,

        /// Disable file watching
        #[arg(long)]
        no_watch: bool,
    },

    /// List site information
    List {
        /// Type of content to list (post, tag, category, humor)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Show a rendered post
    Show {
        /// Slug of the post
        slug: String,

        /// Print only the HTML body
        #[arg(long)]
        html: bool,
    },

    /// Search posts
    Search {
        /// Case-insensitive search text
        query: String,
    },

    /// Render a single Markdown file to HTML
    Render {
        /// File to render
        file: PathBuf,
    },

    /// Convert an HTML file to Markdown or a GraphML file to node-link JSON
    Convert {
        /// File to convert
        file: PathBuf,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "mdsite=debug,info"
    } else {
        "mdsite=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Serve { port, ip, no_watch } => {
            let site = mdsite::Site::new(&base_dir)?;
            let ip = ip.unwrap_or_else(|| site.config.server.ip.clone());
            let port = port.unwrap_or(site.config.server.port);
            let watch = site.config.server.watch && !no_watch;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            mdsite::server::start(&site, &ip, port, watch).await?;
        }

        Commands::List { r#type } => {
            let site = mdsite::Site::new(&base_dir)?;
            mdsite::commands::list::run(&site, &r#type).await?;
        }

        Commands::Show { slug, html } => {
            let site = mdsite::Site::new(&base_dir)?;
            mdsite::commands::show::run(&site, &slug, html).await?;
        }

        Commands::Search { query } => {
            let site = mdsite::Site::new(&base_dir)?;
            mdsite::commands::search::run(&site, &query).await?;
        }

        Commands::Render { file } => {
            let site = mdsite::Site::new(&base_dir)?;
            let file = if file.is_absolute() {
                file
            } else {
                base_dir.join(file)
            };
            mdsite::commands::render::run(&site, &file).await?;
        }

        Commands::Convert { file } => {
            let file = if file.is_absolute() {
                file
            } else {
                base_dir.join(file)
            };
            mdsite::commands::convert::run(&file)?;
        }

        Commands::Version => {
            println!("mdsite version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

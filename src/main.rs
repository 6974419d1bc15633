use anyhow::Result;
use clap::{Parser, Subcommand};
use storefront_i18n::config::Config;
use storefront_i18n::{Language, TranslationCoordinator};
use tracing::info;

/// Storefront UI translation cache
#[derive(Debug, Parser)]
#[command(name = "storefront-i18n")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List supported languages, marking the active one
    Languages,
    /// Switch the active language and remember it
    SetLanguage {
        /// Language code (e.g. hi, mr)
        code: String,
    },
    /// Print cached translations without contacting the service
    Lookup {
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Translate texts, fetching any that are not cached yet
    Translate {
        /// Language to use for this run instead of the saved preference
        #[arg(short, long)]
        lang: Option<String>,
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Show cache statistics for the active language
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storefront_i18n=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let coordinator = TranslationCoordinator::new(&config)?;

    match cli.command {
        Commands::Languages => {
            let active = coordinator.language();
            for lang in coordinator.languages() {
                let marker = if lang.code == active.code() { "*" } else { " " };
                println!("{} {:<3} {} ({})", marker, lang.code, lang.native_name, lang.name);
            }
        }
        Commands::SetLanguage { code } => {
            let language = Language::from_code(&code)?;
            coordinator.set_language(language);
            println!("Active language: {} ({})", language.name(), language.code());
        }
        Commands::Lookup { texts } => {
            for text in &texts {
                println!("{}", coordinator.translate_sync(text));
            }
        }
        Commands::Translate { lang, texts } => {
            let previous = coordinator.language();
            if let Some(code) = lang {
                coordinator.set_language(Language::from_code(&code)?);
            }

            info!(
                "Translating {} text(s) to {}",
                texts.len(),
                coordinator.language()
            );
            for translated in coordinator.translate_many(&texts).await {
                println!("{}", translated);
            }

            // --lang is a one-off; keep the saved preference
            if coordinator.language() != previous {
                coordinator.set_language(previous);
            }
        }
        Commands::Stats => {
            println!(
                "{}: {} cached translation(s)",
                coordinator.language(),
                coordinator.cached_count()
            );
        }
    }

    coordinator.shutdown().await;
    Ok(())
}

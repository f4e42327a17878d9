use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use lm_client::format::format_relative_time;
use lm_client::{HttpApi, Session, SettingsStore, SettingsUpdate};
use lm_core::{ArticleRequest, ArticlesPage};
use lm_inference::{create_model, ArticleGenerator};
use lm_storage::{create_storage, StorageConfig};
use lm_web::{AppState, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn code samples into articles and browse the feed", long_about = None)]
pub struct Cli {
    /// Article storage backend: memory, supabase or sqlite
    #[arg(long, global = true)]
    storage: Option<String>,
    /// SQLite database file for the sqlite backend
    #[arg(long, global = true)]
    sqlite_path: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value = "gemini",
        help = "Model backend used for generation. Available: gemini (default), dummy"
    )]
    model: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Bind address, overrides HTTP_ADDR and RUNNING_PORT
        #[arg(long)]
        addr: Option<String>,
    },
    /// Generate one article from a code sample
    Generate {
        /// The code sample, unless --file is given
        code: Option<String>,
        #[arg(long, conflicts_with = "code")]
        file: Option<PathBuf>,
        /// Extra direction for the article
        #[arg(long)]
        guide: Option<String>,
        /// Post to a running server instead of calling the model directly
        #[arg(long)]
        server: Option<String>,
    },
    /// List a page of the feed from a running server
    Feed {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,
        #[arg(long, default_value_t = lm_core::storage::DEFAULT_PAGE_SIZE)]
        limit: usize,
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Show or change the stored Gemini settings
    Settings {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        gemini_model: Option<String>,
    },
}

fn storage_config(cli: &Cli) -> StorageConfig {
    let mut config = StorageConfig::from_env();
    if let Some(kind) = &cli.storage {
        config.kind = kind.trim().to_lowercase();
    }
    if let Some(path) = &cli.sqlite_path {
        config.sqlite_path = path.clone();
    }
    config
}

async fn build_state(cli: &Cli) -> Result<AppState> {
    let storage = create_storage(&storage_config(cli)).await?;

    let config = lm_inference::Config::from_env();
    info!(
        GEMINI_API_KEY = if config.api_key.is_some() { "SET" } else { "MISSING" },
        GEMINI_MODEL = %config.model_name,
        "🔧 Environment check"
    );
    let model = create_model(&cli.model, &config)?;
    info!("🧠 Inference model initialized (using {})", model.name());

    Ok(AppState::new(
        ArticleGenerator::new(model, config.retry_policy()),
        storage,
    ))
}

fn read_code(code: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (code, file) {
        (Some(code), _) => Ok(code),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        (None, None) => bail!("Provide a code sample or --file"),
    }
}

fn print_page(page: &ArticlesPage) {
    let now = Utc::now();
    if page.articles.is_empty() {
        println!("No articles yet. Use `lm generate` to turn your code into a story.");
    }
    for article in &page.articles {
        let minutes = article
            .reading_time_minutes
            .map(|m| format!(" · {} min read", m))
            .unwrap_or_default();
        println!(
            "{}  {} · {}{}",
            article.id,
            article.title,
            format_relative_time(&article.created_at, now),
            minutes
        );
        println!("    {}", article.excerpt);
    }
    if let Some(cursor) = &page.next_cursor {
        println!("More: --cursor {}", cursor);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { addr } => {
            let server = match addr {
                Some(addr) => ServerConfig::resolve(addr, None)?,
                None => ServerConfig::from_env()?,
            };
            let state = build_state(&cli).await?;
            lm_web::serve(state, server.addr).await?;
        }
        Commands::Generate {
            code,
            file,
            guide,
            server,
        } => {
            let code = read_code(code.clone(), file.clone())?;
            let guidance = guide.clone().unwrap_or_default();

            let article = match server {
                Some(server) => {
                    let api = Arc::new(HttpApi::new(server)?);
                    let empty = ArticlesPage {
                        articles: Vec::new(),
                        has_more: false,
                        next_cursor: None,
                    };
                    let session = Session::new(api, empty, Default::default())
                        .with_settings_store(SettingsStore::from_env());
                    let result = session
                        .direct_generate(&code, &guidance, "Command line request")
                        .await;
                    session.shutdown();
                    result?
                }
                None => {
                    let state = build_state(&cli).await?;
                    let settings = SettingsStore::from_env().load();
                    let request = ArticleRequest {
                        code,
                        guidance: Some(guidance).filter(|g| !g.is_empty()),
                        api_key: settings.api_key_override(),
                        model: settings.model_override(),
                    };
                    let generated = state.generator.generate(&request).await?;
                    state.storage.persist_article(&generated.into_article()).await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&article)?);
        }
        Commands::Feed {
            server,
            limit,
            cursor,
        } => {
            let api = HttpApi::new(server)?;
            let page = lm_client::ArticlesApi::fetch_page(&api, cursor.as_deref(), *limit).await?;
            print_page(&page);
        }
        Commands::Settings {
            api_key,
            gemini_model,
        } => {
            let store = SettingsStore::from_env();
            let settings = if api_key.is_some() || gemini_model.is_some() {
                store.update(SettingsUpdate {
                    api_key: api_key.clone(),
                    model: gemini_model.clone(),
                })?
            } else {
                store.load()
            };
            println!("Settings file: {}", store.path().display());
            println!(
                "apiKey: {}",
                if settings.api_key.is_empty() { "MISSING" } else { "SET" }
            );
            println!("model: {}", settings.model);
        }
    }

    Ok(())
}

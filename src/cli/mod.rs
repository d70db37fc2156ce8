//! Command-line interface for cidshare.
//!
//! Provides commands for generating and resolving gateway URLs, creating and
//! opening share links, and managing the local library.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapters::GatewayClient;
use crate::config::{self, ResolvedConfig};
use crate::domain::{LibraryData, MediaCategory, MediaItem, ShareLink};
use crate::library::{LibraryStore, Reconciler};
use crate::resolver::{ContentResolver, Resolution};
use crate::share::{encode, encoded_value_of, share_url, ShareDecoder, SharePage};

/// cidshare - content-addressed media resolution and sharing
#[derive(Parser, Debug)]
#[command(name = "cidshare")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the candidate gateway URLs for an identifier
    Candidates {
        /// Content identifier (or full URL)
        id: String,

        /// A direct URL already known for this content
        #[arg(long)]
        direct_url: Option<String>,
    },

    /// Try candidate URLs in order until one loads
    Resolve {
        /// Content identifier (or full URL)
        id: String,

        /// A direct URL already known for this content
        #[arg(long)]
        direct_url: Option<String>,

        /// Stream the resolved content into this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create, open and check share links
    Share {
        #[command(subcommand)]
        command: ShareCommands,
    },

    /// Manage the local library
    Library {
        #[command(subcommand)]
        command: LibraryCommands,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Subcommand, Debug)]
pub enum ShareCommands {
    /// Encode identifiers into a share URL
    Encode {
        /// Video identifiers
        #[arg(long = "video")]
        videos: Vec<String>,

        /// Audio identifiers
        #[arg(long = "audio")]
        audios: Vec<String>,

        /// Picture identifiers
        #[arg(long = "picture")]
        pictures: Vec<String>,

        /// Other file identifiers
        #[arg(long = "file")]
        files: Vec<String>,

        /// Title recorded with the link
        #[arg(long)]
        title: Option<String>,

        /// Description recorded with the link
        #[arg(long)]
        description: Option<String>,

        /// Save the link to "my shares"
        #[arg(long)]
        save: bool,
    },

    /// Fetch every identifier of a share and list what loaded
    Decode {
        /// Share URL or bare encoded value
        input: String,

        /// Add the decoded items to the library
        #[arg(long)]
        import: bool,
    },

    /// Open a share page URL (decodes, or lists links shared with me)
    Open {
        /// Share page URL
        url: String,
    },

    /// Check whether a share URL is already in the library
    Check {
        /// Share URL
        url: String,
    },

    /// Save a share URL received from someone else
    Receive {
        /// Share URL
        url: String,

        /// Title recorded with the link
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum LibraryCommands {
    /// List library entries
    List {
        /// Only one category
        #[arg(short, long, value_enum)]
        category: Option<ListCategory>,
    },

    /// Add a content identifier to the library
    Add {
        /// Content identifier
        id: String,

        /// MIME type (guessed from --file-name if not given)
        #[arg(long)]
        mime: Option<String>,

        /// Title (defaults to the file name)
        #[arg(long)]
        title: Option<String>,

        /// Original file name
        #[arg(long)]
        file_name: Option<String>,
    },

    /// Remove one entry by its library id
    Remove {
        /// Library id
        item_id: u64,
    },

    /// Remove every entry
    Clear,
}

/// Listing filter for `library list`
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListCategory {
    Video,
    Audio,
    Picture,
    File,
    /// Share links
    Links,
}

impl ListCategory {
    fn media(self) -> Option<MediaCategory> {
        match self {
            ListCategory::Video => Some(MediaCategory::Video),
            ListCategory::Audio => Some(MediaCategory::Audio),
            ListCategory::Picture => Some(MediaCategory::Picture),
            ListCategory::File => Some(MediaCategory::File),
            ListCategory::Links => None,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;

        match self.command {
            Commands::Candidates { id, direct_url } => {
                show_candidates(cfg, &id, direct_url.as_deref())
            }
            Commands::Resolve {
                id,
                direct_url,
                output,
            } => resolve_id(cfg, &id, direct_url.as_deref(), output).await,
            Commands::Share { command } => execute_share(cfg, command).await,
            Commands::Library { command } => execute_library(cfg, command).await,
            Commands::Config => show_config(cfg),
        }
    }
}

/// Shared services built from configuration
struct App {
    cfg: &'static ResolvedConfig,
    client: Arc<GatewayClient>,
    store: Arc<LibraryStore>,
}

impl App {
    fn new(cfg: &'static ResolvedConfig) -> Result<Self> {
        let store = LibraryStore::open(cfg.storage.backend, &cfg.storage.path).with_context(|| {
            format!(
                "Failed to open {} library at {}",
                cfg.storage.backend,
                cfg.storage.path.display()
            )
        })?;

        Ok(Self {
            cfg,
            client: Arc::new(GatewayClient::new(cfg.resolver.candidate_timeout())),
            store: Arc::new(store),
        })
    }

    fn resolver(&self) -> ContentResolver {
        ContentResolver::new(self.client.clone(), self.cfg.gateway.clone())
            .with_candidate_timeout(self.cfg.resolver.candidate_timeout())
            .with_cache(self.cfg.resolver.source_cache())
    }

    fn decoder(&self) -> ShareDecoder {
        ShareDecoder::new(self.client.clone(), self.cfg.gateway.clone())
            .with_concurrency(self.cfg.share.decode_concurrency)
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.store.clone())
    }
}

/// Token cancelled on Ctrl-C
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted");
            child.cancel();
        }
    });
    token
}

fn show_candidates(cfg: &ResolvedConfig, id: &str, direct_url: Option<&str>) -> Result<()> {
    let candidates = crate::gateway::generate_candidates(&cfg.gateway, id, direct_url);

    if candidates.is_empty() {
        anyhow::bail!("No candidate URLs for {} (unknown identifier scheme)", id);
    }

    for (i, url) in candidates.iter().enumerate() {
        println!("{:>2}  {}", i, url);
    }
    Ok(())
}

async fn resolve_id(
    cfg: &'static ResolvedConfig,
    id: &str,
    direct_url: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    let app = App::new(cfg)?;
    let resolver = app.resolver();
    let candidates = resolver.candidates(id, direct_url);

    let token = ctrl_c_token();
    let result = resolver
        .run_session(&candidates, &token, || {
            eprintln!("All source URLs failed to play");
        })
        .await;

    match result {
        Resolution::Playing(source) => {
            println!("{}", source.url);
            eprintln!(
                "Resolved with candidate {} of {} ({})",
                source.index + 1,
                candidates.len(),
                source.content_type.as_deref().unwrap_or("unknown type")
            );

            if let Some(path) = output {
                let written = download(&app, &source.url, &path, &token).await?;
                eprintln!("Wrote {} bytes to {}", written, path.display());
            }
            Ok(())
        }
        Resolution::Exhausted { attempts } => {
            anyhow::bail!("No source loaded for {} after {} attempts", id, attempts)
        }
        Resolution::Cancelled { .. } => anyhow::bail!("Resolution cancelled"),
    }
}

/// Stream a resolved source into a file
async fn download(app: &App, url: &str, path: &Path, token: &CancellationToken) -> Result<u64> {
    let mut stream = Box::pin(app.client.open_stream(url).await?);
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut written = 0u64;

    loop {
        let chunk = tokio::select! {
            _ = token.cancelled() => anyhow::bail!("Download cancelled"),
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else { break };
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

// ============================================================================
// share
// ============================================================================

async fn execute_share(cfg: &'static ResolvedConfig, command: ShareCommands) -> Result<()> {
    match command {
        ShareCommands::Encode {
            videos,
            audios,
            pictures,
            files,
            title,
            description,
            save,
        } => {
            let mut selection = LibraryData::new();
            for (category, ids) in [
                (MediaCategory::Video, videos),
                (MediaCategory::Audio, audios),
                (MediaCategory::Picture, pictures),
                (MediaCategory::File, files),
            ] {
                selection
                    .items_mut(category)
                    .extend(ids.into_iter().map(|id| MediaItem::new(id, "")));
            }

            if selection.is_media_empty() {
                anyhow::bail!("Nothing selected: pass at least one --video, --audio, --picture or --file");
            }

            let value = encode(&selection);
            println!("{}", share_url(&cfg.share.origin, &value));

            if save {
                let app = App::new(cfg)?;
                let title = title.unwrap_or_else(|| format!("{} shared items", selection.media_len()));
                let mut link = ShareLink::new_owned(&cfg.share.origin, &value, title);
                if let Some(description) = description {
                    link = link.with_description(description);
                }
                let id = app.store.add_share_link(link).await;
                eprintln!("Saved to my shares (id {})", id);
            }
            Ok(())
        }
        ShareCommands::Decode { input, import } => {
            let value = encoded_value_of(&input).unwrap_or(input);
            decode_and_show(&App::new(cfg)?, &value, import).await
        }
        ShareCommands::Open { url } => {
            let app = App::new(cfg)?;
            match SharePage::from_url(&url) {
                SharePage::Decode(value) => {
                    let membership = app.reconciler().membership(&url).await;
                    eprintln!("Share status: {}", membership);
                    decode_and_show(&app, &value, false).await
                }
                SharePage::SharedWithMe => {
                    print_links("Shared with me", &app.store.share_links(Some(false)).await);
                    Ok(())
                }
            }
        }
        ShareCommands::Check { url } => {
            let app = App::new(cfg)?;
            let membership = app.reconciler().membership(&url).await;
            println!("{}", membership);
            Ok(())
        }
        ShareCommands::Receive { url, title } => {
            if encoded_value_of(&url).is_none() {
                anyhow::bail!("Not a share URL: {}", url);
            }

            let app = App::new(cfg)?;
            if app.reconciler().is_received_share_already_saved(&url).await {
                println!("Already saved");
                return Ok(());
            }

            let title = title.unwrap_or_else(|| "Shared with me".to_string());
            let id = app.store.add_received_link(&url, title).await;
            println!("Saved (id {})", id);
            Ok(())
        }
    }
}

async fn decode_and_show(app: &App, value: &str, import: bool) -> Result<()> {
    let token = ctrl_c_token();
    let decoded = app.decoder().decode_detailed(value, &token).await?;

    print_media(&decoded.data);
    for skipped in &decoded.skipped {
        eprintln!("skipped {}: {}", skipped.id, skipped.reason);
    }

    if import {
        let ids = app.store.import(decoded.data).await;
        eprintln!("Imported {} items", ids.len());
    }
    Ok(())
}

// ============================================================================
// library
// ============================================================================

async fn execute_library(cfg: &'static ResolvedConfig, command: LibraryCommands) -> Result<()> {
    let app = App::new(cfg)?;

    match command {
        LibraryCommands::List { category: Some(ListCategory::Links) } => {
            print_links("Share links", &app.store.share_links(None).await);
            Ok(())
        }
        LibraryCommands::List { category: Some(category) } => {
            if let Some(media) = category.media() {
                let mut data = LibraryData::new();
                *data.items_mut(media) = app.store.list(media).await;
                print_media(&data);
            }
            Ok(())
        }
        LibraryCommands::List { category: None } => {
            let data = app.store.get().await;
            if data.is_empty() {
                println!("Library is empty. Use 'cidshare library add <id>' to add content.");
                return Ok(());
            }
            print_media(&data);
            println!();
            print_links("Share links", &data.sharelinks);
            Ok(())
        }
        LibraryCommands::Add {
            id,
            mime,
            title,
            file_name,
        } => {
            let mime = mime
                .or_else(|| {
                    file_name
                        .as_deref()
                        .and_then(|name| mime_guess::from_path(name).first_raw())
                        .map(str::to_string)
                })
                .unwrap_or_default();
            let title = title.or(file_name).unwrap_or_else(|| id.clone());

            let item = MediaItem::new(id.as_str(), mime)
                .with_title(title)
                .with_content_uri(
                    crate::gateway::preferred_url(&cfg.gateway, &id).unwrap_or_default(),
                );
            let category = item.category();
            let item_id = app.store.add_auto_classified(item).await;
            println!("Added {} as {} (id {})", id, category, item_id);
            Ok(())
        }
        LibraryCommands::Remove { item_id } => {
            if !app.store.remove(item_id).await {
                anyhow::bail!("No library entry with id {}", item_id);
            }
            println!("Removed {}", item_id);
            Ok(())
        }
        LibraryCommands::Clear => {
            app.store.clear_all().await;
            println!("Library cleared");
            Ok(())
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max - 3).collect::<String>())
    } else {
        s.to_string()
    }
}

fn print_media(data: &LibraryData) {
    println!("{:<12} {:<8} {:<20} {:<40}", "ID", "CATEGORY", "TYPE", "CONTENT / TITLE");
    println!("{}", "-".repeat(84));

    for category in MediaCategory::ALL {
        for item in data.items(category) {
            println!(
                "{:<12} {:<8} {:<20} {:<40}",
                item.id,
                category.to_string(),
                truncate(&item.mime_type, 20),
                truncate(item.content_id().as_str(), 40)
            );
            if !item.title.is_empty() {
                println!("{:<42} {}", "", truncate(&item.title, 40));
            }
        }
    }

    println!("\nTotal: {} items", data.media_len());
}

fn print_links(heading: &str, links: &[ShareLink]) {
    println!("{}:", heading);
    if links.is_empty() {
        println!("  (none)");
        return;
    }

    for link in links {
        let owner = if link.is_owned() { "mine" } else { "received" };
        println!("  {:<12} {:<9} {}", link.id, owner, truncate(&link.title, 50));
        println!("  {:<12} {}", "", link.url);
    }
}

/// Show the resolved configuration (for debugging)
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("{}", serde_yaml::to_string(cfg).context("Failed to render configuration")?);

    Ok(())
}

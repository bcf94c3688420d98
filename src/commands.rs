use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::credentials::{environment_lookup, read_dotenv};
use crate::config::{Config, CredentialKind, PendingCredentials, prompt_missing_credentials};
use crate::database::{PointId, QdrantClient, VectorIndex};
use crate::describe::{DescriptionMode, Describer};
use crate::embeddings::{ChatModel, OpenAiClient};
use crate::ingest::DescriptionStore;
use crate::session::Session;
use crate::upload::UploadedImage;

const DOTENV_FILE: &str = ".env";

/// How `describe` should behave where it would otherwise ask
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeOptions {
    /// Skips the mode prompt
    pub mode: Option<DescriptionMode>,
    /// Final description text, replacing the edit prompt
    pub text: Option<String>,
    /// Saves without asking for confirmation
    pub assume_yes: bool,
}

/// Clients built once per run and shared by every operation
pub struct Services {
    pub config: Config,
    pub index: QdrantClient,
    pub openai: OpenAiClient,
}

impl Services {
    /// Loads the configuration, resolves credentials (environment, `.env`,
    /// config file, then a prompt) and builds the clients.
    #[inline]
    pub fn connect(config_dir: &Path) -> Result<Self> {
        let config = Config::load(config_dir).context("Failed to load configuration")?;
        let pending = gather_credentials(&config);
        let credentials = prompt_missing_credentials(pending)?;

        let openai = OpenAiClient::new(&config.openai, &credentials)
            .context("Failed to create OpenAI client")?;
        let index = QdrantClient::new(&credentials).context("Failed to create Qdrant client")?;

        Ok(Self {
            config,
            index,
            openai,
        })
    }

    #[inline]
    pub fn store(&self) -> DescriptionStore<'_> {
        DescriptionStore::new(&self.index, &self.openai, self.config.qdrant.collection.clone())
    }
}

fn gather_credentials(config: &Config) -> PendingCredentials {
    let dotenv = read_dotenv(Path::new(DOTENV_FILE));
    PendingCredentials::gather(config, environment_lookup(dotenv))
}

fn spinner(message: &str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Loads an image, drafts a description, lets the user edit it and saves it
#[inline]
pub fn describe_image(config_dir: &Path, image_path: &Path, options: &DescribeOptions) -> Result<()> {
    let image = UploadedImage::from_path(image_path)
        .with_context(|| format!("Failed to load {}", image_path.display()))?;
    eprintln!("🖼️  {}", style(image.preview_line()).cyan());

    let services = Services::connect(config_dir)?;
    let store = services.store();

    let bar = spinner("Checking collection...");
    let ready = store.ensure_collection();
    bar.finish_and_clear();
    ready?;

    match describe_with(&store, &services.openai, image, options)? {
        Some(id) => {
            eprintln!("{}", style("✓ Description saved").green());
            println!("{}", id);
        }
        None => eprintln!("Description not saved."),
    }

    Ok(())
}

/// Runs one describe session against already constructed services.
/// Returns `None` when the user declines to save.
#[inline]
pub fn describe_with(
    store: &DescriptionStore<'_>,
    chat: &dyn ChatModel,
    image: UploadedImage,
    options: &DescribeOptions,
) -> Result<Option<PointId>> {
    let mode = match options.mode {
        Some(mode) => mode,
        None => choose_mode()?,
    };
    let describer = Describer::for_mode(mode, chat);

    let mut session = Session::new();
    session.load_image(image);

    let bar = spinner("Generating description...");
    let generated = session.generate(&describer).map(str::to_string);
    bar.finish_and_clear();
    let draft = generated.context("Failed to generate description")?;

    let text = match &options.text {
        Some(text) => text.clone(),
        None => edit_description(&draft)?,
    };
    session.edit(text)?;

    if !session.can_save() {
        bail!("Description is empty, nothing to save");
    }

    if !options.assume_yes && !confirm_save()? {
        info!("Save declined");
        return Ok(None);
    }

    let bar = spinner("Saving description...");
    let saved = session.save(store);
    bar.finish_and_clear();

    Ok(Some(saved?))
}

fn choose_mode() -> Result<DescriptionMode> {
    if !console::user_attended_stderr() {
        bail!("No terminal to ask for a description mode, pass --mode model or --mode manual");
    }

    let choice = Select::new()
        .with_prompt("How should the description be written?")
        .items(&DescriptionMode::ALL)
        .default(0)
        .interact()?;

    DescriptionMode::ALL
        .get(choice)
        .copied()
        .context("Selected mode is out of range")
}

fn edit_description(draft: &str) -> Result<String> {
    if !console::user_attended_stderr() {
        warn!("No terminal to edit the description, keeping the draft");
        return Ok(draft.to_string());
    }

    eprintln!("{}", style("Draft:").bold().yellow());
    eprintln!("{}", draft);
    eprintln!();

    Ok(Input::<String>::new()
        .with_prompt("Description")
        .with_initial_text(draft)
        .interact_text()?)
}

fn confirm_save() -> Result<bool> {
    if !console::user_attended_stderr() {
        bail!("No terminal to confirm the save, pass --yes to save without asking");
    }

    Ok(Confirm::new()
        .with_prompt("Save description?")
        .default(true)
        .interact()?)
}

/// Stores a description typed on the command line
#[inline]
pub fn save_description(config_dir: &Path, text: &str) -> Result<()> {
    let services = Services::connect(config_dir)?;
    let store = services.store();

    let bar = spinner("Saving description...");
    let saved = store.save(text);
    bar.finish_and_clear();
    let id = saved?;

    eprintln!("{}", style("✓ Description saved").green());
    println!("{}", id);
    Ok(())
}

/// Prints the stored descriptions closest to `query`
#[inline]
pub fn search_descriptions(config_dir: &Path, query: &str, limit: usize) -> Result<()> {
    let services = Services::connect(config_dir)?;
    let store = services.store();

    if !services
        .index
        .collection_exists(store.collection())
        .context("Failed to check collection")?
    {
        eprintln!(
            "Collection {} does not exist yet, save a description first.",
            style(store.collection()).cyan()
        );
        return Ok(());
    }

    let bar = spinner("Searching...");
    let results = store.search(query, limit);
    bar.finish_and_clear();
    let hits = results?;

    if hits.is_empty() {
        eprintln!("No descriptions found.");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!("{}. [{:.3}] {}", rank + 1, hit.score, hit.text);
        println!("   {}", style(hit.id).dim());
    }

    Ok(())
}

/// Reports configuration, credential sources and service reachability
#[inline]
pub fn show_status(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).unwrap_or_else(|e| {
        warn!("Using default configuration: {:#}", e);
        Config {
            base_dir: config_dir.to_path_buf(),
            ..Config::default()
        }
    });

    println!("📊 Image Descriptions Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🔑 Credentials:");
    let pending = gather_credentials(&config);
    for kind in CredentialKind::ALL {
        if pending.get(kind).is_some() {
            println!("   ✅ {}: Found", kind.label());
        } else {
            println!("   ❌ {}: Missing (set {})", kind.label(), kind.env_var());
        }
    }

    let credentials = match pending.complete() {
        Ok(credentials) => credentials,
        Err(e) => {
            println!();
            println!("   ⚠️  {}", e);
            return Ok(());
        }
    };

    println!();
    println!("🤖 OpenAI Status:");
    match OpenAiClient::new(&config.openai, &credentials) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!("   ✅ OpenAI: Connected ({})", config.openai.base_url);
                println!("   📋 Chat Model: {}", config.openai.chat_model);
                println!(
                    "   🔢 Embedding Model: {} ({} dimensions)",
                    config.openai.embedding_model, config.openai.embedding_dimension
                );
            }
            Err(e) => println!("   ⚠️  OpenAI: Unreachable - {}", e),
        },
        Err(e) => println!("   ❌ OpenAI: Failed to create client - {}", e),
    }

    println!();
    println!("🔍 Qdrant Status:");
    let index = match QdrantClient::new(&credentials) {
        Ok(index) => index,
        Err(e) => {
            println!("   ❌ Qdrant: Failed to create client - {}", e);
            return Ok(());
        }
    };

    if let Err(e) = index.health_check() {
        println!("   ⚠️  Qdrant: Unreachable - {}", e);
        return Ok(());
    }
    println!("   ✅ Qdrant: Connected ({})", credentials.qdrant_url);

    let collection = &config.qdrant.collection;
    match index.collection_exists(collection) {
        Ok(true) => match index.count(collection, true) {
            Ok(count) => println!("   📚 Collection {}: {} descriptions", collection, count),
            Err(e) => println!("   ⚠️  Collection {}: Failed to count - {}", collection, e),
        },
        Ok(false) => println!("   💤 Collection {}: Not created yet", collection),
        Err(e) => println!("   ⚠️  Collection {}: Failed to check - {}", collection, e),
    }

    Ok(())
}

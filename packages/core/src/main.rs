// Vault Uploader - publish INI config sections as secrets in HashiCorp Vault
//
// This is the main entry point for the application.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vault_uploader::config::{NoPrompt, PartialSettings, Prompter, SettingsFile, TerminalPrompter};
use vault_uploader::ini::{ConfigDocument, ParseOptions};
use vault_uploader::publisher::SecretPublisher;
use vault_uploader::store::VaultClient;
use vault_uploader::UploadError;

/// Upload the sections of an INI config file into Vault
#[derive(Parser, Debug)]
#[command(name = "vault-uploader")]
#[command(version)]
#[command(about = "Upload the sections of an INI config file into HashiCorp Vault")]
#[command(long_about = None)]
struct Cli {
    /// INI file to load into Vault
    filename: PathBuf,

    /// The Vault server address
    #[arg(long, alias = "vault_server", env = "VAULT_ADDR")]
    vault_server: Option<String>,

    /// The application namespace in Vault
    #[arg(long, alias = "vault_namespace", env = "VAULT_UPLOADER_NAMESPACE")]
    vault_namespace: Option<String>,

    /// The application environment (pilot, prod, etc..)
    #[arg(long, alias = "vault_env", env = "VAULT_UPLOADER_ENV")]
    vault_env: Option<String>,

    /// Your Vault server token
    #[arg(long, alias = "vault_token", env = "VAULT_TOKEN", hide_env_values = true)]
    vault_token: Option<String>,

    /// YAML settings file (default: ~/.config/vault-uploader/config.yaml if present)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Skip TLS certificate verification (unsafe outside local testing)
    #[arg(long, default_value = "false")]
    insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Dry run - show what would be written without contacting Vault
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Never prompt for missing values
    #[arg(long, default_value = "false")]
    no_prompt: bool,

    /// Log each write to stderr
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "vault_uploader=info" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_upload(cli: Cli) -> Result<()> {
    println!("📦 Vault Uploader");
    println!("Loading config file: {}\n", cli.filename.display());

    // Step 1: Parse the INI file, keeping key case
    let document = ConfigDocument::load(&cli.filename, ParseOptions::case_sensitive())
        .with_context(|| format!("Failed to load config file: {}", cli.filename.display()))?;

    println!("✓ Parsed {} section(s)", document.len());

    // Step 2: Resolve settings from flags, settings file and prompts
    let partial = PartialSettings {
        server: cli.vault_server,
        namespace: cli.vault_namespace,
        environment: cli.vault_env,
        token: cli.vault_token,
        insecure: cli.insecure,
        timeout_secs: cli.timeout,
    };

    let partial = match SettingsFile::discover(cli.settings.as_deref())
        .context("Failed to load settings file")?
    {
        Some(file) => partial.with_file(file),
        None => partial,
    };

    let prompter: Box<dyn Prompter> = if cli.no_prompt {
        Box::new(NoPrompt)
    } else {
        Box::new(TerminalPrompter::default())
    };

    let settings = partial
        .resolve(prompter.as_ref())
        .context("Failed to resolve upload settings")?;

    if settings.insecure {
        println!("⚠️  TLS certificate verification is disabled");
    }

    // Step 3: Build the Vault client
    let client = VaultClient::new(settings.vault_client_config())
        .context("Failed to create Vault client")?;
    let publisher = SecretPublisher::new(client, &settings.namespace, &settings.environment);

    if document.is_empty() {
        println!("⚠️  No sections to publish");
        return Ok(());
    }

    // List paths and key names (NOT values - security!)
    println!("\n🔐 Sections to publish:");
    for planned in publisher.plan(&document) {
        println!("   - {} ({} key(s))", planned.path, planned.keys.len());
    }

    if cli.dry_run {
        println!("\n🏃 Dry run mode - no changes will be made");
        for planned in publisher.plan(&document) {
            println!("   {}: {}", planned.path, planned.keys.join(", "));
        }
        return Ok(());
    }

    // Step 4: Publish each section, in file order
    println!("\n🚀 Publishing to {}...\n", settings.server);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let report = runtime
        .block_on(publisher.publish_with(&document, |path| println!("   ✓ {}", path)))
        .context("Failed to publish secrets to Vault")?;

    println!("\n✅ Published {} section(s) successfully!", report.written.len());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run_upload(cli) {
        eprintln!("\nError: {:#}", e);

        let nothing_sent = e
            .downcast_ref::<UploadError>()
            .map(UploadError::is_local)
            .unwrap_or(true);
        if !nothing_sent {
            eprintln!("\n⚠️  Sections listed above with ✓ were already written to Vault.");
            eprintln!("💡 Re-running is safe: each write replaces the secret at its path.");
        }
        std::process::exit(1);
    }
}

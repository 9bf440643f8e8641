use std::io;
use std::process;

use clap::Parser;
use tracing::{error, info};

use rehost::core::{run, RehostError};
use rehost::env::{extract, generate_env_docs, images, storage, EnvConfig, EnvVar};
use rehost::network::Session;

/// Extract a page region, rehost its images and print the cleaned result.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Pages to process (URLs or local paths); falls back to REHOST_PAGES
    targets: Vec<String>,
    /// id of the element to extract
    #[clap(short = 'i', long)]
    region_id: Option<String>,
    /// Output form: markup or snippet
    #[clap(short, long)]
    output: Option<String>,
    /// Class substring marking snippet elements
    #[clap(long)]
    marker: Option<String>,
    /// Selector of the snippet container
    #[clap(long)]
    container: Option<String>,
    /// Local directory receiving images
    #[clap(short = 'd', long, conflicts_with_all = ["bucket", "endpoint"])]
    output_dir: Option<String>,
    /// Remote bucket receiving images
    #[clap(short, long)]
    bucket: Option<String>,
    /// Region of the remote bucket
    #[clap(long)]
    region: Option<String>,
    /// S3-compatible server holding the bucket
    #[clap(long)]
    endpoint: Option<String>,
    /// Prefix of storage keys
    #[clap(short, long)]
    key_prefix: Option<String>,
    /// Base prepended to identifiers in rewritten references
    #[clap(short, long)]
    asset_base: Option<String>,
    /// Digest naming rehosted images: sha1 or sha256
    #[clap(long)]
    digest: Option<String>,
    /// Where references go: attribute or text
    #[clap(long)]
    rewrite: Option<String>,
    /// Request timeout in seconds, 0 waits forever
    #[clap(short, long)]
    timeout: Option<u64>,
    /// User-Agent header
    #[clap(short, long)]
    user_agent: Option<String>,
    /// Only log errors
    #[clap(short, long)]
    silent: bool,
    /// Print the environment variables understood and exit
    #[clap(long)]
    env_docs: bool,
}

fn main() {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if cli.env_docs {
        print!("{}", generate_env_docs());
        return;
    }

    let config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let level = if cli.silent {
        tracing::Level::ERROR
    } else {
        config.log_level
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .init();

    if let Err(e) = execute(cli, config) {
        error!("{e}");
        process::exit(1);
    }
}

fn execute(cli: Cli, mut config: EnvConfig) -> Result<(), RehostError> {
    apply_overrides(&cli, &mut config)?;
    config.validate()?;

    let targets = if cli.targets.is_empty() {
        config.pages.clone()
    } else {
        cli.targets
    };
    if targets.is_empty() {
        return Err(RehostError::Config("no pages to process".to_string()));
    }

    let options = config.to_options();
    let session = Session::new(&options)?;
    let sink = config.sink()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let reports = run(&session, sink.as_ref(), &options, &targets, &mut out)?;

    let failed: usize = reports.iter().map(|r| r.failed_images().count()).sum();
    let total: usize = reports.iter().map(|r| r.images.len()).sum();
    info!(pages = reports.len(), images = total, failed, "done");

    Ok(())
}

fn apply_overrides(cli: &Cli, config: &mut EnvConfig) -> Result<(), RehostError> {
    if let Some(region_id) = &cli.region_id {
        config.region_id = extract::RegionId::parse(region_id)?;
    }
    if let Some(output) = &cli.output {
        config.output = extract::Output::parse(output)?;
    }
    if let Some(marker) = &cli.marker {
        config.snippet_marker = extract::SnippetMarker::parse(marker)?;
    }
    if let Some(container) = &cli.container {
        config.snippet_container = Some(extract::SnippetContainer::parse(container)?);
    }
    if let Some(dir) = &cli.output_dir {
        config.select_output_dir(storage::OutputDir::parse(dir)?);
    }
    let endpoint = cli
        .endpoint
        .as_deref()
        .map(storage::BucketEndpoint::parse)
        .transpose()?;
    match (&cli.bucket, endpoint) {
        (Some(bucket), endpoint) => config.select_bucket(storage::Bucket::parse(bucket)?, endpoint),
        (None, Some(endpoint)) => {
            config.bucket_endpoint = Some(endpoint);
            config.output_dir = None;
        }
        (None, None) => {}
    }
    if let Some(region) = &cli.region {
        config.region = storage::Region::parse(region)?;
    }
    if let Some(prefix) = &cli.key_prefix {
        config.key_prefix = images::KeyPrefix::parse(prefix)?;
    }
    if let Some(base) = &cli.asset_base {
        config.asset_base_url = Some(images::AssetBaseUrl::parse(base)?);
    }
    if let Some(digest) = &cli.digest {
        config.digest = images::Digest::parse(digest)?;
    }
    if let Some(rewrite) = &cli.rewrite {
        config.rewrite = images::Rewrite::parse(rewrite)?;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout = timeout;
    }
    if let Some(user_agent) = &cli.user_agent {
        config.user_agent = Some(user_agent.clone());
    }

    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use deeptime_common::{AppConfig, DateRange, Granularity, QueryRequest};
use deeptime_retrieval::{catalog, LinkResolver, RegistryHandle, Retriever, SourceRegistry};
use wayback_client::{CdxQuery, MatchType, WaybackClient};

#[derive(Parser)]
#[command(name = "deeptime", about = "Date-bounded search across historical-data APIs")]
struct Cli {
    /// TOML catalog replacing the built-in provider list
    #[arg(long, env = "DEEPTIME_SOURCES", global = true)]
    sources: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered providers, optionally only those covering a range
    Sources {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Show which providers a query would call, without calling them
    Plan(QueryArgs),
    /// Run a query and print records plus per-provider status as JSON
    Search(QueryArgs),
    /// Archive fallback for a URL
    Resolve {
        url: String,
        /// Approximate publication date; picks the capture at or before it
        #[arg(long)]
        date: Option<NaiveDate>,
        /// The live URL failed to load; use the most recent capture
        #[arg(long, conflicts_with = "date")]
        dead: bool,
    },
    /// List Wayback captures for a domain
    Captures {
        domain: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, default_value_t = 25)]
        limit: i64,
        /// Match the exact URL instead of the whole domain
        #[arg(long)]
        exact: bool,
    },
}

#[derive(Args)]
struct QueryArgs {
    text: String,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Minimum granularity: metadata_only, snippet or full_text
    #[arg(long)]
    granularity: Option<Granularity>,
}

impl QueryArgs {
    fn to_request(&self) -> QueryRequest {
        QueryRequest {
            text: self.text.clone(),
            date_from: self.from,
            date_to: self.to,
            granularity_preference: self.granularity,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("deeptime=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sources { from, to } => {
            let registry = load_registry(cli.sources.as_ref())?;
            let range = DateRange::new(from, to);
            for d in registry.list_covering_range(&range) {
                println!(
                    "{:<22} {:<14} {:<13} risk={:<6} auth={:<5} {}",
                    d.id,
                    d.coverage.to_string(),
                    d.granularity.to_string(),
                    d.link_rot_risk.to_string(),
                    d.requires_auth,
                    d.label
                );
            }
        }
        Command::Plan(args) => {
            let registry = load_registry(cli.sources.as_ref())?;
            let plan = deeptime_retrieval::plan(&registry, &args.to_request())?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Search(args) => {
            let config = AppConfig::from_env()?;
            let registry = Arc::new(RegistryHandle::new(catalog::default_registry()?));
            if let Some(path) = cli.sources.as_ref().or(config.sources_path.as_ref()) {
                registry.reload_from(path)?;
            }
            let retriever = Retriever::from_config(&config, registry);

            let outcome = retriever.search(&args.to_request()).await?;
            info!(
                query_id = %outcome.query_id,
                records = outcome.records.len(),
                degraded = outcome.is_degraded(),
                "Search finished"
            );
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Resolve { url, date, dead } => {
            let resolver = LinkResolver::wayback();
            let link = if dead {
                resolver.resolve_on_demand(&url).await
            } else {
                resolver.resolve(&url, date).await
            };
            println!("{}", serde_json::to_string_pretty(&link)?);
        }
        Command::Captures {
            domain,
            from,
            to,
            limit,
            exact,
        } => {
            let stamp = |d: NaiveDate| d.format("%Y%m%d").to_string();
            let query = CdxQuery::new(domain.trim().to_lowercase())
                .range(from.map(stamp), to.map(stamp))
                .match_type(if exact { MatchType::Exact } else { MatchType::Domain })
                .limit(limit);

            let captures = WaybackClient::new()
                .captures(&query)
                .await
                .with_context(|| format!("CDX query for {domain} failed"))?;
            info!(domain = domain.as_str(), count = captures.len(), "Captures fetched");
            for capture in &captures {
                println!(
                    "{} {} {}",
                    capture.timestamp,
                    capture.statuscode,
                    wayback_client::snapshot_url(&capture.original, &capture.timestamp)
                );
            }
        }
    }

    Ok(())
}

fn load_registry(path: Option<&PathBuf>) -> Result<SourceRegistry> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading source catalog");
            catalog::load_catalog(path)
        }
        None => Ok(catalog::default_registry()?),
    }
}

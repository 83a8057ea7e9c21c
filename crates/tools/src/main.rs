use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use foundation::parse_timestamp;
use reqwest::Client;
use tools::{
    ViewChanges, fetch_records, now, parse_categories, read_records, run_view, submit,
};
use tracing_subscriber::EnvFilter;
use viewstate::config::DEFAULT_NODES_URL;
use viewstate::{FetchedRecords, MapConfig, NodeSubmission, decode, encode};

#[derive(Parser, Debug)]
#[command(author, version, about = "Mesh node map, headless")]
struct Args {
    /// Nodes endpoint
    #[arg(long, env = "MESHMAP_API_URL", default_value = DEFAULT_NODES_URL)]
    api_url: String,

    /// Read the node list from a JSON file instead of the endpoint
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the dataset and show what the map would display
    View {
        /// URL query of a shared link, e.g. "nodes=1,2&cluster=14"
        #[arg(long, default_value = "")]
        query: String,

        /// Node types to show: codes or names, comma separated
        #[arg(long, value_parser = parse_categories)]
        types: Option<dataset::CategorySet>,

        /// Hide nodes not active after this date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        since: Option<String>,

        /// Zoom at which clustering is disabled
        #[arg(long)]
        cluster: Option<u8>,
    },
    /// Node counts per type and recent additions
    Stats,
    /// Find nodes by name or public key prefix
    Search {
        query: String,

        #[arg(long, default_value_t = dataset::search::DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
    /// Submit a node by its meshcore:// link
    AddNode { link: String },
    /// Decode a URL query and print its normalized form
    Url { query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = MapConfig::default().with_nodes_url(args.api_url.clone());
    let client = Client::new();

    match args.command {
        Command::View {
            ref query,
            types,
            ref since,
            cluster,
        } => {
            let since = match since {
                Some(raw) => Some(
                    parse_timestamp(raw).with_context(|| format!("invalid --since date `{raw}`"))?,
                ),
                None => None,
            };
            let records = load(&args, &client, &config).await?;
            let changes = ViewChanges {
                categories: types,
                since,
                cluster_zoom: cluster,
            };
            let (_, summary) = run_view(config, records, query, changes)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{summary}");
            }
        }
        Command::Stats => {
            let records = load(&args, &client, &config).await?;
            let (controller, _) = run_view(config, records, "", ViewChanges::default())?;
            let stats = controller.stats(now());
            if args.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("total        {}", stats.total);
                println!("clients      {}", stats.clients);
                println!("repeaters    {}", stats.repeaters);
                println!("room servers {}", stats.room_servers);
                println!("sensors      {}", stats.sensors);
                if stats.unknown > 0 {
                    println!("unknown      {}", stats.unknown);
                }
                println!(
                    "new          {} (24h) / {} (7d) / {} (30d)",
                    stats.added_24h, stats.added_7d, stats.added_30d
                );
            }
        }
        Command::Search { ref query, limit } => {
            let records = load(&args, &client, &config).await?;
            let (controller, _) = run_view(config, records, "", ViewChanges::default())?;
            let hits: Vec<tools::VisibleNode> = dataset::search::search(
                controller.store().all(),
                query,
                limit,
            )
            .into_iter()
            .map(tools::VisibleNode::from)
            .collect();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("no matches");
            } else {
                for n in hits {
                    println!("{:<28} {:<10} {}  {}", n.name, n.category, n.coords, n.public_key);
                }
            }
        }
        Command::AddNode { ref link } => {
            let submission = NodeSubmission::from_link(link)?;
            let message = submit(&client, &config.nodes_url, &submission)
                .await
                .context("node submission failed")?;
            println!("{message}");
        }
        Command::Url { ref query } => {
            let decoded = decode(query);
            if decoded.is_empty() && !query.trim_start_matches('?').is_empty() {
                bail!("nothing usable in `{query}`");
            }
            println!("{decoded:#?}");
            println!("?{}", encode(&decoded));
        }
    }

    Ok(())
}

async fn load(args: &Args, client: &Client, config: &MapConfig) -> Result<FetchedRecords> {
    match &args.file {
        Some(path) => read_records(path)
            .await
            .with_context(|| format!("loading {}", path.display())),
        None => fetch_records(client, &config.nodes_url)
            .await
            .with_context(|| format!("fetching {}", config.nodes_url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn endpoint_defaults_to_public_api_and_can_be_overridden() {
        let args = Args::try_parse_from(["meshmap", "stats"]).unwrap();
        if std::env::var_os("MESHMAP_API_URL").is_none() {
            assert_eq!(args.api_url, DEFAULT_NODES_URL);
        }
        let args =
            Args::try_parse_from(["meshmap", "--api-url", "http://localhost:8080/nodes", "stats"])
                .unwrap();
        assert_eq!(args.api_url, "http://localhost:8080/nodes");
    }
}

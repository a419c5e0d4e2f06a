// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `flock`: ad-hoc queries against a Flock graph store.
//!
//! Connection settings are read from the `endpoint` config blob and then
//! overridden by command-line flags. Results are printed as JSON, one value
//! per line.

// The CLI is expected to print to stdout/stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flock_client::{FlockClient, FlockEndpoint, PageKind, Paged, SelectionQuery};
use flock_config::{EndpointConfig, EndpointSettings};
use flock_config_fs::FsConfigStore;
use flock_proto::{Cursor, Direction, GraphId, NodeId};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flock", author, version, about = "Query a Flock graph store")]
struct Cli {
    /// Service host (overrides the stored endpoint config)
    #[arg(long, global = true)]
    host: Option<String>,
    /// Service port (overrides the stored endpoint config)
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Connect/read/write timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// Directory holding endpoint.json (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print whether the edge SOURCE -> DEST exists
    Contains {
        source: NodeId,
        graph: GraphId,
        dest: NodeId,
    },
    /// Print the edge SOURCE -> DEST
    Get {
        source: NodeId,
        graph: GraphId,
        dest: NodeId,
    },
    /// Print node metadata
    Metadata {
        source: NodeId,
        graph: GraphId,
        /// Only print whether metadata exists
        #[arg(long)]
        exists: bool,
    },
    /// Print node ids adjacent to SOURCE, one page per line
    Select(SelectArgs),
    /// Print edges of SOURCE, one page per line
    Edges(SelectArgs),
    /// Print the number of edges of SOURCE
    Count {
        source: NodeId,
        graph: GraphId,
        /// Count incoming instead of outgoing edges
        #[arg(long)]
        incoming: bool,
    },
}

#[derive(Args, Debug)]
struct SelectArgs {
    source: NodeId,
    graph: GraphId,
    /// Follow incoming instead of outgoing edges
    #[arg(long)]
    incoming: bool,
    /// Restrict to these destination ids (repeatable)
    #[arg(long = "dest")]
    destinations: Vec<NodeId>,
    /// Results per page
    #[arg(long)]
    page_size: Option<i32>,
    /// Cursor to start from
    #[arg(long)]
    cursor: Option<Cursor>,
    /// Keep fetching until the last page
    #[arg(long)]
    all: bool,
}

impl SelectArgs {
    fn direction(&self) -> Direction {
        direction(self.incoming)
    }
}

fn direction(incoming: bool) -> Direction {
    if incoming {
        Direction::Backward
    } else {
        Direction::Forward
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = endpoint_config(&cli)?;
    debug!(host = %config.host, port = config.port, "resolved endpoint config");
    let client = FlockClient::connect(&config)
        .with_context(|| format!("connect to {}:{}", config.host, config.port))?;

    run(&client, cli.command)
}

fn endpoint_config(cli: &Cli) -> Result<EndpointConfig> {
    let store = match &cli.config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("open config store")?;
    let mut config = EndpointSettings::new(store)
        .load()
        .context("load endpoint config")?;

    if let Some(host) = &cli.host {
        config.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    config.validate().context("endpoint config")?;
    Ok(config)
}

fn run<E: FlockEndpoint>(client: &FlockClient<E>, command: Command) -> Result<()> {
    match command {
        Command::Contains {
            source,
            graph,
            dest,
        } => {
            println!("{}", client.contains(source, graph, dest)?);
        }
        Command::Get {
            source,
            graph,
            dest,
        } => {
            println!("{}", serde_json::to_string(&client.get(source, graph, dest)?)?);
        }
        Command::Metadata {
            source,
            graph,
            exists,
        } => {
            if exists {
                println!("{}", client.contains_metadata(source, graph)?);
            } else {
                let metadata = client.get_metadata(source, graph)?;
                println!("{}", serde_json::to_string(&metadata)?);
            }
        }
        Command::Select(args) => {
            let query = SelectionQuery::simple(
                args.source,
                args.graph,
                args.direction(),
                &args.destinations,
            );
            let mut batch = client.select(&query);
            if let Some(size) = args.page_size {
                batch = batch.with_page_size(size);
            }
            if let Some(cursor) = args.cursor {
                batch = batch.with_page_start_cursor(cursor);
            }
            for first in batch.execute()? {
                print_pages(first, args.all, |page| json!(page.ids()))?;
            }
        }
        Command::Edges(args) => {
            let mut batch = client.select_edges(
                args.source,
                args.graph,
                args.direction(),
                &args.destinations,
            );
            if let Some(size) = args.page_size {
                batch = batch.with_page_size(size);
            }
            if let Some(cursor) = args.cursor {
                batch = batch.with_page_start_cursor(cursor);
            }
            for first in batch.execute()? {
                print_pages(first, args.all, |page| json!(page.edges()))?;
            }
        }
        Command::Count {
            source,
            graph,
            incoming,
        } => {
            let query = SelectionQuery::simple(source, graph, direction(incoming), &[]);
            for count in client.count(&query).execute()? {
                println!("{count}");
            }
        }
    }
    Ok(())
}

fn print_pages<E, K>(
    first: Paged<'_, E, K>,
    all: bool,
    items: impl Fn(&Paged<'_, E, K>) -> serde_json::Value,
) -> Result<()>
where
    E: FlockEndpoint,
    K: PageKind,
{
    let print = |page: &Paged<'_, E, K>| {
        println!(
            "{}",
            json!({
                "items": items(page),
                "next_cursor": page.next_cursor(),
                "prev_cursor": page.prev_cursor(),
            })
        );
    };
    if all {
        for page in first.pages() {
            print(&page.context("fetch next page")?);
        }
    } else {
        print(&first);
    }
    Ok(())
}

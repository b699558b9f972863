// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>
//!
//! `rqlite`: command line client for rqlite clusters.
//!
//! Runs queries and writes against any reachable node of a cluster and shows
//! node status. Set `RUST_LOG=rqlite_client=debug` to watch retries and
//! redirects.

mod formatter;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use rqlite_client::client::{NodesOptions, RqliteClient};
use rqlite_client::config::{ClientConfig, Consistency, RequestOptions};

use formatter::{format_execute, format_fields, format_nodes, format_query, OutputFormat};

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

/// rqlite: query and administer an rqlite cluster.
#[derive(Parser, Debug)]
#[command(name = "rqlite", version, about = "Command line client for rqlite clusters")]
struct Cli {
    /// Cluster node address. Repeat for every known node.
    #[arg(long = "host", value_name = "HOST:PORT", default_value = "localhost:4001")]
    hosts: Vec<String>,

    /// Read consistency level: none, weak or strong.
    #[arg(long)]
    consistency: Option<Consistency>,

    /// Always start from the first host instead of rotating.
    #[arg(long)]
    no_round_robin: bool,

    /// Extra request header. Repeatable.
    #[arg(long = "header", value_name = "NAME:VALUE")]
    headers: Vec<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Output format: table or json.
    #[arg(long, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run read statements.
    Query {
        #[arg(required = true, value_name = "SQL")]
        statements: Vec<String>,
    },
    /// Run write statements.
    Execute {
        /// Wrap the statements in a single transaction.
        #[arg(long)]
        transaction: bool,
        #[arg(required = true, value_name = "SQL")]
        statements: Vec<String>,
    },
    /// Show the status of the serving node.
    Status,
    /// List cluster members and their reachability.
    Nodes {
        /// Include read-only nodes.
        #[arg(long)]
        nonvoters: bool,
    },
}

impl Cli {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::default()
            .with_round_robin(!self.no_round_robin)
            .with_timeout(Duration::from_millis(self.timeout_ms));
        if let Some(consistency) = self.consistency {
            config = config.with_consistency(consistency);
        }
        for header in &self.headers {
            let (name, value) = header
                .split_once(':')
                .with_context(|| format!("header {header:?} must be NAME:VALUE"))?;
            config = config.with_header(name.trim(), value.trim())?;
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.client_config()?;
    tracing::debug!(hosts = ?cli.hosts, round_robin = config.round_robin, "opening client");
    let client = RqliteClient::open(cli.hosts.iter().cloned(), config)
        .context("failed to open client")?;

    run(&client, cli.command, cli.format).await
}

/// Run one subcommand. Statement-level failures are printed and turn into a
/// non-zero exit code; anything else is returned as an error.
async fn run(client: &RqliteClient, command: Command, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let mut failed = false;

    match command {
        Command::Query { statements } => {
            let results = client.query(&statements, RequestOptions::new()).await?;
            for (sql, result) in statements.iter().zip(&results) {
                match result.error() {
                    Some(err) => failed |= report(sql, err),
                    None => println!("{}", format_query(result, format)),
                }
            }
        }
        Command::Execute {
            statements,
            transaction,
        } => {
            let mut options = RequestOptions::new();
            if transaction {
                options = options.transaction(true);
            }
            let results = client.execute(&statements, options).await?;
            for (sql, result) in statements.iter().zip(&results) {
                match result.error() {
                    Some(err) => failed |= report(sql, err),
                    None => println!("{}", format_execute(result, format)),
                }
            }
        }
        Command::Status => {
            let status = client.status().await?;
            println!("{}", format_fields(&status, format));
        }
        Command::Nodes { nonvoters } => {
            let nodes = client.nodes(NodesOptions { nonvoters }).await?;
            println!("{}", format_nodes(&nodes, format));
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn report(sql: &str, err: &str) -> bool {
    eprintln!("{} {sql}: {err}", "error:".red().bold());
    true
}

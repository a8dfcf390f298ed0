//! `deepfind` command-line front end
//!
//! Runs one search over a directory tree and prints the ranked results.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use deepfind::{
    FileItem, FsIndexBackend, SearchConfig, SearchCoordinator, SearchFilters, SerialDispatcher,
    SortColumn,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Relevance,
    Date,
}

impl From<SortArg> for SortColumn {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Relevance => SortColumn::Relevance,
            SortArg::Date => SortColumn::Date,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "deepfind", version, about = "Rank files by how many keywords they contain")]
struct Cli {
    /// Keywords to search for
    #[arg(required = true)]
    query: Vec<String>,

    /// Directory to search
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Only match files with this extension (repeatable)
    #[arg(short = 'e', long = "ext")]
    extensions: Vec<String>,

    /// Only match files carrying this tag (repeatable)
    #[arg(short = 't', long = "tag")]
    tags: Vec<String>,

    #[arg(long, value_enum, default_value_t = SortArg::Relevance)]
    sort: SortArg,

    #[arg(long)]
    ascending: bool,

    /// Stop after printing this many rows
    #[arg(long)]
    limit: Option<usize>,

    /// Print one JSON object per row
    #[arg(long)]
    json: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, env = "DEEPFIND_CONFIG")]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<SearchConfig> {
    match path {
        Some(path) => SearchConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => match SearchConfig::default_path() {
            Some(path) => SearchConfig::load_or_default(&path)
                .with_context(|| format!("Failed to load config from {}", path.display())),
            None => Ok(SearchConfig::default()),
        },
    }
}

fn print_row(item: &FileItem, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(item)?);
    } else {
        println!("{:>4}%  {}  {}", item.relevance, item.updated, item.path);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    if !cli.root.is_dir() {
        anyhow::bail!("Search root {} is not a directory", cli.root.display());
    }

    let backend = FsIndexBackend::new(cli.root.clone());
    let dispatcher = SerialDispatcher::spawn();
    let coordinator = SearchCoordinator::new(Arc::new(backend), Arc::new(dispatcher), config);

    let filters = SearchFilters::new()
        .with_extensions(&cli.extensions)
        .with_tags(&cli.tags);
    let query = cli.query.join(" ");
    let quiet = cli.json;

    let (done_tx, done_rx) = oneshot::channel();
    coordinator.search(
        &query,
        filters,
        0,
        move |rows, _replace, percentage| {
            if !quiet {
                eprintln!(
                    "... {:>3.0}% of keywords done, {} rows on first page",
                    percentage * 100.0,
                    rows.len()
                );
            }
        },
        move || {
            let _ = done_tx.send(());
        },
    );

    tokio::select! {
        _ = done_rx => {}
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted, cancelling search");
            coordinator.cancel();
        }
    }

    let limit = cli.limit.unwrap_or(usize::MAX);
    let column = SortColumn::from(cli.sort);
    let mut printed = 0;
    let mut index = 0;
    while printed < limit {
        let (rows, next) = coordinator.next_page(index, 0, column, cli.ascending);
        if next == index {
            break;
        }
        for item in rows.iter().take(limit - printed) {
            print_row(item, cli.json)?;
            printed += 1;
        }
        index = next;
    }

    if !cli.json {
        let extensions = coordinator.sorted_extensions_by_count();
        if !extensions.is_empty() {
            let top: Vec<&str> = extensions.iter().take(10).map(String::as_str).collect();
            println!("\n{printed} files; top extensions: {}", top.join(", "));
        }
    }

    Ok(())
}

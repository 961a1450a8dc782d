use channel_catalog::config::{CatalogConfig, CliOverrides};
use channel_catalog::query::{Order, SortSpec};
use channel_catalog::{Catalog, FilterSpec, logger};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "catalog", version, about = "Video and channel catalog maintenance", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML)")]
    config: Option<PathBuf>,
    #[arg(long, help = "Store snapshot file. Takes precedence over config/env.")]
    store: Option<PathBuf>,
    #[arg(long, help = "Default page size. Takes precedence over config/env.")]
    limit: Option<u64>,
    #[arg(long, help = "Log level: error|warn|info|debug|trace. Logs to the default directory when none is configured.")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Count all videos")]
    Count,
    #[command(about = "List videos matching a filter")]
    List {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, help = "Page size; defaults to the configured limit")]
        per_page: Option<u64>,
        #[arg(long, help = "Filter as JSON, e.g. '{\"visible\": true, \"keywords_in_title\": \"rust\"}'")]
        filter: Option<String>,
        #[arg(long, help = "Sort keys, e.g. 'published_at:desc,title:asc'")]
        sort: Option<String>,
        #[arg(long, help = "Return every match instead of one page")]
        all: bool,
    },
    #[command(about = "Show one video")]
    Get { id: String },
    #[command(about = "Record a video as applied and refresh its channel everywhere")]
    Propagate { video_id: String },
    #[command(about = "Show or hide a video")]
    Visibility {
        id: String,
        #[arg(action = clap::ArgAction::Set)]
        visible: bool,
    },
    #[command(about = "Load newline-delimited JSON into a collection")]
    Import {
        #[arg(long, help = "Target collection; defaults to the video collection")]
        collection: Option<String>,
        file: PathBuf,
    },
    #[command(name = "admin-channels", about = "List admin channels")]
    AdminChannels {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long)]
        per_page: Option<u64>,
    },
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn parse_sort(spec: &str) -> Result<Vec<SortSpec>, String> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|part| {
            let (field, dir) = part.split_once(':').unwrap_or((part, "asc"));
            let order = match dir.trim().to_ascii_lowercase().as_str() {
                "asc" | "1" => Order::Asc,
                "desc" | "-1" => Order::Desc,
                other => return Err(format!("unknown sort direction {other:?} for {field}")),
            };
            Ok(SortSpec { field: field.trim().to_string(), order })
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(cfg: &CatalogConfig) {
    let res = match (&cfg.log.config, cfg.log.effective_dir()) {
        (Some(yaml), _) => logger::init_file(yaml),
        (None, Some(dir)) => logger::configure_logging(Some(dir.as_path()), cfg.log.level.as_deref(), cfg.log.retention),
        (None, None) => Ok(()),
    };
    if let Err(e) = res {
        eprintln!("warning: logging disabled: {e}");
    }
}

fn run(cli: Cli, cfg: &CatalogConfig) -> CmdResult {
    let catalog = Catalog::open(cfg)?;
    let videos = catalog.videos();
    match cli.command {
        Commands::Count => println!("{}", videos.count()?),
        Commands::List { page, per_page, filter, sort, all } => {
            let filters: FilterSpec = match filter {
                Some(json) => serde_json::from_str(&json)?,
                None => FilterSpec::default(),
            };
            let sort = sort.as_deref().map(parse_sort).transpose()?;
            if all {
                print_json(&videos.list_all(&filters, sort)?)?;
            } else {
                let limit = per_page.unwrap_or(catalog.default_limit());
                print_json(&videos.list_paged(page, limit, &filters, sort)?)?;
            }
        }
        Commands::Get { id } => print_json(&videos.get_by_id(id)?)?,
        Commands::Propagate { video_id } => {
            let video = videos.get_by_id(video_id)?;
            let channel = videos.propagate_channel_application(&video)?;
            catalog.flush()?;
            print_json(&channel)?;
        }
        Commands::Visibility { id, visible } => {
            let report = videos.set_visibility(id, visible)?;
            catalog.flush()?;
            print_json(&report)?;
        }
        Commands::Import { collection, file } => {
            let target = collection.unwrap_or_else(|| cfg.collections.videos.clone());
            let reader = std::fs::File::open(&file)?;
            let n = catalog.store().import_ndjson(&target, reader)?;
            catalog.flush()?;
            println!("imported {n} documents into {target}");
        }
        Commands::AdminChannels { page, per_page } => {
            let limit = per_page.unwrap_or(catalog.default_limit());
            print_json(&catalog.admin_channels().list_paged(page, limit)?)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let mut cfg = match CatalogConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    let overrides = CliOverrides { store_path: cli.store.clone(), default_limit: cli.limit, log_level: cli.log_level.clone() };
    if let Err(e) = cfg.apply_cli(&overrides) {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
    init_logging(&cfg);
    if let Err(e) = run(cli, &cfg) {
        log::error!("command failed: {e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

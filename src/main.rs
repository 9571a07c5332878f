use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vrshot::container::{self, ReadOptions, DEFAULT_KEYWORD};
use vrshot::metadata::decode_file;
use vrshot::scanner::list_chunks;
use vrshot::search::{search_directory, MetadataCache, SearchOptions, SearchQuery};

/// Upper bound for `--window`: 1 GiB.
const MAX_WINDOW_KIB: i64 = 1024 * 1024;

#[derive(Parser)]
#[command(name = "vrshot", about = "Read and embed VR screenshot metadata in PNG files")]
struct Cli {
    /// Bytes read from the start of each file, in KiB
    #[arg(long, global = true, default_value = "128",
          value_parser = clap::value_parser!(u32).range(1..=MAX_WINDOW_KIB))]
    window: u32,
    /// iTXt keyword holding the description
    #[arg(long, global = true, default_value = DEFAULT_KEYWORD)]
    keyword: String,
    /// Log per-file decisions (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode the metadata embedded in a screenshot
    Read {
        input: PathBuf,
        /// Print the raw description text instead of the decoded record
        #[arg(long)]
        raw: bool,
    },
    /// Embed a description; refused if the file already has one
    Write {
        input: PathBuf,
        text:  String,
    },
    /// Print the image size from IHDR
    Resolution {
        input: PathBuf,
    },
    /// List the chunks visible in the read window
    Chunks {
        input: PathBuf,
    },
    /// Find screenshots under a directory
    Search {
        root:  PathBuf,
        /// Field to match against
        #[arg(long, value_enum, default_value = "any")]
        by:    QueryField,
        query: String,
        /// Stop at the first unreadable or malformed file
        #[arg(long)]
        fail_fast: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum QueryField {
    AuthorId,
    Author,
    WorldId,
    World,
    PlayerId,
    Player,
    Any,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let opts = ReadOptions {
        window_size: cli.window as usize * 1024,
        keyword:     cli.keyword,
    };

    match cli.command {

        // ── Read ─────────────────────────────────────────────────────────────
        Commands::Read { input, raw } => {
            if raw {
                match container::read_description(&input, &opts)? {
                    Some(text) => println!("{text}"),
                    None => println!("{}: no description", input.display()),
                }
            } else {
                match decode_file(&input, &opts)? {
                    Some(meta) => println!("{}", meta.to_json()?),
                    None => println!("{}: no description", input.display()),
                }
            }
        }

        // ── Write ────────────────────────────────────────────────────────────
        Commands::Write { input, text } => {
            if container::write_description(&input, &text, &opts)? {
                println!("Wrote description to {}", input.display());
            } else {
                println!("Skipped {}: not a PNG, no IHDR, or already described", input.display());
            }
        }

        // ── Resolution ───────────────────────────────────────────────────────
        Commands::Resolution { input } => {
            println!("{}", container::read_resolution(&input, &opts)?);
        }

        // ── Chunks ───────────────────────────────────────────────────────────
        Commands::Chunks { input } => {
            let buf = container::read_png_window(&input, &opts)?;
            println!("{:>10} {:>10}  {:<4}  CRC", "Offset", "Length", "Type");
            for c in list_chunks(&buf) {
                println!("{:>10} {:>10}  {:<4}  {}",
                    c.location.offset, c.location.length, c.chunk_type,
                    hex::encode(c.stored_crc.to_be_bytes()));
            }
        }

        // ── Search ───────────────────────────────────────────────────────────
        Commands::Search { root, by, query, fail_fast } => {
            let query = build_query(by, query);
            let mut cache = MetadataCache::new();
            let search_opts = SearchOptions { read: opts, fail_fast };
            let report = search_directory(&root, &query, &mut cache, &search_opts)?;
            for meta in &report.matches {
                let path = meta.source_file.as_deref().map(|p| p.display().to_string()).unwrap_or_default();
                let world = meta.world.as_ref().map(|w| w.name.as_str()).unwrap_or("-");
                let author = meta.author.as_ref().map(|a| a.display_name.as_str()).unwrap_or("-");
                println!("{path}  [{}] {world} by {author}", meta.application);
            }
            println!("{}", report.summary());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_query(by: QueryField, text: String) -> SearchQuery {
    match by {
        QueryField::AuthorId => SearchQuery::AuthorId(text),
        QueryField::Author   => SearchQuery::AuthorName(text),
        QueryField::WorldId  => SearchQuery::WorldId(text),
        QueryField::World    => SearchQuery::WorldName(text),
        QueryField::PlayerId => SearchQuery::PlayerId(text),
        QueryField::Player   => SearchQuery::PlayerName(text),
        QueryField::Any      => SearchQuery::Any(text),
    }
}

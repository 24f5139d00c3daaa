//! Inspects one or more ZIM archives: header fields, UUID, checksum, and
//! (optionally) catalog-wide language/category aggregates.

use std::process::ExitCode;

use clap::Parser;
use zim_engine::catalog::Catalog;
use zim_engine::config::EngineConfig;
use zim_engine::entry::EntryInfo;

#[derive(Parser)]
#[command(name = "zim-info", version, about = "Inspect ZIM archives")]
struct Args {
    /// ZIM files to inspect
    #[arg(required = true)]
    files: Vec<String>,

    /// Print the catalog-wide union of categories across all given files
    #[arg(long)]
    categories: bool,

    /// Print the catalog-wide set of languages across all given files
    #[arg(long)]
    languages: bool,
}

fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let catalog = Catalog::new(EngineConfig::default());

    let mut failed = false;
    for file in &args.files {
        if let Err(e) = catalog.load(file) {
            eprintln!("{file}: {e}");
            failed = true;
            continue;
        }
    }

    for loaded in catalog.list() {
        let archive = &loaded.archive;
        let header = archive.header();
        println!("== {} ==", loaded.name);
        println!("  Path: {}", loaded.path.display());
        println!("  UUID: {}", archive.uuid());
        println!("  Version: {}.{}", header.major_version, header.minor_version);
        println!("  Entry count: {}", header.entry_count);
        println!("  Cluster count: {}", header.cluster_count);
        println!("  MIME types: {}", archive.mime_types().len());
        match archive.checksum() {
            Ok(sum) => println!("  Checksum: {sum}"),
            Err(e) => println!("  Checksum: unavailable ({e})"),
        }
        match archive.main_page() {
            Ok(entry) => println!("  Main page: {}", entry.fully_qualified_path()),
            Err(_) => println!("  Main page: (none)"),
        }
        println!("  Title: {}", loaded.metadata.title);
        println!("  Language: {} ({})", loaded.metadata.language, loaded.metadata.language_code);
        println!("  Category: {}", loaded.metadata.category);
        println!("  Search index: {}", if loaded.index.is_some() { "yes" } else { "no" });
    }

    if args.categories {
        println!("== categories ==");
        for category in catalog.categories() {
            println!("  {category}");
        }
    }

    if args.languages {
        println!("== languages ==");
        for lang in catalog.languages() {
            println!("  {} ({})", lang.name, lang.code);
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

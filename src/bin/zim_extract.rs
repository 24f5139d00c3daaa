//! Extracts every entry of a ZIM archive to `<out>/<namespace>/<path>` on
//! disk, hard-linking redirect targets to the content they point at.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};

use zim_engine::archive::Archive;
use zim_engine::config::EngineConfig;
use zim_engine::entry::{DirectoryEntry, EntryInfo};

#[derive(Parser)]
#[command(name = "zim-extract", version, about = "Extract a ZIM archive to disk")]
struct Args {
    /// ZIM file to extract
    input: String,

    /// Output directory
    #[arg(short, long, default_value = "out")]
    out: PathBuf,

    /// Skip creating hard links for redirect entries
    #[arg(long)]
    skip_links: bool,
}

fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let archive = match Archive::open(&args.input, &EngineConfig::default()) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}: {e}", args.input);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = fs::create_dir_all(&args.out) {
        eprintln!("{}: {e}", args.out.display());
        return ExitCode::FAILURE;
    }

    let mut redirects: Vec<(PathBuf, u32)> = Vec::new();
    let mut by_namespace: HashMap<char, Vec<DirectoryEntry>> = HashMap::new();

    for ns in [
        zim_engine::Namespace::CONTENT,
        zim_engine::Namespace::METADATA,
        zim_engine::Namespace::WELL_KNOWN,
        zim_engine::Namespace::INDEX,
    ] {
        by_namespace
            .entry(ns.as_char())
            .or_default()
            .extend(archive.list_by_namespace(ns));
    }

    let mut written = 0usize;
    for (_, entries) in by_namespace {
        for entry in entries {
            let dst = entry_path(&args.out, &entry);

            match &entry {
                DirectoryEntry::Content(_) => {
                    if let Some(parent) = dst.parent() {
                        if let Err(e) = fs::create_dir_all(parent) {
                            warn!(path = %dst.display(), error = %e, "failed to create directory");
                            continue;
                        }
                    }
                    match archive.content(entry.clone()) {
                        Ok(bytes) => {
                            if let Err(e) = fs::write(&dst, &bytes) {
                                warn!(path = %dst.display(), error = %e, "failed to write entry");
                            } else {
                                written += 1;
                            }
                        }
                        Err(e) => warn!(path = %dst.display(), error = %e, "failed to read entry"),
                    }
                }
                DirectoryEntry::Redirect(r) => {
                    if !args.skip_links {
                        redirects.push((dst, r.redirect_index));
                    }
                }
            }
        }
    }

    if !args.skip_links {
        for (dst, target_index) in redirects {
            if dst.exists() {
                continue;
            }
            let target = match archive.entry_by_index(target_index) {
                Ok(e) => e,
                Err(e) => {
                    warn!(path = %dst.display(), error = %e, "redirect target unavailable");
                    continue;
                }
            };
            let src = entry_path(&args.out, &target);
            if !src.exists() {
                continue;
            }
            if let Some(parent) = dst.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Err(e) = fs::hard_link(&src, &dst) {
                warn!(src = %src.display(), dst = %dst.display(), error = %e, "failed to hard-link redirect");
            }
        }
    }

    if let Ok(main_page) = archive.main_page() {
        info!(path = %main_page.fully_qualified_path(), "main page");
    }

    info!(written, out = %args.out.display(), "extraction complete");
    ExitCode::SUCCESS
}

fn entry_path(root: &Path, entry: &DirectoryEntry) -> PathBuf {
    let mut ns = String::new();
    ns.push(entry.namespace().as_char());
    let path = entry.path().trim_start_matches('/');
    root.join(ns).join(path)
}

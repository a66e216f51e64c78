//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use distfetch_core::catalog::DISTRO_INFO_BASE_URL;

/// Fetch files through a deduplicating cache and query distribution releases.
///
/// Each distinct URL is downloaded at most once per run, however many
/// destinations ask for it.
#[derive(Parser, Debug)]
#[command(name = "distfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download URL/destination pairs concurrently through one cache.
    Fetch(FetchArgs),

    /// List distribution releases.
    Releases(ReleasesArgs),
}

#[derive(ClapArgs, Debug)]
pub struct FetchArgs {
    /// Alternating URL and destination path: URL DEST [URL DEST ...]
    #[arg(required = true, num_args = 2.., value_name = "URL DEST")]
    pub pairs: Vec<String>,

    /// Per-attempt timeouts in milliseconds, in order (default 1000,2000,3000,5000,7000)
    #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(u64).range(1..=600_000))]
    pub timeouts: Vec<u64>,
}

impl FetchArgs {
    /// Splits `pairs` into (url, destination) tuples.
    ///
    /// # Errors
    ///
    /// Returns a message when the number of values is odd.
    pub fn downloads(&self) -> Result<Vec<(String, PathBuf)>, String> {
        if self.pairs.len() % 2 != 0 {
            return Err(format!(
                "expected URL DEST pairs, got {} values (missing destination for '{}')",
                self.pairs.len(),
                self.pairs.last().map_or("", String::as_str)
            ));
        }
        Ok(self
            .pairs
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), PathBuf::from(&pair[1])))
            .collect())
    }
}

#[derive(ClapArgs, Debug)]
pub struct ReleasesArgs {
    /// Only this distribution id (e.g. debian, rhel)
    #[arg(long = "distro", value_name = "ID")]
    pub distro: Option<String>,

    /// Only distributions like this id (repeatable)
    #[arg(long = "like", value_name = "ID")]
    pub like: Vec<String>,

    /// Only releases with this version id (e.g. 12, 8.4)
    #[arg(long = "release", value_name = "ID")]
    pub release: Option<String>,

    /// Only releases with this codename
    #[arg(long)]
    pub codename: Option<String>,

    /// Only releases in this suite (e.g. stable, testing, devel)
    #[arg(long)]
    pub suite: Option<String>,

    /// Only releases supported today
    #[arg(long, conflicts_with_all = ["released", "eoled"])]
    pub supported: bool,

    /// Only releases released by today
    #[arg(long, conflicts_with = "eoled")]
    pub released: bool,

    /// Only releases past end-of-life today
    #[arg(long)]
    pub eoled: bool,

    /// Use the built-in tables only (no Debian or Ubuntu, no network)
    #[arg(long)]
    pub offline: bool,

    /// Print releases as JSON
    #[arg(long)]
    pub json: bool,

    /// Base URL of the distro-info-data tables
    #[arg(long, value_name = "URL", default_value = DISTRO_INFO_BASE_URL)]
    pub base_url: String,
}

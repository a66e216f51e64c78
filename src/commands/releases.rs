//! Releases command handler: filter and print catalog releases.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use distfetch_core::{Catalog, DownloadCache, Release, ReleaseFilter};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::cli::ReleasesArgs;

/// Translates the command line into a release filter evaluated on `today`.
pub(crate) fn release_filter(args: &ReleasesArgs, today: NaiveDate) -> ReleaseFilter {
    let mut filter = ReleaseFilter::new().on(today);
    if let Some(id) = &args.release {
        filter = filter.id(id.as_str());
    }
    if let Some(codename) = &args.codename {
        filter = filter.codename(codename.as_str());
    }
    if let Some(suite) = &args.suite {
        filter = filter.suite(suite.as_str());
    }
    if args.supported {
        filter = filter.supported(true);
    }
    if args.released {
        filter = filter.released(true);
    }
    if args.eoled {
        filter = filter.eoled(true);
    }
    filter
}

fn render_date(date: NaiveDate) -> String {
    if date == NaiveDate::MAX {
        "-".to_string()
    } else {
        date.format("%Y-%m-%d").to_string()
    }
}

/// One table row: uid, name, suite, release date, EOL date.
pub(crate) fn render_release_row(release: &Release) -> String {
    format!(
        "{:<28} {:<28} {:<14} {:<10} {}",
        release.uid(),
        release.name,
        release.suite.as_deref().unwrap_or("-"),
        render_date(release.release_date),
        render_date(release.eol_date)
    )
}

pub async fn run_releases_command(args: &ReleasesArgs, interrupted: Arc<AtomicBool>) -> Result<()> {
    let today = Local::now().date_naive();
    let catalog = if args.offline {
        debug!("using built-in tables only");
        Catalog::builtin()
    } else {
        let work_dir = TempDir::new().context("failed to create work directory")?;
        let cache = DownloadCache::new(false)?.with_abort_flag(interrupted);
        Catalog::load_from(&cache, &args.base_url, work_dir.path(), today).await?
    };

    let like: Vec<&str> = args.like.iter().map(String::as_str).collect();
    let releases = catalog.releases(args.distro.as_deref(), &like, &release_filter(args, today));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&releases)?);
        return Ok(());
    }
    if releases.is_empty() {
        info!("No matching releases");
        return Ok(());
    }
    for release in &releases {
        println!("{}", render_release_row(release));
    }
    Ok(())
}

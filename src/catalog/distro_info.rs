//! Debian and Ubuntu release tables from distro-info-data.
//!
//! The tables are CSV files with the header
//! `version,codename,series,created,release,eol[,...]`, one row per release in
//! release order. Trailing columns may be missing or empty.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use super::distribution::Distribution;
use super::error::CatalogError;
use super::release::ReleaseFilter;

/// Where distro-info-data publishes its CSV files.
pub const DISTRO_INFO_BASE_URL: &str = "https://debian.pages.debian.net/distro-info-data/";

const RELEASE_COLUMN: usize = 4;
const EOL_COLUMN: usize = 5;

/// Everything from the first character that is not part of a dotted version.
#[allow(clippy::expect_used)]
static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.].*").expect("version suffix regex is valid")); // Static pattern, safe to panic

/// Builds the Debian distribution from `debian.csv`, assigning suites as of `today`.
///
/// # Errors
///
/// Returns [`CatalogError::Parse`] on a row with fewer than three columns or
/// an unparseable date.
pub fn debian(csv: &str, today: NaiveDate) -> Result<Distribution, CatalogError> {
    let mut debian = Distribution::new("Debian GNU/Linux", "debian", &[]);
    parse_releases(&mut debian, csv)?;

    let supported: Vec<u32> = debian
        .releases(&ReleaseFilter::new().on(today).supported(true))
        .iter()
        .rev()
        .map(|r| r.order)
        .collect();
    for (age, order) in supported.into_iter().enumerate() {
        debian.set_suite(order, &format!("{}stable", "old".repeat(age)));
    }

    let testing = first_order(&debian, &ReleaseFilter::new().on(today).released(false));
    if let Some(order) = testing {
        debian.set_suite(order, "testing");
    }
    if let Some(order) = first_order(&debian, &ReleaseFilter::new().codename("sid")) {
        debian.set_suite(order, "unstable");
    }
    if let Some(order) = first_order(&debian, &ReleaseFilter::new().codename("experimental")) {
        debian.set_suite(order, "rc-buggy");
    }
    Ok(debian)
}

/// Builds the Ubuntu distribution from `ubuntu.csv`; the first unreleased
/// release as of `today` is `devel`.
///
/// # Errors
///
/// Returns [`CatalogError::Parse`] on a malformed row.
pub fn ubuntu(csv: &str, today: NaiveDate) -> Result<Distribution, CatalogError> {
    let mut ubuntu = Distribution::new("Ubuntu", "ubuntu", &["debian"]);
    parse_releases(&mut ubuntu, csv)?;

    if let Some(order) = first_order(&ubuntu, &ReleaseFilter::new().on(today).released(false)) {
        ubuntu.set_suite(order, "devel");
    }
    Ok(ubuntu)
}

/// URL of the table for distribution `id`.
#[must_use]
pub fn table_url(base_url: &str, id: &str) -> String {
    format!("{}/{id}.csv", base_url.trim_end_matches('/'))
}

fn first_order(dist: &Distribution, filter: &ReleaseFilter) -> Option<u32> {
    dist.releases(filter).first().map(|r| r.order)
}

/// Adds one release per data row of `csv` to `dist`.
///
/// # Errors
///
/// Returns [`CatalogError::Parse`] on a malformed row.
pub fn parse_releases(dist: &mut Distribution, csv: &str) -> Result<(), CatalogError> {
    let mut order: u32 = 0;
    // Line 1 is the header.
    for (index, line) in csv.lines().enumerate().skip(1) {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(|f| f.trim().trim_matches('"')).collect();
        if fields.len() < 3 {
            return Err(CatalogError::parse(
                &dist.id,
                line_no,
                format!("expected at least 3 columns, found {}", fields.len()),
            ));
        }

        let (version, codename, series) = (fields[0], fields[1], fields[2]);
        let name = if version.is_empty() {
            codename.to_string()
        } else {
            format!("{version} ({codename})")
        };
        let id = VERSION_SUFFIX.replace(version, "");

        let mut release = dist.release(&name, &id, order).with_codename(series);
        if let Some(date) = date_column(&dist.id, line_no, &fields, RELEASE_COLUMN, "release")? {
            release = release.released(date);
        }
        if let Some(date) = date_column(&dist.id, line_no, &fields, EOL_COLUMN, "eol")? {
            release = release.eol(date);
        }
        dist.add_release(release);
        order += 1;
    }
    debug!(distribution = %dist.id, releases = order, "parsed release table");
    Ok(())
}

fn date_column(
    distribution: &str,
    line: usize,
    fields: &[&str],
    column: usize,
    label: &str,
) -> Result<Option<NaiveDate>, CatalogError> {
    match fields.get(column) {
        None | Some(&"") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| {
                CatalogError::parse(distribution, line, format!("invalid {label} date '{value}': {e}"))
            }),
    }
}

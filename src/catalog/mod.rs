//! Catalog of OS distributions and their releases.
//!
//! CentOS, Fedora and RHEL come from built-in tables. Debian and Ubuntu are
//! read from the distro-info-data CSV files, fetched through a
//! [`DownloadCache`] so repeated loads in one process hit the network once.
//!
//! # Example
//!
//! ```
//! use distfetch_core::catalog::{Catalog, ReleaseFilter};
//!
//! let catalog = Catalog::builtin();
//! let rhel_like: Vec<_> = catalog
//!     .distributions(None, &["rhel"])
//!     .iter()
//!     .map(|d| d.id.as_str())
//!     .collect();
//! assert_eq!(rhel_like, vec!["centos", "rhel"]);
//!
//! let centos = catalog.distribution("centos").unwrap();
//! let seven = centos.releases(&ReleaseFilter::new().id("7"));
//! assert_eq!(seven[0].uid(), "centos-7");
//! ```

mod builtin;
mod distribution;
mod distro_info;
mod error;
mod release;

pub use distribution::Distribution;
pub use distro_info::{DISTRO_INFO_BASE_URL, parse_releases, table_url};
pub use error::CatalogError;
pub use release::{Release, ReleaseFilter};

use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::download::DownloadCache;

/// A set of distributions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    distributions: Vec<Distribution>,
}

impl Catalog {
    /// Creates a catalog from explicit distributions.
    #[must_use]
    pub fn new(distributions: Vec<Distribution>) -> Self {
        Self { distributions }
    }

    /// The built-in distributions only; no network access.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin::all())
    }

    /// Built-ins plus Debian and Ubuntu from distro-info-data.
    ///
    /// The CSV files are installed into `work_dir`, which must exist. Suites
    /// are assigned as of `today`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Download`] if a table cannot be fetched,
    /// [`CatalogError::Read`] if it cannot be read back and
    /// [`CatalogError::Parse`] if it is malformed.
    pub async fn load(
        cache: &DownloadCache,
        work_dir: &Path,
        today: NaiveDate,
    ) -> Result<Self, CatalogError> {
        Self::load_from(cache, DISTRO_INFO_BASE_URL, work_dir, today).await
    }

    /// Like [`Catalog::load`], reading the tables from `base_url`.
    ///
    /// # Errors
    ///
    /// See [`Catalog::load`].
    #[instrument(skip(cache, work_dir), fields(work_dir = %work_dir.display()))]
    pub async fn load_from(
        cache: &DownloadCache,
        base_url: &str,
        work_dir: &Path,
        today: NaiveDate,
    ) -> Result<Self, CatalogError> {
        let (debian_csv, ubuntu_csv) = tokio::try_join!(
            fetch_table(cache, base_url, work_dir, "debian"),
            fetch_table(cache, base_url, work_dir, "ubuntu"),
        )?;

        let mut distributions = vec![
            distro_info::debian(&debian_csv, today)?,
            distro_info::ubuntu(&ubuntu_csv, today)?,
        ];
        distributions.extend(builtin::all());
        info!(distributions = distributions.len(), "catalog loaded");
        Ok(Self::new(distributions))
    }

    /// Distributions with id `id` (when given) that are like every id in `id_like`.
    #[must_use]
    pub fn distributions(&self, id: Option<&str>, id_like: &[&str]) -> Vec<&Distribution> {
        self.distributions
            .iter()
            .filter(|d| id.is_none_or(|id| d.id == id))
            .filter(|d| d.is_like(id_like))
            .collect()
    }

    /// The distribution with id `id`.
    #[must_use]
    pub fn distribution(&self, id: &str) -> Option<&Distribution> {
        self.distributions.iter().find(|d| d.id == id)
    }

    /// Matching releases of the selected distributions, each distribution oldest first.
    #[must_use]
    pub fn releases(
        &self,
        id: Option<&str>,
        id_like: &[&str],
        filter: &ReleaseFilter,
    ) -> Vec<&Release> {
        self.distributions(id, id_like)
            .into_iter()
            .flat_map(|d| d.releases(filter))
            .collect()
    }

    /// Number of distributions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    /// Returns true if the catalog holds no distribution.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }
}

async fn fetch_table(
    cache: &DownloadCache,
    base_url: &str,
    work_dir: &Path,
    id: &str,
) -> Result<String, CatalogError> {
    let url = table_url(base_url, id);
    let path = work_dir.join(format!("{id}.csv"));
    cache
        .download(&url, &path)
        .await
        .map_err(|e| CatalogError::download(id, e))?;
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| CatalogError::read(&path, e))
}

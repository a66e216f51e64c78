//! Distributions and their release sets.

use std::fmt;

use serde::Serialize;

use super::release::{Release, ReleaseFilter};

/// An OS distribution with its known releases.
#[derive(Debug, Clone, Serialize)]
pub struct Distribution {
    /// Display name (e.g. `Debian GNU/Linux`).
    pub name: String,
    /// Distribution id as in `os-release` (e.g. `debian`).
    pub id: String,
    /// Ids this distribution is like, starting with its own.
    pub id_like: Vec<String>,
    #[serde(skip)]
    releases: Vec<Release>,
}

impl Distribution {
    /// Creates a distribution with no releases.
    ///
    /// `id_like` is prefixed with `id`, so a distribution is always like itself.
    #[must_use]
    pub fn new(name: &str, id: &str, id_like: &[&str]) -> Self {
        let mut like = vec![id.to_string()];
        like.extend(id_like.iter().map(|s| (*s).to_string()));
        Self {
            name: name.to_string(),
            id: id.to_string(),
            id_like: like,
            releases: Vec::new(),
        }
    }

    /// Adds a release. A release with an order already present replaces it.
    pub fn add_release(&mut self, release: Release) {
        match self.releases.iter_mut().find(|r| r.order == release.order) {
            Some(existing) => *existing = release,
            None => self.releases.push(release),
        }
    }

    /// Starts a release owned by this distribution.
    #[must_use]
    pub fn release(&self, name: &str, id: &str, order: u32) -> Release {
        Release::new(&self.id, name, id, order)
    }

    /// Releases matching `filter`, oldest first.
    #[must_use]
    pub fn releases(&self, filter: &ReleaseFilter) -> Vec<&Release> {
        let mut matches: Vec<&Release> = self.releases.iter().filter(|r| filter.matches(r)).collect();
        matches.sort();
        matches
    }

    /// Number of known releases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    /// Returns true if no release is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Whether every id in `ids` is one this distribution is like.
    #[must_use]
    pub fn is_like(&self, ids: &[&str]) -> bool {
        ids.iter().all(|id| self.id_like.iter().any(|like| like == id))
    }

    /// Sets the suite of the release with `order`.
    pub(crate) fn set_suite(&mut self, order: u32, suite: &str) {
        if let Some(release) = self.releases.iter_mut().find(|r| r.order == order) {
            release.suite = Some(suite.to_string());
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_id_like_starts_with_own_id() {
        let centos = Distribution::new("CentOS Linux", "centos", &["rhel", "fedora"]);
        assert_eq!(centos.id_like, vec!["centos", "rhel", "fedora"]);
        assert!(centos.is_like(&["centos"]));
        assert!(centos.is_like(&["fedora", "rhel"]));
        assert!(centos.is_like(&[]));
        assert!(!centos.is_like(&["debian"]));
    }

    #[test]
    fn test_releases_sorted_by_order() {
        let mut fedora = Distribution::new("Fedora", "fedora", &[]);
        for order in [33, 30, 35, 31] {
            let release = fedora.release(&order.to_string(), &order.to_string(), order);
            fedora.add_release(release);
        }
        let orders: Vec<u32> = fedora
            .releases(&ReleaseFilter::new())
            .iter()
            .map(|r| r.order)
            .collect();
        assert_eq!(orders, vec![30, 31, 33, 35]);
    }

    #[test]
    fn test_add_release_replaces_same_order() {
        let mut dist = Distribution::new("Test", "test", &[]);
        let first = dist.release("1", "1", 1);
        let second = dist.release("1 (renamed)", "1", 1);
        dist.add_release(first);
        dist.add_release(second);
        assert_eq!(dist.len(), 1);
        assert_eq!(dist.releases(&ReleaseFilter::new())[0].name, "1 (renamed)");
    }

    #[test]
    fn test_set_suite_targets_one_release() {
        let mut dist = Distribution::new("Test", "test", &[]);
        let released = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN);
        for order in 0..3 {
            let release = dist.release("r", &order.to_string(), order).released(released);
            dist.add_release(release);
        }
        dist.set_suite(1, "stable");
        let stable = dist.releases(&ReleaseFilter::new().suite("stable"));
        assert_eq!(stable.len(), 1);
        assert_eq!(stable[0].order, 1);
    }
}

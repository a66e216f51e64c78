//! Release records and the attribute filter used to select them.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Local, NaiveDate};
use serde::{Serialize, Serializer};

/// One release of a distribution.
///
/// Dates default to [`NaiveDate::MAX`], which reads as "never": a release
/// without a release date is unreleased, one without an EOL date is not
/// end-of-life.
#[derive(Debug, Clone, Serialize)]
pub struct Release {
    /// Id of the owning distribution (e.g. `debian`).
    pub distribution: String,
    /// Display name (e.g. `12 (Bookworm)`).
    pub name: String,
    /// Version id (e.g. `12`, `8.4`); empty for rolling suites such as sid.
    pub id: String,
    /// Position within the distribution; higher is newer.
    pub order: u32,
    /// Codename (e.g. `bookworm`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codename: Option<String>,
    /// CPE name of the release.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,
    /// Release channel (e.g. `stable`, `testing`, `rawhide`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    /// Release date, `NaiveDate::MAX` when unknown.
    #[serde(serialize_with = "serialize_date")]
    pub release_date: NaiveDate,
    /// End-of-life date, `NaiveDate::MAX` when unknown.
    #[serde(serialize_with = "serialize_date")]
    pub eol_date: NaiveDate,
}

impl Release {
    /// Creates a release with no codename, CPE, suite or dates.
    #[must_use]
    pub fn new(distribution: &str, name: &str, id: &str, order: u32) -> Self {
        Self {
            distribution: distribution.to_string(),
            name: name.to_string(),
            id: id.to_string(),
            order,
            codename: None,
            cpe: None,
            suite: None,
            release_date: NaiveDate::MAX,
            eol_date: NaiveDate::MAX,
        }
    }

    /// Sets the codename.
    #[must_use]
    pub fn with_codename(mut self, codename: &str) -> Self {
        self.codename = Some(codename.to_string());
        self
    }

    /// Sets the CPE name.
    #[must_use]
    pub fn with_cpe(mut self, cpe: &str) -> Self {
        self.cpe = Some(cpe.to_string());
        self
    }

    /// Sets the suite.
    #[must_use]
    pub fn with_suite(mut self, suite: &str) -> Self {
        self.suite = Some(suite.to_string());
        self
    }

    /// Sets the release date.
    #[must_use]
    pub fn released(mut self, date: NaiveDate) -> Self {
        self.release_date = date;
        self
    }

    /// Sets the end-of-life date.
    #[must_use]
    pub fn eol(mut self, date: NaiveDate) -> Self {
        self.eol_date = date;
        self
    }

    /// Unique id: `<distribution>-<id>[-<codename>]`.
    #[must_use]
    pub fn uid(&self) -> String {
        match &self.codename {
            Some(codename) => format!("{}-{}-{codename}", self.distribution, self.id),
            None => format!("{}-{}", self.distribution, self.id),
        }
    }

    /// Whether the release date is on or before `day`.
    #[must_use]
    pub fn released_on(&self, day: NaiveDate) -> bool {
        self.release_date <= day
    }

    /// Whether the end-of-life date is on or before `day`.
    #[must_use]
    pub fn eoled_on(&self, day: NaiveDate) -> bool {
        self.eol_date <= day
    }

    /// Released and not yet end-of-life on `day`.
    #[must_use]
    pub fn supported_on(&self, day: NaiveDate) -> bool {
        self.released_on(day) && !self.eoled_on(day)
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.distribution, self.name)
    }
}

// Identity is (distribution, order); names and dates do not take part.
impl PartialEq for Release {
    fn eq(&self, other: &Self) -> bool {
        self.distribution == other.distribution && self.order == other.order
    }
}

impl Eq for Release {}

impl PartialOrd for Release {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Release {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distribution
            .cmp(&other.distribution)
            .then(self.order.cmp(&other.order))
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    if *date == NaiveDate::MAX {
        serializer.serialize_none()
    } else {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }
}

/// Attribute filter over releases.
///
/// Every attribute is optional; a release matches when all set attributes
/// match. `released`, `supported` and `eoled` are evaluated on [`Self::on`],
/// which defaults to today's local date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFilter {
    /// Exact release id, e.g. `8.4`.
    pub id: Option<String>,
    /// Exact codename.
    pub codename: Option<String>,
    /// Exact CPE name.
    pub cpe: Option<String>,
    /// Exact suite, e.g. `stable` or `rawhide`.
    pub suite: Option<String>,
    /// Exact release date.
    pub release_date: Option<NaiveDate>,
    /// Exact end-of-life date.
    pub eol_date: Option<NaiveDate>,
    /// Whether the release is out on the reference day.
    pub released: Option<bool>,
    /// Whether the release is out and not yet end-of-life on the reference day.
    pub supported: Option<bool>,
    /// Whether the release is end-of-life on the reference day.
    pub eoled: Option<bool>,
    /// Only releases ordered strictly after this order.
    pub after: Option<u32>,
    /// Only releases ordered strictly before this order.
    pub before: Option<u32>,
    /// Reference day for the date predicates.
    pub on: NaiveDate,
}

impl Default for ReleaseFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseFilter {
    /// A filter matching every release, evaluated today.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: None,
            codename: None,
            cpe: None,
            suite: None,
            release_date: None,
            eol_date: None,
            released: None,
            supported: None,
            eoled: None,
            after: None,
            before: None,
            on: Local::now().date_naive(),
        }
    }

    /// Matches this release id only.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Matches this codename only.
    #[must_use]
    pub fn codename(mut self, codename: impl Into<String>) -> Self {
        self.codename = Some(codename.into());
        self
    }

    /// Matches this CPE name only.
    #[must_use]
    pub fn cpe(mut self, cpe: impl Into<String>) -> Self {
        self.cpe = Some(cpe.into());
        self
    }

    /// Matches this suite only.
    #[must_use]
    pub fn suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    /// Matches releases out on exactly `date`.
    #[must_use]
    pub fn release_date(mut self, date: NaiveDate) -> Self {
        self.release_date = Some(date);
        self
    }

    /// Matches releases that end on exactly `date`.
    #[must_use]
    pub fn eol_date(mut self, date: NaiveDate) -> Self {
        self.eol_date = Some(date);
        self
    }

    /// Filters on whether the release is out.
    #[must_use]
    pub fn released(mut self, released: bool) -> Self {
        self.released = Some(released);
        self
    }

    /// Filters on whether the release is still supported.
    #[must_use]
    pub fn supported(mut self, supported: bool) -> Self {
        self.supported = Some(supported);
        self
    }

    /// Filters on whether the release is end-of-life.
    #[must_use]
    pub fn eoled(mut self, eoled: bool) -> Self {
        self.eoled = Some(eoled);
        self
    }

    /// Only releases newer than `release`.
    #[must_use]
    pub fn after(mut self, release: &Release) -> Self {
        self.after = Some(release.order);
        self
    }

    /// Only releases older than `release`.
    #[must_use]
    pub fn before(mut self, release: &Release) -> Self {
        self.before = Some(release.order);
        self
    }

    /// Evaluates date predicates on `day` instead of today.
    #[must_use]
    pub fn on(mut self, day: NaiveDate) -> Self {
        self.on = day;
        self
    }

    /// Whether `release` satisfies every set attribute.
    #[must_use]
    pub fn matches(&self, release: &Release) -> bool {
        let day = self.on;
        text_matches(self.id.as_deref(), Some(&release.id))
            && text_matches(self.codename.as_deref(), release.codename.as_deref())
            && text_matches(self.cpe.as_deref(), release.cpe.as_deref())
            && text_matches(self.suite.as_deref(), release.suite.as_deref())
            && self.release_date.is_none_or(|d| d == release.release_date)
            && self.eol_date.is_none_or(|d| d == release.eol_date)
            && self.released.is_none_or(|b| b == release.released_on(day))
            && self.supported.is_none_or(|b| b == release.supported_on(day))
            && self.eoled.is_none_or(|b| b == release.eoled_on(day))
            && self.after.is_none_or(|order| release.order > order)
            && self.before.is_none_or(|order| release.order < order)
    }
}

fn text_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    wanted.is_none_or(|wanted| actual == Some(wanted))
}

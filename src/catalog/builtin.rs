//! Release tables for distributions without a machine-readable source.

use chrono::NaiveDate;

use super::distribution::Distribution;

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
}

/// CentOS Linux 6 to 8.
#[must_use]
pub fn centos() -> Distribution {
    let mut dist = Distribution::new("CentOS Linux", "centos", &["rhel", "fedora"]);
    let table = [
        (8, ymd(2019, 9, 24), ymd(2021, 12, 31)),
        (7, ymd(2014, 7, 7), ymd(2024, 6, 30)),
        (6, ymd(2011, 7, 10), ymd(2020, 11, 30)),
    ];
    for (version, released, eol) in table {
        let id = version.to_string();
        let release = dist
            .release(&id, &id, version)
            .with_cpe(&format!("cpe:/o:centos:centos:{version}"))
            .released(released)
            .eol(eol);
        dist.add_release(release);
    }
    dist
}

/// Fedora 30 to 35; 35 is tracked as `rawhide`.
#[must_use]
pub fn fedora() -> Distribution {
    let mut dist = Distribution::new("Fedora", "fedora", &[]);
    let rawhide = dist
        .release("35", "35", 35)
        .with_suite("rawhide")
        .released(ymd(2021, 10, 26));
    dist.add_release(rawhide);

    let table = [
        (34, ymd(2021, 4, 27), None),
        (33, ymd(2020, 10, 27), None),
        (32, ymd(2020, 4, 28), Some(ymd(2021, 5, 18))),
        (31, ymd(2019, 10, 29), Some(ymd(2020, 11, 24))),
        (30, ymd(2019, 5, 7), Some(ymd(2020, 5, 26))),
    ];
    for (version, released, eol) in table {
        let id = version.to_string();
        let mut release = dist
            .release(&id, &id, version)
            .with_cpe(&format!("cpe:/o:fedoraproject:fedora:{version}"))
            .released(released);
        if let Some(eol) = eol {
            release = release.eol(eol);
        }
        dist.add_release(release);
    }
    dist
}

/// Red Hat Enterprise Linux 7.0 to 8.4.
#[must_use]
pub fn rhel() -> Distribution {
    let mut dist = Distribution::new("Red Hat Enterprise Linux", "rhel", &["fedora"]);
    let table = [
        ((8, 4), ymd(2021, 5, 18), Some(ymd(2023, 5, 30))),
        ((8, 3), ymd(2020, 11, 3), None),
        ((8, 2), ymd(2020, 4, 28), Some(ymd(2022, 4, 30))),
        ((8, 1), ymd(2019, 11, 5), Some(ymd(2021, 11, 30))),
        ((8, 0), ymd(2019, 5, 7), Some(ymd(2019, 11, 5))),
        ((7, 9), ymd(2020, 9, 29), Some(ymd(2024, 6, 30))),
        ((7, 8), ymd(2020, 3, 31), Some(ymd(2020, 9, 29))),
        ((7, 7), ymd(2019, 8, 6), Some(ymd(2021, 8, 30))),
        ((7, 6), ymd(2018, 10, 30), Some(ymd(2021, 5, 31))),
        ((7, 5), ymd(2018, 4, 10), Some(ymd(2020, 4, 30))),
        ((7, 4), ymd(2017, 7, 31), Some(ymd(2019, 8, 31))),
        ((7, 3), ymd(2016, 11, 3), Some(ymd(2018, 11, 30))),
        ((7, 2), ymd(2015, 11, 19), Some(ymd(2017, 11, 30))),
        ((7, 1), ymd(2015, 3, 5), Some(ymd(2017, 3, 31))),
        ((7, 0), ymd(2014, 6, 9), Some(ymd(2015, 3, 5))),
    ];
    for ((major, minor), released, eol) in table {
        let id = format!("{major}.{minor}");
        let family = if major >= 8 { "Ootpa" } else { "Maipo" };
        let mut release = dist
            .release(&format!("{id} ({family})"), &id, major * 100 + minor)
            .with_cpe(&format!("cpe:/o:redhat:enterprise_linux:{id}"))
            .released(released);
        if let Some(eol) = eol {
            release = release.eol(eol);
        }
        dist.add_release(release);
    }
    dist
}

/// All built-in distributions.
#[must_use]
pub fn all() -> Vec<Distribution> {
    vec![centos(), fedora(), rhel()]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::ReleaseFilter;

    #[test]
    fn test_builtin_dates_are_valid() {
        for dist in all() {
            for release in dist.releases(&ReleaseFilter::new()) {
                assert!(
                    release.release_date != NaiveDate::MAX,
                    "{} has no release date",
                    release.uid()
                );
            }
        }
    }

    #[test]
    fn test_centos_table() {
        let centos = centos();
        assert_eq!(centos.len(), 3);
        let seven = centos.releases(&ReleaseFilter::new().id("7"));
        assert_eq!(seven[0].cpe.as_deref(), Some("cpe:/o:centos:centos:7"));
        assert_eq!(seven[0].eol_date, ymd(2024, 6, 30));
    }

    #[test]
    fn test_fedora_rawhide_has_no_cpe() {
        let fedora = fedora();
        let rawhide = fedora.releases(&ReleaseFilter::new().suite("rawhide"));
        assert_eq!(rawhide.len(), 1);
        assert_eq!(rawhide[0].id, "35");
        assert_eq!(rawhide[0].cpe, None);
        assert_eq!(rawhide[0].eol_date, NaiveDate::MAX);
    }

    #[test]
    fn test_rhel_orders_across_majors() {
        let rhel = rhel();
        assert_eq!(rhel.len(), 15);
        let ids: Vec<&str> = rhel
            .releases(&ReleaseFilter::new())
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids.first(), Some(&"7.0"));
        assert_eq!(ids.last(), Some(&"8.4"));

        let ootpa = rhel.releases(&ReleaseFilter::new().id("8.4"));
        assert_eq!(ootpa[0].name, "8.4 (Ootpa)");
        assert_eq!(ootpa[0].order, 804);
        let maipo = rhel.releases(&ReleaseFilter::new().id("7.0"));
        assert_eq!(maipo[0].name, "7.0 (Maipo)");
    }

    #[test]
    fn test_rhel_support_on_fixed_day() {
        let rhel = rhel();
        let supported = rhel.releases(&ReleaseFilter::new().on(ymd(2021, 6, 1)).supported(true));
        let ids: Vec<&str> = supported.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["7.7", "7.9", "8.1", "8.2", "8.3", "8.4"]);
    }
}

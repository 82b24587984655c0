//! Lines printed on stdout for command results.

use pulpdeploy_protocol::constants::default_environment;
use pulpdeploy_protocol::{ProgressReport, Publication};
use pulpdeploy_publish::{ActiveDistribution, Distributed, Released};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn released(released: &Released) -> Vec<String> {
    let mut lines = vec!["Repository publication created.".to_string()];
    match &released.distributed {
        Distributed::Updated { .. } => {
            lines.push("Default repository distribution updated.".into());
        }
        Distributed::Created { distributions } => {
            for name in distributions {
                let env = name.rsplit('-').next().unwrap_or(default_environment());
                lines.push(format!("{env} repository distribution created."));
            }
        }
    }
    lines
}

fn created(publication: Option<&Publication>) -> String {
    publication
        .and_then(|p| p.pulp_created)
        .map_or_else(|| "-".into(), |t| t.format(TIME_FORMAT).to_string())
}

fn version(version: Option<u64>) -> String {
    version.map_or_else(|| "-".into(), |v| v.to_string())
}

/// `<repo>\t<version>\t<created>`
pub fn publication(repo: &str, publication: &Publication) -> String {
    format!(
        "{repo}\t{}\t{}",
        version(publication.version()),
        created(Some(publication))
    )
}

/// `<distribution>\t<version>\t<created>`
pub fn active_distribution(active: &ActiveDistribution) -> String {
    format!(
        "{}\t{}\t{}",
        active.distribution.name,
        version(active.version()),
        created(active.publication.as_ref())
    )
}

/// `<message>: total N done M`
pub fn progress(report: &ProgressReport) -> String {
    format!(
        "{}: total {} done {}",
        report.message,
        report.total.unwrap_or(0),
        report.done
    )
}

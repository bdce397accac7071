use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::domain::WorkflowDataRequirements;
use crate::error::LaunchpadError;

/// One sequencing run as reported by the read-metadata service. `fastq_ftp`
/// holds the semicolon-delimited mate URLs consumed by the pair parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRun {
    pub run_accession: String,
    #[serde(default)]
    pub fastq_ftp: String,
    #[serde(default)]
    pub library_layout: Option<String>,
    #[serde(default)]
    pub library_strategy: Option<String>,
    #[serde(default)]
    pub library_source: Option<String>,
}

impl ReadRun {
    pub fn is_paired(&self) -> bool {
        self.library_layout
            .as_deref()
            .map(|layout| layout.eq_ignore_ascii_case("PAIRED"))
            .unwrap_or(false)
    }
}

pub trait EnaClient: Send + Sync {
    /// Read runs available for the taxonomy subtree rooted at the given id.
    fn read_runs(&self, taxonomy_id: &str) -> Result<Vec<ReadRun>, LaunchpadError>;
}

#[derive(Clone)]
pub struct EnaHttpClient {
    client: Client,
    base_url: String,
}

const READ_RUN_FIELDS: &str =
    "run_accession,fastq_ftp,library_layout,library_strategy,library_source";

impl EnaHttpClient {
    pub fn new() -> Result<Self, LaunchpadError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("galaxy-launchpad/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LaunchpadError::EnaHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| LaunchpadError::EnaHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: "https://www.ebi.ac.uk/ena/portal/api".to_string(),
        })
    }
}

impl EnaClient for EnaHttpClient {
    fn read_runs(&self, taxonomy_id: &str) -> Result<Vec<ReadRun>, LaunchpadError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("result", "read_run"),
                ("query", &format!("tax_tree({taxonomy_id})")),
                ("fields", READ_RUN_FIELDS),
                ("format", "json"),
            ])
            .send()
            .map_err(|err| LaunchpadError::EnaHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "ENA request failed".to_string());
            return Err(LaunchpadError::EnaStatus { status, message });
        }

        response
            .json::<Vec<ReadRun>>()
            .map_err(|err| LaunchpadError::EnaHttp(err.to_string()))
    }
}

/// Applies a workflow parameter's data requirements to a run list, keeping
/// only runs the picker should offer for that parameter.
pub fn filter_read_runs(
    runs: Vec<ReadRun>,
    requirements: &WorkflowDataRequirements,
) -> Vec<ReadRun> {
    runs.into_iter()
        .filter(|run| matches_requirements(run, requirements))
        .collect()
}

fn matches_requirements(run: &ReadRun, requirements: &WorkflowDataRequirements) -> bool {
    if let Some(layout) = &requirements.library_layout {
        let matched = run
            .library_layout
            .as_deref()
            .map(|value| value.eq_ignore_ascii_case(layout))
            .unwrap_or(false);
        if !matched {
            return false;
        }
    }
    if let Some(strategies) = &requirements.library_strategy {
        let matched = run
            .library_strategy
            .as_deref()
            .map(|value| {
                strategies
                    .iter()
                    .any(|strategy| strategy.eq_ignore_ascii_case(value))
            })
            .unwrap_or(false);
        if !matched {
            return false;
        }
    }
    if let Some(sources) = &requirements.library_source {
        let matched = run
            .library_source
            .as_deref()
            .map(|value| sources.iter().any(|source| source.eq_ignore_ascii_case(value)))
            .unwrap_or(false);
        if !matched {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(layout: &str, strategy: &str, source: &str) -> ReadRun {
        ReadRun {
            run_accession: "ERR000001".to_string(),
            fastq_ftp: String::new(),
            library_layout: Some(layout.to_string()),
            library_strategy: Some(strategy.to_string()),
            library_source: Some(source.to_string()),
        }
    }

    #[test]
    fn filter_by_layout_and_strategy() {
        let requirements = WorkflowDataRequirements {
            library_layout: Some("PAIRED".to_string()),
            library_strategy: Some(vec!["WGS".to_string(), "WXS".to_string()]),
            ..Default::default()
        };
        let runs = vec![
            run("PAIRED", "WGS", "GENOMIC"),
            run("SINGLE", "WGS", "GENOMIC"),
            run("PAIRED", "RNA-Seq", "TRANSCRIPTOMIC"),
        ];
        let kept = filter_read_runs(runs, &requirements);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].is_paired());
    }

    #[test]
    fn empty_requirements_keep_everything() {
        let runs = vec![run("PAIRED", "WGS", "GENOMIC")];
        let kept = filter_read_runs(runs.clone(), &WorkflowDataRequirements::default());
        assert_eq!(kept, runs);
    }
}

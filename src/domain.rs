use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LaunchpadError;

/// TRS id of the built-in "send data to a Galaxy history" workflow.
pub const SEND_DATA_TRS_ID: &str = "custom-workflow";

/// TRS id of the built-in differential expression (DESeq2) workflow.
pub const DIFFERENTIAL_EXPRESSION_TRS_ID: &str = "differential-expression-analysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowPloidy {
    Any,
    Haploid,
    Diploid,
    Polyploid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganismPloidy {
    Haploid,
    Diploid,
    Polyploid,
}

impl WorkflowPloidy {
    /// A workflow ploidy requirement is satisfied by an organism ploidy when
    /// it is `Any` or the two classifications are equal.
    pub fn matches(self, organism: OrganismPloidy) -> bool {
        match self {
            WorkflowPloidy::Any => true,
            WorkflowPloidy::Haploid => organism == OrganismPloidy::Haploid,
            WorkflowPloidy::Diploid => organism == OrganismPloidy::Diploid,
            WorkflowPloidy::Polyploid => organism == OrganismPloidy::Polyploid,
        }
    }
}

/// Tool Registry Service identifier of a workflow, as it appears in the
/// catalog (possibly starting with `#`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrsId(String);

impl TrsId {
    /// Id of a built-in workflow, from a known non-empty literal.
    pub(crate) fn builtin(id: &'static str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL-safe form used to key and address workflows: the leading `#` is
    /// stripped and every other non-alphanumeric character becomes `-`.
    pub fn slug(&self) -> String {
        self.0
            .strip_prefix('#')
            .unwrap_or(&self.0)
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
            .collect()
    }
}

impl fmt::Display for TrsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrsId {
    type Err = LaunchpadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LaunchpadError::InvalidTrsId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Genome assembly accession, e.g. `GCF_000005845.2`. The digit block must
/// hold at least nine digits so that the UCSC hub path convention applies.
/// Deserialization goes through the same validation as `FromStr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssemblyAccession(String);

impl TryFrom<String> for AssemblyAccession {
    type Error = LaunchpadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssemblyAccession> for String {
    fn from(accession: AssemblyAccession) -> Self {
        accession.0
    }
}

impl AssemblyAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accession prefix (`GCF`, `GCA`, ...) and the digit block with any
    /// trailing version suffix.
    pub fn split(&self) -> (&str, &str) {
        // FromStr guarantees the underscore is present.
        self.0
            .split_once('_')
            .expect("validated accession always contains an underscore")
    }
}

impl fmt::Display for AssemblyAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssemblyAccession {
    type Err = LaunchpadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = normalized
            .split_once('_')
            .map(|(prefix, rest)| {
                let digits: &str = rest.split('.').next().unwrap_or(rest);
                !prefix.is_empty()
                    && prefix.chars().all(|ch| ch.is_ascii_alphanumeric())
                    && digits.len() >= 9
                    && digits.chars().all(|ch| ch.is_ascii_digit())
            })
            .unwrap_or(false);
        if !is_valid {
            return Err(LaunchpadError::InvalidAssemblyAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Abstract role a workflow parameter plays; the launch request builder maps
/// each role to a concrete request value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowParameterVariable {
    AssemblyId,
    AssemblyFastaUrl,
    GeneModelUrl,
    SangerReadRunSingle,
    SangerReadRunPaired,
}

/// Hints used to pre-filter the sequencing-read picker for a parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDataRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_source: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_strategy: Option<Vec<String>>,
}

/// One declared workflow input. Exactly one of `url_spec` and `variable` is
/// expected to be set; `url_spec` is an opaque value passed through to the
/// launch request verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowParameter {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_spec: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<WorkflowParameterVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_requirements: Option<WorkflowDataRequirements>,
}

/// Closed set of workflow families with their own planning and
/// request-building behavior. Resolved once when the catalog is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkflowKind {
    #[default]
    Standard,
    SendData,
    DifferentialExpression,
}

impl WorkflowKind {
    pub fn from_trs_id(trs_id: &TrsId) -> Self {
        match trs_id.slug().as_str() {
            SEND_DATA_TRS_ID => WorkflowKind::SendData,
            DIFFERENTIAL_EXPRESSION_TRS_ID => WorkflowKind::DifferentialExpression,
            _ => WorkflowKind::Standard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub trs_id: TrsId,
    #[serde(default)]
    pub iwc_id: Option<String>,
    pub workflow_name: String,
    pub workflow_description: String,
    pub ploidy: WorkflowPloidy,
    #[serde(default)]
    pub taxonomy_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<WorkflowParameter>,
    #[serde(skip)]
    pub kind: WorkflowKind,
}

impl Workflow {
    pub fn resolve_kind(&mut self) {
        self.kind = WorkflowKind::from_trs_id(&self.trs_id);
    }

    pub fn declares(&self, variable: WorkflowParameterVariable) -> bool {
        self.parameters
            .iter()
            .any(|param| param.variable == Some(variable))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowCategory {
    pub category: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub show_coming_soon: bool,
    pub workflows: Vec<Workflow>,
}

/// Catalog record for one genome assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assembly {
    pub accession: String,
    pub ploidy: Vec<OrganismPloidy>,
    pub lineage_taxonomy_ids: Vec<String>,
    pub ncbi_taxonomy_id: String,
    #[serde(default)]
    pub gene_model_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn trs_id_slug_strips_hash_and_specials() {
        let id: TrsId = "#workflow/github.com/iwc/main".parse().unwrap();
        assert_eq!(id.slug(), "workflow-github-com-iwc-main");
        assert_eq!(id.as_str(), "#workflow/github.com/iwc/main");
    }

    #[test]
    fn trs_id_rejects_empty() {
        let err = "   ".parse::<TrsId>().unwrap_err();
        assert_matches!(err, LaunchpadError::InvalidTrsId(_));
    }

    #[test]
    fn accession_parse_valid() {
        let acc: AssemblyAccession = "GCF_000005845.2".parse().unwrap();
        assert_eq!(acc.split(), ("GCF", "000005845.2"));
    }

    #[test]
    fn accession_deserialization_validates() {
        let err = serde_json::from_str::<AssemblyAccession>("\"GCF123\"").unwrap_err();
        assert!(err.to_string().contains("invalid assembly accession"));
        let accession: AssemblyAccession = serde_json::from_str("\"GCF_000005845.2\"").unwrap();
        assert_eq!(accession.split(), ("GCF", "000005845.2"));
    }

    #[test]
    fn accession_parse_invalid() {
        let err = "GCF123".parse::<AssemblyAccession>().unwrap_err();
        assert_matches!(err, LaunchpadError::InvalidAssemblyAccession(_));
        let err = "GCF_12345".parse::<AssemblyAccession>().unwrap_err();
        assert_matches!(err, LaunchpadError::InvalidAssemblyAccession(_));
    }

    #[test]
    fn ploidy_matching() {
        assert!(WorkflowPloidy::Any.matches(OrganismPloidy::Polyploid));
        assert!(WorkflowPloidy::Diploid.matches(OrganismPloidy::Diploid));
        assert!(!WorkflowPloidy::Haploid.matches(OrganismPloidy::Diploid));
    }

    #[test]
    fn kind_resolution() {
        let send_data: TrsId = "custom-workflow".parse().unwrap();
        assert_eq!(WorkflowKind::from_trs_id(&send_data), WorkflowKind::SendData);
        let generic: TrsId = "#wf/variant-calling".parse().unwrap();
        assert_eq!(WorkflowKind::from_trs_id(&generic), WorkflowKind::Standard);
    }
}

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LaunchpadError {
    #[error("invalid TRS id: {0}")]
    InvalidTrsId(String),

    #[error("invalid assembly accession: {0}")]
    InvalidAssemblyAccession(String),

    #[error("catalog repository is not initialized")]
    CatalogUninitialized,

    #[error("workflow not found in catalog: {0}")]
    WorkflowNotFound(String),

    #[error("assembly not found in catalog: {0}")]
    AssemblyNotFound(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid Galaxy instance URL: {0}")]
    InvalidInstanceUrl(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("ENA request failed: {0}")]
    EnaHttp(String),

    #[error("ENA returned status {status}: {message}")]
    EnaStatus { status: u16, message: String },

    #[error("Galaxy request failed: {0}")]
    GalaxyHttp(String),

    #[error("Galaxy returned status {status}: {message}")]
    GalaxyStatus { status: u16, message: String },

    #[error("configuration is missing required field: {0}")]
    MissingField(&'static str),

    #[error("no recognized FASTQ URLs in read run field: {0}")]
    MalformedReadUrls(String),

    #[error("inconsistent run accessions in read run URLs: {expected} vs {found}")]
    InconsistentRunAccessions { expected: String, found: String },

    #[error("no URL for forward read found for run {0}")]
    MissingForwardRead(String),

    #[error("no URL for reverse read found for run {0}")]
    MissingReverseRead(String),

    #[error("sample sheet classification is missing a {0} column")]
    MissingSampleSheetColumn(&'static str),

    #[error("no stored workflow id configured for the differential expression workflow")]
    MissingStoredWorkflowId,

    #[error("launch response did not include a landing UUID")]
    MissingLandingUuid,

    #[error("a launch request is already in flight")]
    LaunchInFlight,
}

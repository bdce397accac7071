use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::configure::{ColumnType, ConfiguredInput, SampleSheetClassification, SampleSheetRow,
    Track};
use crate::domain::{AssemblyAccession, Workflow, WorkflowParameterVariable};
use crate::ena::ReadRun;
use crate::error::LaunchpadError;

pub const DOCKSTORE_API_URL: &str = "https://dockstore.org/api/ga4gh/trs/v2/tools";

/// Base of the UCSC genome hub mirror holding per-assembly FASTA files.
pub const UCSC_HUB_BASE_URL: &str = "https://hgdownload.soe.ucsc.edu/hubs/";

/// Flat parameter-key to value mapping sent as `request_state`.
pub type RequestState = BTreeMap<String, RequestValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestValue {
    Text(String),
    Url(UrlInput),
    Collection(CollectionInput),
    /// Verbatim `url_spec` passthrough from the workflow parameter.
    Opaque(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlInput {
    pub ext: String,
    pub src: &'static str,
    pub url: String,
}

impl UrlInput {
    pub fn new(ext: &str, url: String) -> Self {
        Self {
            ext: ext.to_string(),
            src: "url",
            url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionInput {
    pub class: &'static str,
    pub collection_type: String,
    pub name: String,
    pub elements: Vec<CollectionElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectionElement {
    Pair {
        class: &'static str,
        collection_type: &'static str,
        identifier: String,
        elements: Vec<FileElement>,
    },
    File(FileElement),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileElement {
    pub class: &'static str,
    pub identifier: String,
    pub location: String,
    pub filetype: String,
}

impl FileElement {
    fn fastq(identifier: &str, location: String) -> Self {
        Self {
            class: "File",
            identifier: identifier.to_string(),
            location,
            filetype: "fastqsanger.gz".to_string(),
        }
    }
}

/// Body of `POST /api/workflow_landings` for a standard workflow.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowLandingsBody {
    pub public: bool,
    pub request_state: RequestState,
    pub workflow_id: String,
    pub workflow_target_type: &'static str,
}

/// Derives the genome-hub FASTA URL for an assembly accession. The digit
/// block is split into three-digit directory segments, mirroring the hub's
/// layout: `GCF_012345678` maps to `GCF/012/345/678/GCF_012345678/...`.
pub fn build_fasta_url(reference_assembly: &str) -> Result<String, LaunchpadError> {
    let accession: AssemblyAccession = reference_assembly.parse()?;
    let (prefix, digits) = accession.split();
    Ok(format!(
        "{UCSC_HUB_BASE_URL}{prefix}/{}/{}/{}/{acc}/{acc}.fa.gz",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        acc = accession.as_str(),
    ))
}

/// Parsed mate URLs of one paired-end run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedRunUrls {
    pub run_accession: String,
    pub forward_url: String,
    pub reverse_url: String,
}

// Archive-generated FASTQ file names: run accession, mate index, fixed
// suffix. See the ENA docs on generated files and accession numbers.
static MATE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([EDS]RR\d{6,})_([12])\.fastq\.gz$").expect("valid regex"));

fn with_ftp_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("ftp://{url}")
    }
}

/// Splits a semicolon-delimited mate-URL field into forward and reverse
/// URLs. Exactly one distinct run accession must occur and both mates must
/// be present; anything else is a hard error rather than a dropped run.
pub fn parse_paired_run_urls(urls: &str) -> Result<PairedRunUrls, LaunchpadError> {
    let mut run_accession: Option<String> = None;
    let mut forward: Option<String> = None;
    let mut reverse: Option<String> = None;

    for url in urls.split(';').map(str::trim).filter(|url| !url.is_empty()) {
        let Some(captures) = MATE_URL_RE.captures(url) else {
            continue;
        };
        let accession = &captures[1];
        match &run_accession {
            None => run_accession = Some(accession.to_string()),
            Some(expected) if expected != accession => {
                return Err(LaunchpadError::InconsistentRunAccessions {
                    expected: expected.clone(),
                    found: accession.to_string(),
                });
            }
            Some(_) => {}
        }
        let location = with_ftp_scheme(url);
        match &captures[2] {
            "1" => forward = Some(location),
            _ => reverse = Some(location),
        }
    }

    let run_accession =
        run_accession.ok_or_else(|| LaunchpadError::MalformedReadUrls(urls.to_string()))?;
    let forward =
        forward.ok_or_else(|| LaunchpadError::MissingForwardRead(run_accession.clone()))?;
    let reverse =
        reverse.ok_or_else(|| LaunchpadError::MissingReverseRead(run_accession.clone()))?;
    Ok(PairedRunUrls {
        run_accession,
        forward_url: forward,
        reverse_url: reverse,
    })
}

/// Picks the forward URL out of a single-end run's URL field. A lone URL is
/// taken as-is; with several entries the `_1` mate wins.
pub fn parse_single_run_url(urls: &str) -> Result<String, LaunchpadError> {
    let entries: Vec<&str> = urls
        .split(';')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .collect();
    match entries.as_slice() {
        [] => Err(LaunchpadError::MalformedReadUrls(urls.to_string())),
        [only] => Ok(with_ftp_scheme(only)),
        entries => entries
            .iter()
            .find(|url| {
                MATE_URL_RE
                    .captures(url)
                    .map(|captures| &captures[2] == "1")
                    .unwrap_or(false)
            })
            .map(|url| with_ftp_scheme(url))
            .ok_or_else(|| LaunchpadError::MalformedReadUrls(urls.to_string())),
    }
}

fn build_paired_collection(runs: &[ReadRun]) -> Result<CollectionInput, LaunchpadError> {
    let mut elements = Vec::with_capacity(runs.len());
    for run in runs {
        let pair = parse_paired_run_urls(&run.fastq_ftp)?;
        elements.push(CollectionElement::Pair {
            class: "Collection",
            collection_type: "paired",
            identifier: pair.run_accession,
            elements: vec![
                FileElement::fastq("forward", pair.forward_url),
                FileElement::fastq("reverse", pair.reverse_url),
            ],
        });
    }
    Ok(CollectionInput {
        class: "Collection",
        collection_type: "list:paired".to_string(),
        name: "Paired End Reads".to_string(),
        elements,
    })
}

fn build_single_collection(runs: &[ReadRun]) -> Result<CollectionInput, LaunchpadError> {
    let mut elements = Vec::with_capacity(runs.len());
    for run in runs {
        let forward = parse_single_run_url(&run.fastq_ftp)?;
        elements.push(CollectionElement::File(FileElement::fastq(
            &run.run_accession,
            forward,
        )));
    }
    Ok(CollectionInput {
        class: "Collection",
        collection_type: "list".to_string(),
        name: "Single End Reads".to_string(),
        elements,
    })
}

fn reference_assembly(input: &ConfiguredInput) -> Result<&str, LaunchpadError> {
    input
        .reference_assembly
        .value()
        .map(String::as_str)
        .ok_or(LaunchpadError::MissingField("referenceAssembly"))
}

/// Maps one abstract parameter variable to its request value; `Ok(None)`
/// means the key is omitted from the request state entirely.
fn variable_to_request_value(
    variable: WorkflowParameterVariable,
    input: &ConfiguredInput,
) -> Result<Option<RequestValue>, LaunchpadError> {
    match variable {
        WorkflowParameterVariable::AssemblyId => Ok(Some(RequestValue::Text(
            reference_assembly(input)?.to_string(),
        ))),
        WorkflowParameterVariable::AssemblyFastaUrl => {
            let url = build_fasta_url(reference_assembly(input)?)?;
            Ok(Some(RequestValue::Url(UrlInput::new("fasta.gz", url))))
        }
        WorkflowParameterVariable::GeneModelUrl => Ok(input
            .gene_model_url
            .value()
            .filter(|url| !url.is_empty())
            .map(|url| RequestValue::Url(UrlInput::new("gtf.gz", url.clone())))),
        WorkflowParameterVariable::SangerReadRunSingle => match input.read_runs_single.value() {
            Some(runs) if !runs.is_empty() => Ok(Some(RequestValue::Collection(
                build_single_collection(runs)?,
            ))),
            _ => Ok(None),
        },
        WorkflowParameterVariable::SangerReadRunPaired => match input.read_runs_paired.value() {
            Some(runs) if !runs.is_empty() => Ok(Some(RequestValue::Collection(
                build_paired_collection(runs)?,
            ))),
            _ => Ok(None),
        },
    }
}

/// Builds the flat request state for a standard workflow: `url_spec` values
/// are copied verbatim, variables are resolved against the configuration,
/// and absent values omit their key rather than writing a null.
pub fn build_request_state(
    workflow: &Workflow,
    input: &ConfiguredInput,
) -> Result<RequestState, LaunchpadError> {
    let mut state = RequestState::new();
    for parameter in &workflow.parameters {
        if let Some(url_spec) = &parameter.url_spec {
            state.insert(parameter.key.clone(), RequestValue::Opaque(url_spec.clone()));
        } else if let Some(variable) = parameter.variable {
            if let Some(value) = variable_to_request_value(variable, input)? {
                state.insert(parameter.key.clone(), value);
            }
        }
    }
    Ok(state)
}

/// Assembles the full workflow-landings body for a standard workflow.
pub fn build_workflow_landings_body(
    workflow: &Workflow,
    input: &ConfiguredInput,
) -> Result<WorkflowLandingsBody, LaunchpadError> {
    Ok(WorkflowLandingsBody {
        public: true,
        request_state: build_request_state(workflow, input)?,
        workflow_id: format!("{DOCKSTORE_API_URL}/{}", workflow.trs_id),
        workflow_target_type: "trs_url",
    })
}

// ---------------------------------------------------------------------------
// Send-data workflow: a differently shaped payload for the data-landings
// endpoint, assembling reference, gene model, reads and tracks as targets.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DataLandingsBody {
    pub public: bool,
    pub request_state: DataLandingsRequestState,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataLandingsRequestState {
    pub targets: Vec<DataTarget>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Destination {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DataTarget {
    Datasets {
        destination: Destination,
        elements: Vec<UrlElement>,
    },
    Collection {
        destination: Destination,
        collection_type: String,
        name: String,
        elements: Vec<DataCollectionElement>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct UrlElement {
    pub ext: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Vec<Hash>>,
    pub name: String,
    pub src: &'static str,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hash {
    pub hash_function: &'static str,
    pub hash_value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DataCollectionElement {
    Pair {
        collection_type: &'static str,
        name: String,
        elements: Vec<UrlElement>,
    },
    File(UrlElement),
}

impl UrlElement {
    fn new(ext: &str, name: &str, url: String) -> Self {
        Self {
            ext: ext.to_string(),
            hashes: None,
            name: name.to_string(),
            src: "url",
            url,
        }
    }
}

fn track_ext(big_data_url: &str) -> &'static str {
    if big_data_url.ends_with(".bb") {
        "bigbed"
    } else if big_data_url.ends_with(".bw") {
        "bigwig"
    } else {
        "auto"
    }
}

fn dataset_target(elements: Vec<UrlElement>) -> Option<DataTarget> {
    if elements.is_empty() {
        return None;
    }
    Some(DataTarget::Datasets {
        destination: Destination { kind: "hdas" },
        elements,
    })
}

/// Builds the data-landings body for the send-data workflow. Only the
/// reference assembly is required; every other configured input contributes
/// a target when present.
pub fn build_send_data_body(input: &ConfiguredInput) -> Result<DataLandingsBody, LaunchpadError> {
    let assembly = reference_assembly(input)?;
    let mut targets = Vec::new();

    let fasta_url = build_fasta_url(assembly)?;
    targets.extend(dataset_target(vec![UrlElement::new(
        "fasta.gz", assembly, fasta_url,
    )]));

    if let Some(url) = input.gene_model_url.value().filter(|url| !url.is_empty()) {
        targets.extend(dataset_target(vec![UrlElement::new(
            "gtf.gz",
            assembly,
            url.clone(),
        )]));
    }

    if let Some(runs) = input.read_runs_single.value().filter(|runs| !runs.is_empty()) {
        let mut elements = Vec::with_capacity(runs.len());
        for run in runs {
            let forward = parse_single_run_url(&run.fastq_ftp)?;
            elements.push(DataCollectionElement::File(UrlElement::new(
                "fastqsanger.gz",
                &run.run_accession,
                forward,
            )));
        }
        targets.push(DataTarget::Collection {
            destination: Destination { kind: "hdca" },
            collection_type: "list".to_string(),
            name: "Single End Reads".to_string(),
            elements,
        });
    }

    if let Some(runs) = input.read_runs_paired.value().filter(|runs| !runs.is_empty()) {
        let mut elements = Vec::with_capacity(runs.len());
        for run in runs {
            let pair = parse_paired_run_urls(&run.fastq_ftp)?;
            elements.push(DataCollectionElement::Pair {
                collection_type: "paired",
                name: pair.run_accession,
                elements: vec![
                    UrlElement::new("fastqsanger.gz", "forward", pair.forward_url),
                    UrlElement::new("fastqsanger.gz", "reverse", pair.reverse_url),
                ],
            });
        }
        targets.push(DataTarget::Collection {
            destination: Destination { kind: "hdca" },
            collection_type: "list:paired".to_string(),
            name: "Paired End Reads".to_string(),
            elements,
        });
    }

    if let Some(tracks) = input.tracks.value() {
        for track in tracks {
            let mut element = UrlElement::new(
                track_ext(&track.big_data_url),
                &track.short_label,
                track.big_data_url.clone(),
            );
            element.hashes = track.md5_hash.as_ref().map(|md5| {
                vec![Hash {
                    hash_function: "MD5",
                    hash_value: md5.clone(),
                }]
            });
            targets.extend(dataset_target(vec![element]));
        }
    }

    Ok(DataLandingsBody {
        public: true,
        request_state: DataLandingsRequestState { targets },
    })
}

// ---------------------------------------------------------------------------
// Differential expression workflow: fixed-key request state addressed to a
// stored Galaxy workflow, with the sample sheet as a typed collection.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DifferentialExpressionBody {
    pub public: bool,
    pub request_state: DifferentialExpressionRequestState,
    pub workflow_id: String,
    pub workflow_target_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DifferentialExpressionRequestState {
    #[serde(rename = "DESeq2 Design Formula")]
    pub design_formula: String,
    #[serde(rename = "Generate additional QC reports")]
    pub qc_reports: bool,
    #[serde(rename = "GTF File of annotation")]
    pub gene_model: AnnotationFile,
    #[serde(rename = "Primary Contrasts", skip_serializing_if = "Option::is_none")]
    pub primary_contrasts: Option<Vec<String>>,
    #[serde(rename = "Reference genome")]
    pub reference_genome: String,
    #[serde(rename = "Sample sheet of sequencing reads")]
    pub sample_sheet: SampleSheetCollection,
    #[serde(rename = "Use featurecounts for generating count tables")]
    pub use_featurecounts: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotationFile {
    pub class: &'static str,
    pub ext: &'static str,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleSheetCollection {
    pub class: &'static str,
    pub collection_type: &'static str,
    pub column_definitions: Vec<ColumnDefinition>,
    pub elements: Vec<PairedSample>,
    pub name: &'static str,
    pub rows: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub optional: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairedSample {
    pub class: &'static str,
    pub collection_type: &'static str,
    pub elements: Vec<SampleFile>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleFile {
    pub class: &'static str,
    pub ext: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Vec<Hash>>,
    pub location: String,
    pub name: &'static str,
}

fn find_column(
    classification: &SampleSheetClassification,
    kind: ColumnType,
) -> Option<&str> {
    classification
        .iter()
        .find(|(_, value)| **value == Some(kind))
        .map(|(name, _)| name.as_str())
}

fn is_metadata_column(kind: ColumnType) -> bool {
    matches!(
        kind,
        ColumnType::BiologicalFactor
            | ColumnType::TechnicalBlockingFactor
            | ColumnType::OtherCovariate
            | ColumnType::QcOnly
    )
}

fn build_column_definitions(classification: &SampleSheetClassification) -> Vec<ColumnDefinition> {
    classification
        .iter()
        .filter_map(|(name, kind)| {
            let kind = (*kind)?;
            is_metadata_column(kind).then(|| ColumnDefinition {
                name: name.clone(),
                optional: kind == ColumnType::QcOnly,
                kind: "string",
            })
        })
        .collect()
}

fn build_sample_elements(
    sheet: &[SampleSheetRow],
    classification: &SampleSheetClassification,
) -> Result<Vec<PairedSample>, LaunchpadError> {
    let identifier_column = find_column(classification, ColumnType::Identifier)
        .ok_or(LaunchpadError::MissingSampleSheetColumn("IDENTIFIER"))?;
    let forward_column = find_column(classification, ColumnType::ForwardFileUrl)
        .ok_or(LaunchpadError::MissingSampleSheetColumn("FORWARD_FILE_URL"))?;
    let reverse_column = find_column(classification, ColumnType::ReverseFileUrl)
        .ok_or(LaunchpadError::MissingSampleSheetColumn("REVERSE_FILE_URL"))?;
    let forward_md5_column = find_column(classification, ColumnType::ForwardFileMd5);
    let reverse_md5_column = find_column(classification, ColumnType::ReverseFileMd5);

    let cell = |row: &SampleSheetRow, column: &str| -> String {
        row.get(column).cloned().unwrap_or_default()
    };
    let md5_hashes = |row: &SampleSheetRow, column: Option<&str>| -> Option<Vec<Hash>> {
        column
            .map(|column| cell(row, column))
            .filter(|value| !value.is_empty())
            .map(|value| {
                vec![Hash {
                    hash_function: "MD5",
                    hash_value: value,
                }]
            })
    };

    Ok(sheet
        .iter()
        .map(|row| PairedSample {
            class: "Collection",
            collection_type: "paired",
            elements: vec![
                SampleFile {
                    class: "File",
                    ext: "fastqsanger.gz",
                    hashes: md5_hashes(row, forward_md5_column),
                    location: cell(row, forward_column),
                    name: "forward",
                },
                SampleFile {
                    class: "File",
                    ext: "fastqsanger.gz",
                    hashes: md5_hashes(row, reverse_md5_column),
                    location: cell(row, reverse_column),
                    name: "reverse",
                },
            ],
            name: cell(row, identifier_column),
        })
        .collect())
}

fn build_rows(
    sheet: &[SampleSheetRow],
    classification: &SampleSheetClassification,
    definitions: &[ColumnDefinition],
) -> Result<BTreeMap<String, Vec<String>>, LaunchpadError> {
    let identifier_column = find_column(classification, ColumnType::Identifier)
        .ok_or(LaunchpadError::MissingSampleSheetColumn("IDENTIFIER"))?;

    let mut rows = BTreeMap::new();
    for row in sheet {
        let identifier = row.get(identifier_column).cloned().unwrap_or_default();
        let values = definitions
            .iter()
            .map(|definition| row.get(&definition.name).cloned().unwrap_or_default())
            .collect();
        rows.insert(identifier, values);
    }
    Ok(rows)
}

fn build_sample_sheet_collection(
    sheet: &[SampleSheetRow],
    classification: &SampleSheetClassification,
) -> Result<SampleSheetCollection, LaunchpadError> {
    let column_definitions = build_column_definitions(classification);
    let elements = build_sample_elements(sheet, classification)?;
    let rows = build_rows(sheet, classification, &column_definitions)?;
    Ok(SampleSheetCollection {
        class: "Collection",
        collection_type: "sample_sheet:paired",
        column_definitions,
        elements,
        name: "Sample Sheet",
        rows,
    })
}

/// Builds the launch body for the differential expression workflow. Every
/// required field is checked before any network call so a half-configured
/// session fails with a field name rather than an API error.
pub fn build_differential_expression_body(
    stored_workflow_id: &str,
    input: &ConfiguredInput,
) -> Result<DifferentialExpressionBody, LaunchpadError> {
    let reference_genome = reference_assembly(input)?.to_string();
    let gene_model_url = input
        .gene_model_url
        .value()
        .filter(|url| !url.is_empty())
        .ok_or(LaunchpadError::MissingField("geneModelUrl"))?;
    let sheet = input
        .sample_sheet
        .value()
        .ok_or(LaunchpadError::MissingField("sampleSheet"))?;
    let classification = input
        .sample_sheet_classification
        .value()
        .ok_or(LaunchpadError::MissingField("sampleSheetClassification"))?;
    let design_formula = input
        .design_formula
        .value()
        .ok_or(LaunchpadError::MissingField("designFormula"))?;

    let primary_contrasts = input
        .primary_contrasts
        .value()
        .filter(|contrasts| !contrasts.is_empty())
        .cloned();

    Ok(DifferentialExpressionBody {
        public: true,
        request_state: DifferentialExpressionRequestState {
            design_formula: design_formula.clone(),
            qc_reports: true,
            gene_model: AnnotationFile {
                class: "File",
                ext: "gtf.gz",
                url: gene_model_url.clone(),
            },
            primary_contrasts,
            reference_genome,
            sample_sheet: build_sample_sheet_collection(sheet, classification)?,
            use_featurecounts: true,
        },
        workflow_id: stored_workflow_id.to_string(),
        workflow_target_type: "stored_workflow",
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::configure::{ConfiguredPatch, Setting};
    use crate::domain::{TrsId, WorkflowKind, WorkflowParameter, WorkflowPloidy};

    fn paired_run(accession: &str, urls: &str) -> ReadRun {
        ReadRun {
            run_accession: accession.to_string(),
            fastq_ftp: urls.to_string(),
            library_layout: Some("PAIRED".to_string()),
            library_strategy: None,
            library_source: None,
        }
    }

    fn workflow(parameters: Vec<WorkflowParameter>) -> Workflow {
        Workflow {
            trs_id: "#wf/variant-calling/main".parse::<TrsId>().unwrap(),
            iwc_id: None,
            workflow_name: "Test".to_string(),
            workflow_description: String::new(),
            ploidy: WorkflowPloidy::Any,
            taxonomy_id: None,
            parameters,
            kind: WorkflowKind::Standard,
        }
    }

    fn variable_parameter(key: &str, variable: WorkflowParameterVariable) -> WorkflowParameter {
        WorkflowParameter {
            key: key.to_string(),
            url_spec: None,
            variable: Some(variable),
            data_requirements: None,
        }
    }

    #[test]
    fn fasta_url_follows_hub_convention() {
        let url = build_fasta_url("GCF_012345678").unwrap();
        assert_eq!(
            url,
            "https://hgdownload.soe.ucsc.edu/hubs/GCF/012/345/678/GCF_012345678/GCF_012345678.fa.gz"
        );
    }

    #[test]
    fn fasta_url_keeps_version_suffix_in_leaf() {
        let url = build_fasta_url("GCA_000001405.15").unwrap();
        assert_eq!(
            url,
            "https://hgdownload.soe.ucsc.edu/hubs/GCA/000/001/405/GCA_000001405.15/GCA_000001405.15.fa.gz"
        );
    }

    #[test]
    fn paired_urls_parse_into_forward_and_reverse() {
        let parsed = parse_paired_run_urls(
            "ftp.sra.ebi.ac.uk/vol1/fastq/ERR123/ERR123456/ERR123456_1.fastq.gz;\
             ftp.sra.ebi.ac.uk/vol1/fastq/ERR123/ERR123456/ERR123456_2.fastq.gz",
        )
        .unwrap();
        assert_eq!(parsed.run_accession, "ERR123456");
        assert!(parsed.forward_url.starts_with("ftp://"));
        assert!(parsed.forward_url.ends_with("_1.fastq.gz"));
        assert!(parsed.reverse_url.starts_with("ftp://"));
        assert!(parsed.reverse_url.ends_with("_2.fastq.gz"));
    }

    #[test]
    fn paired_urls_reject_mixed_accessions() {
        let err = parse_paired_run_urls(
            "host/a/ERR000001_1.fastq.gz;host/b/ERR000002_2.fastq.gz",
        )
        .unwrap_err();
        assert_matches!(err, LaunchpadError::InconsistentRunAccessions { .. });
    }

    #[test]
    fn paired_urls_require_both_mates() {
        let err = parse_paired_run_urls("host/a/ERR000001_1.fastq.gz").unwrap_err();
        assert_matches!(err, LaunchpadError::MissingReverseRead(_));
        let err = parse_paired_run_urls("host/a/ERR000001_2.fastq.gz").unwrap_err();
        assert_matches!(err, LaunchpadError::MissingForwardRead(_));
    }

    #[test]
    fn unrecognized_urls_are_malformed() {
        let err = parse_paired_run_urls("host/a/reads.bam").unwrap_err();
        assert_matches!(err, LaunchpadError::MalformedReadUrls(_));
    }

    #[test]
    fn single_run_url_prefers_forward_mate() {
        let url = parse_single_run_url(
            "host/a/ERR000001_2.fastq.gz;host/a/ERR000001_1.fastq.gz",
        )
        .unwrap();
        assert_eq!(url, "ftp://host/a/ERR000001_1.fastq.gz");
        let lone = parse_single_run_url("host/a/ERR000001.fastq.gz").unwrap();
        assert_eq!(lone, "ftp://host/a/ERR000001.fastq.gz");
    }

    #[test]
    fn request_state_includes_assembly_and_omits_skipped_gene_model() {
        let workflow = workflow(vec![
            variable_parameter("Assembly", WorkflowParameterVariable::AssemblyId),
            variable_parameter("Annotation GTF", WorkflowParameterVariable::GeneModelUrl),
        ]);
        let mut input = ConfiguredInput::default();
        input.merge(ConfiguredPatch {
            reference_assembly: Some(Setting::Value("GCF_000005845.2".to_string())),
            gene_model_url: Some(Setting::Skipped),
            ..Default::default()
        });

        let state = build_request_state(&workflow, &input).unwrap();
        assert_eq!(
            state.get("Assembly"),
            Some(&RequestValue::Text("GCF_000005845.2".to_string()))
        );
        assert!(!state.contains_key("Annotation GTF"));
    }

    #[test]
    fn request_state_copies_url_spec_verbatim() {
        let spec = serde_json::json!({"ext": "bed", "src": "url", "url": "https://x/y.bed"});
        let workflow = workflow(vec![WorkflowParameter {
            key: "Regions".to_string(),
            url_spec: Some(spec.clone()),
            variable: None,
            data_requirements: None,
        }]);
        let state = build_request_state(&workflow, &ConfiguredInput::default()).unwrap();
        assert_eq!(state.get("Regions"), Some(&RequestValue::Opaque(spec)));
    }

    #[test]
    fn request_state_builds_paired_collection() {
        let workflow = workflow(vec![variable_parameter(
            "Paired Reads",
            WorkflowParameterVariable::SangerReadRunPaired,
        )]);
        let mut input = ConfiguredInput::default();
        input.merge(ConfiguredPatch {
            read_runs_paired: Some(Setting::Value(vec![paired_run(
                "ERR123456",
                "host/ERR123456_1.fastq.gz;host/ERR123456_2.fastq.gz",
            )])),
            ..Default::default()
        });

        let state = build_request_state(&workflow, &input).unwrap();
        let value = serde_json::to_value(state.get("Paired Reads").unwrap()).unwrap();
        assert_eq!(value["class"], "Collection");
        assert_eq!(value["collection_type"], "list:paired");
        assert_eq!(value["elements"][0]["identifier"], "ERR123456");
        assert_eq!(value["elements"][0]["elements"][0]["identifier"], "forward");
        assert_eq!(
            value["elements"][0]["elements"][1]["location"],
            "ftp://host/ERR123456_2.fastq.gz"
        );
    }

    #[test]
    fn workflow_landings_body_addresses_dockstore() {
        let workflow = workflow(vec![variable_parameter(
            "Assembly",
            WorkflowParameterVariable::AssemblyId,
        )]);
        let mut input = ConfiguredInput::default();
        input.merge(ConfiguredPatch {
            reference_assembly: Some(Setting::Value("GCF_000005845.2".to_string())),
            ..Default::default()
        });

        let body = build_workflow_landings_body(&workflow, &input).unwrap();
        assert!(body.public);
        assert_eq!(body.workflow_target_type, "trs_url");
        assert_eq!(
            body.workflow_id,
            format!("{DOCKSTORE_API_URL}/#wf/variant-calling/main")
        );
    }

    #[test]
    fn send_data_body_collects_targets() {
        let mut input = ConfiguredInput::default();
        input.merge(ConfiguredPatch {
            reference_assembly: Some(Setting::Value("GCF_012345678".to_string())),
            gene_model_url: Some(Setting::Value("https://x/genes.gtf.gz".to_string())),
            tracks: Some(Setting::Value(vec![Track {
                short_label: "Repeats".to_string(),
                big_data_url: "https://x/repeats.bb".to_string(),
                md5_hash: None,
            }])),
            ..Default::default()
        });

        let body = build_send_data_body(&input).unwrap();
        let value = serde_json::to_value(&body).unwrap();
        let targets = value["request_state"]["targets"].as_array().unwrap();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0]["destination"]["type"], "hdas");
        assert_eq!(targets[0]["elements"][0]["ext"], "fasta.gz");
        assert_eq!(targets[2]["elements"][0]["ext"], "bigbed");
    }

    #[test]
    fn differential_expression_body_requires_design_formula() {
        let mut input = ConfiguredInput::default();
        input.merge(ConfiguredPatch {
            reference_assembly: Some(Setting::Value("GCF_000005845.2".to_string())),
            gene_model_url: Some(Setting::Value("https://x/genes.gtf.gz".to_string())),
            sample_sheet: Some(Setting::Value(Vec::new())),
            sample_sheet_classification: Some(Setting::Value(BTreeMap::new())),
            ..Default::default()
        });
        let err = build_differential_expression_body("wf-id", &input).unwrap_err();
        assert_matches!(err, LaunchpadError::MissingField("designFormula"));
    }

    #[test]
    fn differential_expression_body_builds_sample_sheet() {
        let mut classification = SampleSheetClassification::new();
        classification.insert("sample".to_string(), Some(ColumnType::Identifier));
        classification.insert("fastq_1".to_string(), Some(ColumnType::ForwardFileUrl));
        classification.insert("fastq_2".to_string(), Some(ColumnType::ReverseFileUrl));
        classification.insert("condition".to_string(), Some(ColumnType::BiologicalFactor));
        classification.insert("batch".to_string(), Some(ColumnType::QcOnly));
        classification.insert("notes".to_string(), None);

        let mut row = SampleSheetRow::new();
        row.insert("sample".to_string(), "s1".to_string());
        row.insert("fastq_1".to_string(), "ftp://host/s1_1.fastq.gz".to_string());
        row.insert("fastq_2".to_string(), "ftp://host/s1_2.fastq.gz".to_string());
        row.insert("condition".to_string(), "treated".to_string());
        row.insert("batch".to_string(), "b1".to_string());

        let mut input = ConfiguredInput::default();
        input.merge(ConfiguredPatch {
            reference_assembly: Some(Setting::Value("GCF_000005845.2".to_string())),
            gene_model_url: Some(Setting::Value("https://x/genes.gtf.gz".to_string())),
            sample_sheet: Some(Setting::Value(vec![row])),
            sample_sheet_classification: Some(Setting::Value(classification)),
            design_formula: Some(Setting::Value("~condition".to_string())),
            ..Default::default()
        });

        let body = build_differential_expression_body("wf-id", &input).unwrap();
        assert_eq!(body.workflow_target_type, "stored_workflow");
        let sheet = &body.request_state.sample_sheet;
        // Metadata columns only; the QC-only column is optional.
        assert_eq!(sheet.column_definitions.len(), 2);
        assert!(
            sheet
                .column_definitions
                .iter()
                .any(|definition| definition.name == "batch" && definition.optional)
        );
        assert_eq!(sheet.elements.len(), 1);
        assert_eq!(sheet.elements[0].name, "s1");
        assert_eq!(sheet.rows["s1"], vec!["b1".to_string(), "treated".to_string()]);
    }

    #[test]
    fn differential_expression_classification_must_name_identifier() {
        let mut input = ConfiguredInput::default();
        input.merge(ConfiguredPatch {
            reference_assembly: Some(Setting::Value("GCF_000005845.2".to_string())),
            gene_model_url: Some(Setting::Value("https://x/genes.gtf.gz".to_string())),
            sample_sheet: Some(Setting::Value(Vec::new())),
            sample_sheet_classification: Some(Setting::Value(BTreeMap::new())),
            design_formula: Some(Setting::Value("~condition".to_string())),
            ..Default::default()
        });
        let err = build_differential_expression_body("wf-id", &input).unwrap_err();
        assert_matches!(err, LaunchpadError::MissingSampleSheetColumn("IDENTIFIER"));
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info};

use crate::domain::{
    Assembly, DIFFERENTIAL_EXPRESSION_TRS_ID, SEND_DATA_TRS_ID, TrsId, Workflow, WorkflowCategory,
    WorkflowKind, WorkflowPloidy,
};
use crate::error::LaunchpadError;

/// Read-only provider of the two catalog collections.
pub trait CatalogSource: Send + Sync {
    fn workflow_categories(&self) -> Result<Vec<WorkflowCategory>, LaunchpadError>;
    fn assemblies(&self) -> Result<Vec<Assembly>, LaunchpadError>;
}

/// Catalog source reading `workflows.json` and `assemblies.json` from a
/// directory, the layout produced by the portal's catalog build.
pub struct CatalogFileSource {
    dir: PathBuf,
}

impl CatalogFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T, LaunchpadError> {
        let path = self.dir.join(name);
        let content =
            fs::read_to_string(&path).map_err(|_| LaunchpadError::ConfigRead(path.clone()))?;
        serde_json::from_str(&content)
            .map_err(|err| LaunchpadError::ConfigParse(format!("{}: {err}", path.display())))
    }
}

impl CatalogSource for CatalogFileSource {
    fn workflow_categories(&self) -> Result<Vec<WorkflowCategory>, LaunchpadError> {
        self.read("workflows.json")
    }

    fn assemblies(&self) -> Result<Vec<Assembly>, LaunchpadError> {
        self.read("assemblies.json")
    }
}

/// Catalog source fetching the same two collections over HTTP.
pub struct CatalogHttpSource {
    client: Client,
    base_url: String,
}

impl CatalogHttpSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, LaunchpadError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("galaxy-launchpad/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LaunchpadError::CatalogHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| LaunchpadError::CatalogHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn fetch<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T, LaunchpadError> {
        let url = format!("{}/{name}", self.base_url);
        debug!(%url, "fetching catalog collection");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| LaunchpadError::CatalogHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "catalog request failed".to_string());
            return Err(LaunchpadError::CatalogStatus { status, message });
        }

        response
            .json::<T>()
            .map_err(|err| LaunchpadError::CatalogHttp(err.to_string()))
    }
}

impl CatalogSource for CatalogHttpSource {
    fn workflow_categories(&self) -> Result<Vec<WorkflowCategory>, LaunchpadError> {
        self.fetch("workflows.json")
    }

    fn assemblies(&self) -> Result<Vec<Assembly>, LaunchpadError> {
        self.fetch("assemblies.json")
    }
}

struct CatalogData {
    categories: Vec<WorkflowCategory>,
    assemblies: Vec<Assembly>,
    workflows_by_slug: BTreeMap<String, Workflow>,
}

/// Holds the loaded catalog and answers lookups. Explicitly initialized from
/// a [`CatalogSource`] rather than read from module-level state, so tests and
/// callers control exactly what is loaded and when.
#[derive(Default)]
pub struct CatalogRepository {
    data: Option<CatalogData>,
}

impl CatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads both collections, resolves each workflow's kind, and registers
    /// the two built-in workflows under their fixed ids. Replaces any
    /// previously loaded catalog.
    pub fn init(&mut self, source: &dyn CatalogSource) -> Result<(), LaunchpadError> {
        let mut categories = source.workflow_categories()?;
        let assemblies = source.assemblies()?;

        let mut workflows_by_slug = BTreeMap::new();
        for category in &mut categories {
            for workflow in &mut category.workflows {
                workflow.resolve_kind();
                workflows_by_slug.insert(workflow.trs_id.slug(), workflow.clone());
            }
        }
        for workflow in builtin_workflows() {
            workflows_by_slug
                .entry(workflow.trs_id.slug())
                .or_insert(workflow);
        }

        info!(
            categories = categories.len(),
            workflows = workflows_by_slug.len(),
            assemblies = assemblies.len(),
            "catalog loaded"
        );
        self.data = Some(CatalogData {
            categories,
            assemblies,
            workflows_by_slug,
        });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.data.is_some()
    }

    fn data(&self) -> Result<&CatalogData, LaunchpadError> {
        self.data.as_ref().ok_or(LaunchpadError::CatalogUninitialized)
    }

    pub fn categories(&self) -> Result<&[WorkflowCategory], LaunchpadError> {
        Ok(&self.data()?.categories)
    }

    pub fn assemblies(&self) -> Result<&[Assembly], LaunchpadError> {
        Ok(&self.data()?.assemblies)
    }

    /// Looks a workflow up by raw TRS id or by its slug.
    pub fn workflow(&self, id: &str) -> Result<&Workflow, LaunchpadError> {
        let data = self.data()?;
        let slug = id
            .parse::<TrsId>()
            .map(|trs_id| trs_id.slug())
            .unwrap_or_default();
        data.workflows_by_slug
            .get(&slug)
            .ok_or_else(|| LaunchpadError::WorkflowNotFound(id.to_string()))
    }

    pub fn assembly(&self, accession: &str) -> Result<&Assembly, LaunchpadError> {
        self.data()?
            .assemblies
            .iter()
            .find(|assembly| assembly.accession == accession)
            .ok_or_else(|| LaunchpadError::AssemblyNotFound(accession.to_string()))
    }
}

/// The two workflows that exist independently of the catalog JSON: sending
/// data to a Galaxy history, and the differential expression analysis.
fn builtin_workflows() -> Vec<Workflow> {
    let mut send_data = Workflow {
        trs_id: TrsId::builtin(SEND_DATA_TRS_ID),
        iwc_id: None,
        workflow_name: "Send data to Galaxy".to_string(),
        workflow_description: "Send genome data to a new Galaxy history without running an \
                               analysis."
            .to_string(),
        ploidy: WorkflowPloidy::Any,
        taxonomy_id: None,
        parameters: Vec::new(),
        kind: WorkflowKind::Standard,
    };
    send_data.resolve_kind();

    let mut differential_expression = Workflow {
        trs_id: TrsId::builtin(DIFFERENTIAL_EXPRESSION_TRS_ID),
        iwc_id: None,
        workflow_name: "Differential expression analysis".to_string(),
        workflow_description: "DESeq2 differential expression from a sample sheet of paired \
                               sequencing reads."
            .to_string(),
        ploidy: WorkflowPloidy::Any,
        taxonomy_id: None,
        parameters: Vec::new(),
        kind: WorkflowKind::Standard,
    };
    differential_expression.resolve_kind();

    vec![send_data, differential_expression]
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::domain::OrganismPloidy;

    struct FakeSource;

    impl CatalogSource for FakeSource {
        fn workflow_categories(&self) -> Result<Vec<WorkflowCategory>, LaunchpadError> {
            Ok(vec![WorkflowCategory {
                category: "variant-calling".to_string(),
                name: "Variant calling".to_string(),
                description: String::new(),
                show_coming_soon: false,
                workflows: vec![Workflow {
                    trs_id: "#workflow/github.com/iwc/main".parse().unwrap(),
                    iwc_id: None,
                    workflow_name: "Variant calling".to_string(),
                    workflow_description: String::new(),
                    ploidy: WorkflowPloidy::Any,
                    taxonomy_id: None,
                    parameters: Vec::new(),
                    kind: WorkflowKind::Standard,
                }],
            }])
        }

        fn assemblies(&self) -> Result<Vec<Assembly>, LaunchpadError> {
            Ok(vec![Assembly {
                accession: "GCF_000005845.2".to_string(),
                ploidy: vec![OrganismPloidy::Haploid],
                lineage_taxonomy_ids: vec!["2".to_string(), "562".to_string()],
                ncbi_taxonomy_id: "562".to_string(),
                gene_model_url: None,
            }])
        }
    }

    #[test]
    fn uninitialized_repository_rejects_lookups() {
        let repository = CatalogRepository::new();
        assert_matches!(
            repository.workflow("anything").unwrap_err(),
            LaunchpadError::CatalogUninitialized
        );
    }

    #[test]
    fn workflow_lookup_accepts_raw_id_and_slug() {
        let mut repository = CatalogRepository::new();
        repository.init(&FakeSource).unwrap();

        let by_raw = repository.workflow("#workflow/github.com/iwc/main").unwrap();
        let by_slug = repository.workflow("workflow-github-com-iwc-main").unwrap();
        assert_eq!(by_raw.trs_id, by_slug.trs_id);
    }

    #[test]
    fn init_registers_builtin_workflows_with_resolved_kinds() {
        let mut repository = CatalogRepository::new();
        repository.init(&FakeSource).unwrap();

        let send_data = repository.workflow(SEND_DATA_TRS_ID).unwrap();
        assert_eq!(send_data.kind, WorkflowKind::SendData);
        let deseq = repository.workflow(DIFFERENTIAL_EXPRESSION_TRS_ID).unwrap();
        assert_eq!(deseq.kind, WorkflowKind::DifferentialExpression);
    }

    #[test]
    fn clear_resets_to_uninitialized() {
        let mut repository = CatalogRepository::new();
        repository.init(&FakeSource).unwrap();
        assert!(repository.is_initialized());

        repository.clear();
        assert!(!repository.is_initialized());
        assert_matches!(
            repository.assembly("GCF_000005845.2").unwrap_err(),
            LaunchpadError::CatalogUninitialized
        );
    }

    #[test]
    fn assembly_lookup_by_accession() {
        let mut repository = CatalogRepository::new();
        repository.init(&FakeSource).unwrap();

        let assembly = repository.assembly("GCF_000005845.2").unwrap();
        assert_eq!(assembly.ncbi_taxonomy_id, "562");
        assert_matches!(
            repository.assembly("GCF_999999999").unwrap_err(),
            LaunchpadError::AssemblyNotFound(_)
        );
    }
}

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::GalaxyEnvironment;
use crate::configure::ConfiguredInput;
use crate::domain::{Workflow, WorkflowKind, WorkflowParameterVariable};
use crate::error::LaunchpadError;
use crate::request::{
    build_differential_expression_body, build_send_data_body, build_workflow_landings_body,
};

/// Creates a landing record on the Galaxy instance and returns its UUID.
pub trait LandingClient: Send + Sync {
    fn create_landing(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<String, LaunchpadError>;
}

pub struct GalaxyHttpClient {
    client: Client,
}

#[derive(Deserialize)]
struct LandingResponse {
    #[serde(default)]
    uuid: Option<String>,
}

impl GalaxyHttpClient {
    pub fn new() -> Result<Self, LaunchpadError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("galaxy-launchpad/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LaunchpadError::GalaxyHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| LaunchpadError::GalaxyHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, LaunchpadError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(LaunchpadError::GalaxyHttp(err.to_string()));
                }
            }
        }
    }
}

impl LandingClient for GalaxyHttpClient {
    fn create_landing(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<String, LaunchpadError> {
        let response = self.send_with_retries(|| self.client.post(url).json(body))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "landing request failed".to_string());
            return Err(LaunchpadError::GalaxyStatus { status, message });
        }

        let landing = response
            .json::<LandingResponse>()
            .map_err(|err| LaunchpadError::GalaxyHttp(err.to_string()))?;
        landing
            .uuid
            .filter(|uuid| !uuid.is_empty())
            .ok_or(LaunchpadError::MissingLandingUuid)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// What the launch control should show for the current configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchStatus {
    pub disabled: bool,
    pub loading: bool,
    pub error: Option<String>,
}

/// Drives a launch end to end: completeness check, body construction, the
/// landing POST, and the redirect URL. At most one launch is in flight per
/// launcher.
pub struct Launcher<C: LandingClient> {
    client: C,
    env: GalaxyEnvironment,
    in_flight: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl<C: LandingClient> Launcher<C> {
    pub fn new(client: C, env: GalaxyEnvironment) -> Self {
        Self {
            client,
            env,
            in_flight: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Whether every input the workflow needs has been answered. `Skipped`
    /// satisfies optional inputs; the reference assembly always needs a
    /// concrete value.
    fn is_configured(&self, workflow: &Workflow, input: &ConfiguredInput) -> bool {
        if input.reference_assembly.value().is_none() {
            return false;
        }
        match workflow.kind {
            WorkflowKind::Standard => {
                let gene_model_ok = !workflow.declares(WorkflowParameterVariable::GeneModelUrl)
                    || input.gene_model_url.is_answered();
                let paired_ok = !workflow
                    .declares(WorkflowParameterVariable::SangerReadRunPaired)
                    || input.read_runs_paired.is_answered();
                let single_ok = !workflow
                    .declares(WorkflowParameterVariable::SangerReadRunSingle)
                    || input.read_runs_single.is_answered();
                gene_model_ok && paired_ok && single_ok
            }
            WorkflowKind::SendData => true,
            WorkflowKind::DifferentialExpression => {
                input.gene_model_url.value().is_some()
                    && input.sample_sheet.value().is_some()
                    && input.sample_sheet_classification.value().is_some()
                    && input.design_formula.value().is_some()
            }
        }
    }

    pub fn status(&self, workflow: &Workflow, input: &ConfiguredInput) -> LaunchStatus {
        let loading = self.in_flight.load(Ordering::SeqCst);
        let error = self
            .last_error
            .lock()
            .map(|error| error.clone())
            .unwrap_or(None);
        LaunchStatus {
            disabled: loading || !self.is_configured(workflow, input),
            loading,
            error,
        }
    }

    /// Builds the kind-specific landing body, posts it, and returns the URL
    /// to redirect the user to.
    pub fn launch(
        &self,
        workflow: &Workflow,
        input: &ConfiguredInput,
    ) -> Result<String, LaunchpadError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(LaunchpadError::LaunchInFlight);
        }
        let result = self.perform_launch(workflow, input);
        self.in_flight.store(false, Ordering::SeqCst);

        if let Ok(mut last_error) = self.last_error.lock() {
            *last_error = result.as_ref().err().map(|err| err.to_string());
        }
        if let Err(err) = &result {
            warn!(workflow = %workflow.trs_id, error = %err, "launch failed");
        }
        result
    }

    fn perform_launch(
        &self,
        workflow: &Workflow,
        input: &ConfiguredInput,
    ) -> Result<String, LaunchpadError> {
        info!(workflow = %workflow.trs_id, kind = ?workflow.kind, "launching workflow");
        let (api_url, landing_base, body) = match workflow.kind {
            WorkflowKind::Standard => (
                self.env.workflow_landings_api_url(),
                self.env.workflow_landing_url(),
                to_json(&build_workflow_landings_body(workflow, input)?)?,
            ),
            WorkflowKind::SendData => (
                self.env.data_landings_api_url(),
                self.env.data_landing_url(),
                to_json(&build_send_data_body(input)?)?,
            ),
            WorkflowKind::DifferentialExpression => {
                let stored_workflow_id = self
                    .env
                    .deseq2_workflow_id
                    .as_deref()
                    .ok_or(LaunchpadError::MissingStoredWorkflowId)?;
                (
                    self.env.workflow_landings_api_url(),
                    self.env.workflow_landing_url(),
                    to_json(&build_differential_expression_body(stored_workflow_id, input)?)?,
                )
            }
        };

        let uuid = self.client.create_landing(&api_url, &body)?;
        info!(workflow = %workflow.trs_id, %uuid, "landing created");
        redirect_url(&landing_base, &uuid)
    }
}

fn to_json<T: serde::Serialize>(body: &T) -> Result<serde_json::Value, LaunchpadError> {
    serde_json::to_value(body).map_err(|err| LaunchpadError::GalaxyHttp(err.to_string()))
}

/// `<landing-base>/<uuid>?public=true`, with the UUID percent-encoded as a
/// path segment.
fn redirect_url(landing_base: &str, uuid: &str) -> Result<String, LaunchpadError> {
    let mut url = url::Url::parse(landing_base)
        .map_err(|_| LaunchpadError::InvalidInstanceUrl(landing_base.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| LaunchpadError::InvalidInstanceUrl(landing_base.to_string()))?
        .push(uuid);
    url.set_query(Some("public=true"));
    Ok(url.into())
}

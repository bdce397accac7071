use crate::configure::{ConfiguredInput, Setting};
use crate::domain::{Workflow, WorkflowKind, WorkflowParameterVariable};

/// Key of a stepper step; each maps to one [`ConfiguredInput`] field (the
/// any-layout sequencing step writes both read-run fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKey {
    ReferenceAssembly,
    GeneModelUrl,
    ReadRunsSingle,
    ReadRunsPaired,
    ReadRunsAny,
    Tracks,
    SampleSheet,
    SampleSheetClassification,
    DesignFormula,
    PrimaryContrasts,
}

/// Static definition of one stepper step.
#[derive(Clone)]
pub struct StepDef {
    pub key: StepKey,
    pub label: &'static str,
    pub disabled: bool,
    render: fn(&ConfiguredInput) -> Option<String>,
}

impl StepDef {
    /// Summary shown for a completed step, read from the current
    /// configuration snapshot.
    pub fn render_value(&self, input: &ConfiguredInput) -> Option<String> {
        (self.render)(input)
    }
}

impl std::fmt::Debug for StepDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDef")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// Planner context: when the user arrived from an assembly page the
/// reference assembly is fixed by navigation and its step is not editable.
#[derive(Debug, Clone, Copy)]
pub struct PlanOptions {
    pub assembly_preselected: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            assembly_preselected: true,
        }
    }
}

fn reference_assembly_step(options: PlanOptions) -> StepDef {
    StepDef {
        key: StepKey::ReferenceAssembly,
        label: "Reference Assembly",
        disabled: options.assembly_preselected,
        render: |input| input.reference_assembly.value().cloned(),
    }
}

fn gene_model_step() -> StepDef {
    StepDef {
        key: StepKey::GeneModelUrl,
        label: "Gene Model",
        disabled: false,
        render: |input| input.gene_model_url.value().cloned(),
    }
}

fn single_end_step() -> StepDef {
    StepDef {
        key: StepKey::ReadRunsSingle,
        label: "Single-End Sequencing Data",
        disabled: false,
        render: |input| render_run_count(&input.read_runs_single),
    }
}

fn paired_end_step() -> StepDef {
    StepDef {
        key: StepKey::ReadRunsPaired,
        label: "Paired-End Sequencing Data",
        disabled: false,
        render: |input| render_run_count(&input.read_runs_paired),
    }
}

fn any_end_step() -> StepDef {
    StepDef {
        key: StepKey::ReadRunsAny,
        label: "Sequencing Data",
        disabled: false,
        render: |input| {
            let count = input.selected_run_count();
            (count > 0).then(|| format!("{count} read runs"))
        },
    }
}

fn tracks_step() -> StepDef {
    StepDef {
        key: StepKey::Tracks,
        label: "Related Tracks",
        disabled: false,
        render: |input| {
            input
                .tracks
                .value()
                .map(|tracks| format!("{} tracks", tracks.len()))
        },
    }
}

fn sample_sheet_step() -> StepDef {
    StepDef {
        key: StepKey::SampleSheet,
        label: "Sample Sheet",
        disabled: false,
        render: |input| {
            input
                .sample_sheet
                .value()
                .map(|rows| format!("{} samples", rows.len()))
        },
    }
}

fn sample_sheet_classification_step() -> StepDef {
    StepDef {
        key: StepKey::SampleSheetClassification,
        label: "Column Classification",
        disabled: false,
        render: |input| {
            input.sample_sheet_classification.value().map(|columns| {
                let classified = columns.values().filter(|kind| kind.is_some()).count();
                format!("{classified} columns classified")
            })
        },
    }
}

fn design_formula_step() -> StepDef {
    StepDef {
        key: StepKey::DesignFormula,
        label: "Design Formula",
        disabled: false,
        render: |input| input.design_formula.value().cloned(),
    }
}

fn primary_contrasts_step() -> StepDef {
    StepDef {
        key: StepKey::PrimaryContrasts,
        label: "Primary Contrasts",
        disabled: false,
        render: |input| {
            input
                .primary_contrasts
                .value()
                .map(|contrasts| contrasts.join(", "))
        },
    }
}

fn render_run_count(setting: &Setting<Vec<crate::ena::ReadRun>>) -> Option<String> {
    setting.value().map(|runs| format!("{} read runs", runs.len()))
}

/// Registry entry for a workflow parameter variable. `ASSEMBLY_FASTA_URL` is
/// derived from the reference assembly and has no step of its own.
fn step_for(variable: WorkflowParameterVariable, options: PlanOptions) -> Option<StepDef> {
    match variable {
        WorkflowParameterVariable::AssemblyId => Some(reference_assembly_step(options)),
        WorkflowParameterVariable::AssemblyFastaUrl => None,
        WorkflowParameterVariable::GeneModelUrl => Some(gene_model_step()),
        WorkflowParameterVariable::SangerReadRunSingle => Some(single_end_step()),
        WorkflowParameterVariable::SangerReadRunPaired => Some(paired_end_step()),
    }
}

/// Priority order of the generic planner; declaration order in the workflow
/// parameter list does not matter.
const PLANNING_ORDER: [WorkflowParameterVariable; 4] = [
    WorkflowParameterVariable::AssemblyId,
    WorkflowParameterVariable::GeneModelUrl,
    WorkflowParameterVariable::SangerReadRunSingle,
    WorkflowParameterVariable::SangerReadRunPaired,
];

/// Derives the ordered list of input steps for a workflow.
pub fn plan_steps(workflow: &Workflow, options: PlanOptions) -> Vec<StepDef> {
    match workflow.kind {
        WorkflowKind::SendData => [
            step_for(WorkflowParameterVariable::AssemblyId, options),
            Some(tracks_step()),
            Some(any_end_step()),
        ]
        .into_iter()
        .flatten()
        .collect(),
        WorkflowKind::DifferentialExpression => [
            step_for(WorkflowParameterVariable::AssemblyId, options),
            step_for(WorkflowParameterVariable::GeneModelUrl, options),
            Some(sample_sheet_step()),
            Some(sample_sheet_classification_step()),
            Some(design_formula_step()),
            Some(primary_contrasts_step()),
        ]
        .into_iter()
        .flatten()
        .collect(),
        WorkflowKind::Standard => PLANNING_ORDER
            .into_iter()
            .filter(|variable| {
                // The reference assembly is considered implicitly required
                // even when the workflow does not declare it.
                *variable == WorkflowParameterVariable::AssemblyId
                    || workflow.declares(*variable)
            })
            .filter_map(|variable| step_for(variable, options))
            .collect(),
    }
}

/// Appends sequencing steps for layouts the user has begun configuring even
/// though the workflow did not declare them. Lets a selection made on the
/// any-layout step render per-layout summaries, and lets a user attach both
/// layouts to a workflow that declared only one.
pub fn augment_plan(plan: &[StepDef], input: &ConfiguredInput) -> Vec<StepDef> {
    let mut augmented = plan.to_vec();
    let has_key = |steps: &[StepDef], key| steps.iter().any(|step| step.key == key);

    if !has_key(&augmented, StepKey::ReadRunsPaired) && input.read_runs_paired.value().is_some() {
        augmented.push(paired_end_step());
    }
    if !has_key(&augmented, StepKey::ReadRunsSingle) && input.read_runs_single.value().is_some() {
        augmented.push(single_end_step());
    }
    augmented
}

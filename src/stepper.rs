use crate::steps::StepDef;

/// Index-based state machine over a step plan. `active == plan.len()` means
/// every step is completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stepper {
    active: usize,
}

impl Stepper {
    /// Starts at the first enabled step, or in the terminal state when every
    /// step is disabled.
    pub fn new(plan: &[StepDef]) -> Self {
        let active = plan
            .iter()
            .position(|step| !step.disabled)
            .unwrap_or(plan.len());
        Self { active }
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn is_complete(&self, plan: &[StepDef]) -> bool {
        self.active >= plan.len()
    }

    /// Whether the step at `index` renders as completed.
    pub fn is_completed(&self, index: usize) -> bool {
        self.active > index
    }

    /// Advances to the next enabled step after the current one, or to the
    /// terminal state when none remains. A no-op once terminal.
    pub fn advance(&mut self, plan: &[StepDef]) {
        self.active = plan
            .iter()
            .enumerate()
            .skip(self.active.saturating_add(1))
            .find(|(_, step)| !step.disabled)
            .map(|(index, _)| index)
            .unwrap_or(plan.len());
    }

    /// Jumps directly to a step index; used both for "continue to" targets
    /// and for editing an earlier step. Steps after the target render as
    /// not yet completed.
    pub fn jump(&mut self, plan: &[StepDef], index: usize) {
        self.active = index.min(plan.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Workflow, WorkflowKind, WorkflowParameter, WorkflowParameterVariable, WorkflowPloidy,
    };
    use crate::steps::{PlanOptions, plan_steps};

    fn plan() -> Vec<StepDef> {
        // Disabled assembly step followed by two enabled steps.
        let workflow = Workflow {
            trs_id: "#wf/test".parse().unwrap(),
            iwc_id: None,
            workflow_name: "Test".to_string(),
            workflow_description: String::new(),
            ploidy: WorkflowPloidy::Any,
            taxonomy_id: None,
            parameters: vec![
                WorkflowParameter {
                    key: "gtf".to_string(),
                    url_spec: None,
                    variable: Some(WorkflowParameterVariable::GeneModelUrl),
                    data_requirements: None,
                },
                WorkflowParameter {
                    key: "reads".to_string(),
                    url_spec: None,
                    variable: Some(WorkflowParameterVariable::SangerReadRunPaired),
                    data_requirements: None,
                },
            ],
            kind: WorkflowKind::Standard,
        };
        plan_steps(&workflow, PlanOptions::default())
    }

    #[test]
    fn initial_state_skips_disabled_steps() {
        let plan = plan();
        let stepper = Stepper::new(&plan);
        assert_eq!(stepper.active_index(), 1);
    }

    #[test]
    fn advancing_reaches_terminal_state_and_stays() {
        let plan = plan();
        let mut stepper = Stepper::new(&plan);
        stepper.advance(&plan);
        assert_eq!(stepper.active_index(), 2);
        stepper.advance(&plan);
        assert_eq!(stepper.active_index(), plan.len());
        assert!(stepper.is_complete(&plan));
        stepper.advance(&plan);
        assert_eq!(stepper.active_index(), plan.len());
    }

    #[test]
    fn jump_back_marks_downstream_steps_incomplete() {
        let plan = plan();
        let mut stepper = Stepper::new(&plan);
        stepper.advance(&plan);
        stepper.advance(&plan);
        assert!(stepper.is_completed(2));

        stepper.jump(&plan, 1);
        assert_eq!(stepper.active_index(), 1);
        assert!(!stepper.is_completed(1));
        assert!(!stepper.is_completed(2));
        assert!(stepper.is_completed(0));
    }

    #[test]
    fn jump_clamps_to_plan_length() {
        let plan = plan();
        let mut stepper = Stepper::new(&plan);
        stepper.jump(&plan, 99);
        assert_eq!(stepper.active_index(), plan.len());
    }

    #[test]
    fn all_disabled_plan_starts_terminal() {
        let workflow = Workflow {
            trs_id: "#wf/test".parse().unwrap(),
            iwc_id: None,
            workflow_name: "Test".to_string(),
            workflow_description: String::new(),
            ploidy: WorkflowPloidy::Any,
            taxonomy_id: None,
            parameters: Vec::new(),
            kind: WorkflowKind::Standard,
        };
        let plan = plan_steps(&workflow, PlanOptions::default());
        let stepper = Stepper::new(&plan);
        assert!(stepper.is_complete(&plan));
    }
}

use crate::domain::{Assembly, Workflow, WorkflowCategory};

/// Whether a workflow applies to an assembly: the workflow's taxonomy
/// restriction (if any) must appear in the assembly's lineage, and the
/// workflow's ploidy requirement must match one of the assembly's ploidy
/// values.
pub fn is_compatible(workflow: &Workflow, assembly: &Assembly) -> bool {
    if let Some(taxonomy_id) = &workflow.taxonomy_id {
        if !assembly.lineage_taxonomy_ids.contains(taxonomy_id) {
            return false;
        }
    }
    assembly
        .ploidy
        .iter()
        .any(|ploidy| workflow.ploidy.matches(*ploidy))
}

/// Filters each category's workflows down to those compatible with the
/// assembly. Categories left with no workflows are dropped; category and
/// workflow order are preserved from the catalog.
pub fn compatible_categories(
    categories: &[WorkflowCategory],
    assembly: &Assembly,
) -> Vec<WorkflowCategory> {
    categories
        .iter()
        .filter_map(|category| {
            let workflows: Vec<Workflow> = category
                .workflows
                .iter()
                .filter(|workflow| is_compatible(workflow, assembly))
                .cloned()
                .collect();
            if workflows.is_empty() {
                return None;
            }
            Some(WorkflowCategory {
                workflows,
                ..category.clone()
            })
        })
        .collect()
}

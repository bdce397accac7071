use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ena::ReadRun;

/// Answer state of one configurable field. `Skipped` is an explicit "no
/// value" answer and counts as answered; only `Unanswered` blocks steps that
/// require a decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Setting<T> {
    #[default]
    Unanswered,
    Skipped,
    Value(T),
}

impl<T> Setting<T> {
    pub fn is_unanswered(&self) -> bool {
        matches!(self, Setting::Unanswered)
    }

    pub fn is_answered(&self) -> bool {
        !self.is_unanswered()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Setting::Value(value) => Some(value),
            _ => None,
        }
    }
}

// On the wire a `Setting` keeps the catalog portal's convention: an absent
// field is unanswered, `null` is skipped, anything else is the value.
impl<T: Serialize> Serialize for Setting<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Setting::Value(value) => serializer.serialize_some(value),
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Setting::Value(value),
            None => Setting::Skipped,
        })
    }
}

/// Classification assigned to one sample sheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    Identifier,
    ForwardFileUrl,
    ReverseFileUrl,
    ForwardFileMd5,
    ReverseFileMd5,
    BiologicalFactor,
    TechnicalBlockingFactor,
    OtherCovariate,
    QcOnly,
}

/// A genome-browser track selected for the send-data workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub short_label: String,
    pub big_data_url: String,
    #[serde(default)]
    pub md5_hash: Option<String>,
}

pub type SampleSheetRow = BTreeMap<String, String>;
pub type SampleSheetClassification = BTreeMap<String, Option<ColumnType>>;

/// The partial, progressively filled configuration for one workflow session.
/// Mutated only through [`ConfiguredInput::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfiguredInput {
    #[serde(skip_serializing_if = "Setting::is_unanswered")]
    pub reference_assembly: Setting<String>,
    #[serde(skip_serializing_if = "Setting::is_unanswered")]
    pub gene_model_url: Setting<String>,
    #[serde(skip_serializing_if = "Setting::is_unanswered")]
    pub read_runs_single: Setting<Vec<ReadRun>>,
    #[serde(skip_serializing_if = "Setting::is_unanswered")]
    pub read_runs_paired: Setting<Vec<ReadRun>>,
    #[serde(skip_serializing_if = "Setting::is_unanswered")]
    pub tracks: Setting<Vec<Track>>,
    #[serde(skip_serializing_if = "Setting::is_unanswered")]
    pub sample_sheet: Setting<Vec<SampleSheetRow>>,
    #[serde(skip_serializing_if = "Setting::is_unanswered")]
    pub sample_sheet_classification: Setting<SampleSheetClassification>,
    #[serde(skip_serializing_if = "Setting::is_unanswered")]
    pub design_formula: Setting<String>,
    #[serde(skip_serializing_if = "Setting::is_unanswered")]
    pub primary_contrasts: Setting<Vec<String>>,
}

impl ConfiguredInput {
    /// Shallow merge: every field present in the patch overwrites the
    /// corresponding field here; absent fields are untouched.
    pub fn merge(&mut self, patch: ConfiguredPatch) {
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = patch.$field {
                    self.$field = value;
                })*
            };
        }
        apply!(
            reference_assembly,
            gene_model_url,
            read_runs_single,
            read_runs_paired,
            tracks,
            sample_sheet,
            sample_sheet_classification,
            design_formula,
            primary_contrasts
        );
    }

    /// Number of sequencing runs selected across both layouts.
    pub fn selected_run_count(&self) -> usize {
        let paired = self.read_runs_paired.value().map(Vec::len).unwrap_or(0);
        let single = self.read_runs_single.value().map(Vec::len).unwrap_or(0);
        paired + single
    }
}

/// One step's "save my answer" payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfiguredPatch {
    pub reference_assembly: Option<Setting<String>>,
    pub gene_model_url: Option<Setting<String>>,
    pub read_runs_single: Option<Setting<Vec<ReadRun>>>,
    pub read_runs_paired: Option<Setting<Vec<ReadRun>>>,
    pub tracks: Option<Setting<Vec<Track>>>,
    pub sample_sheet: Option<Setting<Vec<SampleSheetRow>>>,
    pub sample_sheet_classification: Option<Setting<SampleSheetClassification>>,
    pub design_formula: Option<Setting<String>>,
    pub primary_contrasts: Option<Setting<Vec<String>>>,
}

impl ConfiguredPatch {
    /// Clears both sequencing selections.
    pub fn clear_sequencing_data() -> Self {
        Self {
            read_runs_paired: Some(Setting::Skipped),
            read_runs_single: Some(Setting::Skipped),
            ..Default::default()
        }
    }

    /// Splits a picker selection by library layout; a layout with no
    /// selected runs is recorded as skipped.
    pub fn sequencing_selection(runs: Vec<ReadRun>) -> Self {
        let (paired, single): (Vec<ReadRun>, Vec<ReadRun>) =
            runs.into_iter().partition(ReadRun::is_paired);
        Self {
            read_runs_paired: Some(non_empty(paired)),
            read_runs_single: Some(non_empty(single)),
            ..Default::default()
        }
    }

    /// "Upload my own data" for the any-layout step: both layouts get an
    /// empty selection so their steps surface in the augmented plan.
    pub fn upload_own_sequencing_data() -> Self {
        Self {
            read_runs_paired: Some(Setting::Value(Vec::new())),
            read_runs_single: Some(Setting::Value(Vec::new())),
            ..Default::default()
        }
    }

    /// "Upload my own data" for the paired-end step.
    pub fn upload_own_paired_data() -> Self {
        Self {
            read_runs_paired: Some(Setting::Value(Vec::new())),
            read_runs_single: Some(Setting::Skipped),
            ..Default::default()
        }
    }

    /// "Upload my own data" for the single-end step.
    pub fn upload_own_single_data() -> Self {
        Self {
            read_runs_paired: Some(Setting::Skipped),
            read_runs_single: Some(Setting::Value(Vec::new())),
            ..Default::default()
        }
    }
}

fn non_empty(runs: Vec<ReadRun>) -> Setting<Vec<ReadRun>> {
    if runs.is_empty() {
        Setting::Skipped
    } else {
        Setting::Value(runs)
    }
}

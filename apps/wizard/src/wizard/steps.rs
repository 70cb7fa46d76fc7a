use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::form::checks::{
    check_personal, check_skills, check_summary, EDUCATION_MIN_ONE, EXPERIENCE_MIN_ONE,
};
use crate::form::fields::{FieldPath, GroupKind, PersonalField};
use crate::form::group::EntryId;
use crate::form::rules::RuleContext;
use crate::form::ResumeFormModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    PersonalDetails,
    Skills,
    Experience,
    Education,
    Certifications,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::PersonalDetails,
        Step::Skills,
        Step::Experience,
        Step::Education,
        Step::Certifications,
    ];

    pub const FIRST: Step = Step::PersonalDetails;
    pub const LAST: Step = Step::Certifications;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Step> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::PersonalDetails => "Personal Details",
            Step::Skills => "Skills",
            Step::Experience => "Experience",
            Step::Education => "Education",
            Step::Certifications => "Certifications",
        }
    }

    pub fn next(self) -> Option<Step> {
        Self::from_index(self.index() + 1)
    }

    pub fn prev(self) -> Option<Step> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// The step whose field set owns `path`.
    pub fn owning(path: &FieldPath) -> Step {
        match path {
            FieldPath::Personal(_) | FieldPath::Summary => Step::PersonalDetails,
            FieldPath::Skills => Step::Skills,
            FieldPath::Experience(..) | FieldPath::Group(GroupKind::Experience) => Step::Experience,
            FieldPath::Education(..) | FieldPath::Group(GroupKind::Education) => Step::Education,
            FieldPath::Certification(..) | FieldPath::Group(GroupKind::Certifications) => {
                Step::Certifications
            }
        }
    }
}

/// Field errors surfaced for one validation pass; at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StepErrors(BTreeMap<FieldPath, String>);

impl StepErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, path: &FieldPath) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &str)> + '_ {
        self.0.iter().map(|(path, message)| (path, message.as_str()))
    }

    pub fn clear_field(&mut self, path: &FieldPath) {
        self.0.remove(path);
    }

    /// Drops the errors of one removed entry along with the group-level error.
    pub fn clear_entry(&mut self, group: GroupKind, id: EntryId) {
        self.0.retain(|path, _| !belongs_to(path, group, id));
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn merge(&mut self, other: StepErrors) {
        self.0.extend(other.0);
    }

    fn record(&mut self, path: FieldPath, verdict: Result<(), String>) {
        if let Err(message) = verdict {
            self.0.entry(path).or_insert(message);
        }
    }
}

fn belongs_to(path: &FieldPath, group: GroupKind, id: EntryId) -> bool {
    match *path {
        FieldPath::Experience(entry, _) => group == GroupKind::Experience && entry == id,
        FieldPath::Education(entry, _) => group == GroupKind::Education && entry == id,
        FieldPath::Certification(entry, _) => group == GroupKind::Certifications && entry == id,
        FieldPath::Group(kind) => kind == group,
        _ => false,
    }
}

/// Runs the rules for `step`'s field set against the current model.
///
/// | step | field set |
/// |---|---|
/// | personal details | all six contact fields and the summary |
/// | skills | skills |
/// | experience | every field of every entry |
/// | education | every field of every entry |
/// | certifications | the first entry only |
pub fn validate_step(step: Step, model: &mut ResumeFormModel, ctx: &RuleContext) -> StepErrors {
    let mut errors = StepErrors::default();
    match step {
        Step::PersonalDetails => {
            for &field in PersonalField::ALL {
                errors.record(
                    FieldPath::Personal(field),
                    check_personal(&model.personal_details, field),
                );
            }
            errors.record(FieldPath::Summary, check_summary(&model.summary));
        }
        Step::Skills => errors.record(FieldPath::Skills, check_skills(&model.skills)),
        Step::Experience => {
            if model.experience.is_empty() {
                errors.record(
                    FieldPath::Group(GroupKind::Experience),
                    Err(EXPERIENCE_MIN_ONE.to_string()),
                );
            }
            for (id, entry_errors) in model.experience.check_all(ctx) {
                for (field, message) in entry_errors {
                    errors.record(FieldPath::Experience(id, field), Err(message));
                }
            }
        }
        Step::Education => {
            if model.education.is_empty() {
                errors.record(
                    FieldPath::Group(GroupKind::Education),
                    Err(EDUCATION_MIN_ONE.to_string()),
                );
            }
            for (id, entry_errors) in model.education.check_all(ctx) {
                for (field, message) in entry_errors {
                    errors.record(FieldPath::Education(id, field), Err(message));
                }
            }
        }
        Step::Certifications => {
            if let Some(id) = model.certifications.first_id() {
                let entry_errors = model.certifications.check_entry(id, ctx).unwrap_or_default();
                for (field, message) in entry_errors {
                    errors.record(FieldPath::Certification(id, field), Err(message));
                }
            }
        }
    }
    errors
}

//! Per-field rule chains. Each chain lists its rules in evaluation order and
//! reports only the first failure.

use crate::form::fields::{CertificationField, EducationField, ExperienceField, PersonalField};
use crate::form::group::{EntryErrors, GroupItem};
use crate::form::model::{
    CertificationForm, CertificationPatch, EducationForm, EducationPatch, ExperienceForm,
    ExperiencePatch, PersonalDetailsForm,
};
use crate::form::rules::{
    conditional_required, date_ordering, email_pattern, github_pattern, linkedin_pattern,
    min_length, pattern, phone_pattern, required, rich_text_non_empty, valid_date, valid_month,
    valid_year, RuleContext, RuleResult,
};

pub const EXPERIENCE_MIN_ONE: &str = "At least one experience entry is required";
pub const EDUCATION_MIN_ONE: &str = "At least one education entry is required";

pub fn check_personal(details: &PersonalDetailsForm, field: PersonalField) -> RuleResult {
    let value = details.get(field);
    match field {
        PersonalField::Name => required(value, "Full name is required"),
        PersonalField::Email => required(value, "Email is required")
            .and_then(|_| pattern(value, email_pattern(), "Invalid email address")),
        PersonalField::Phone => required(value, "Phone number is required").and_then(|_| {
            pattern(
                value,
                phone_pattern(),
                "Invalid phone number (10 digits required)",
            )
        }),
        PersonalField::Location => required(value, "Location is required"),
        PersonalField::Linkedin => required(value, "LinkedIn URL is required")
            .and_then(|_| pattern(value, linkedin_pattern(), "Invalid LinkedIn URL")),
        PersonalField::Github => required(value, "GitHub URL is required")
            .and_then(|_| pattern(value, github_pattern(), "Invalid GitHub URL")),
    }
}

pub fn check_summary(summary: &str) -> RuleResult {
    rich_text_non_empty(summary, "Professional summary is required")
}

pub fn check_skills(skills: &str) -> RuleResult {
    required(skills, "Skills are required")
        .and_then(|_| rich_text_non_empty(skills, "Please enter at least one skill"))
}

fn check_experience_field(exp: &ExperienceForm, field: ExperienceField) -> RuleResult {
    match field {
        ExperienceField::JobTitle => required(&exp.job_title, "Job title is required").and_then(
            |_| min_length(&exp.job_title, 2, "Job title must be at least 2 characters"),
        ),
        ExperienceField::Company => required(&exp.company, "Company name is required").and_then(
            |_| min_length(&exp.company, 2, "Company name must be at least 2 characters"),
        ),
        ExperienceField::Location => required(&exp.location, "Location is required")
            .and_then(|_| min_length(&exp.location, 2, "Location must be at least 2 characters")),
        ExperienceField::StartDate => required(&exp.start_date, "Start date is required")
            .and_then(|_| valid_date(&exp.start_date, "Please enter a valid date")),
        ExperienceField::EndDate => conditional_required(
            &exp.end_date,
            || !exp.present,
            "End date is required if not present",
        )
        .and_then(|_| {
            if exp.present {
                return Ok(());
            }
            valid_date(&exp.end_date, "Please enter a valid date").and_then(|_| {
                date_ordering(
                    &exp.start_date,
                    &exp.end_date,
                    "End date must be after start date",
                )
            })
        }),
        ExperienceField::Present => Ok(()),
        ExperienceField::Project => required(&exp.project, "Project details are required")
            .and_then(|_| rich_text_non_empty(&exp.project, "Please add project details")),
    }
}

fn check_education_field(
    edu: &EducationForm,
    field: EducationField,
    ctx: &RuleContext,
) -> RuleResult {
    match field {
        EducationField::Degree => required(&edu.degree, "Degree is required")
            .and_then(|_| min_length(&edu.degree, 2, "Degree must be at least 2 characters")),
        EducationField::Institution => required(&edu.institution, "Institution is required")
            .and_then(|_| {
                min_length(
                    &edu.institution,
                    2,
                    "Institution name must be at least 2 characters",
                )
            }),
        EducationField::Year => {
            if edu.year.is_blank() {
                return Err("Year is required".to_string());
            }
            valid_year(&edu.year, ctx, "Please select a valid year")
        }
        EducationField::Month => required(&edu.month, "Month is required")
            .and_then(|_| valid_month(&edu.month, "Please select a valid month")),
    }
}

fn check_certification_field(cert: &CertificationForm, field: CertificationField) -> RuleResult {
    match field {
        CertificationField::Name => required(&cert.name, "Certification name is required"),
        CertificationField::Provider => Ok(()),
        CertificationField::Date => valid_date(
            cert.date.as_deref().unwrap_or_default(),
            "Please enter a valid date",
        ),
    }
}

fn collect_errors<F: Copy + Ord>(
    fields: &[F],
    mut check: impl FnMut(F) -> RuleResult,
) -> EntryErrors<F> {
    fields
        .iter()
        .filter_map(|&field| check(field).err().map(|message| (field, message)))
        .collect()
}

impl GroupItem for ExperienceForm {
    type Patch = ExperiencePatch;
    type Field = ExperienceField;

    fn merge(&mut self, patch: ExperiencePatch) {
        merge_into(&mut self.job_title, patch.job_title);
        merge_into(&mut self.company, patch.company);
        merge_into(&mut self.location, patch.location);
        merge_into(&mut self.start_date, patch.start_date);
        merge_into(&mut self.end_date, patch.end_date);
        merge_into(&mut self.project, patch.project);
        merge_into(&mut self.present, patch.present);
    }

    fn check(&self, _ctx: &RuleContext) -> EntryErrors<ExperienceField> {
        collect_errors(ExperienceField::ALL, |field| check_experience_field(self, field))
    }
}

impl GroupItem for EducationForm {
    type Patch = EducationPatch;
    type Field = EducationField;

    fn merge(&mut self, patch: EducationPatch) {
        merge_into(&mut self.degree, patch.degree);
        merge_into(&mut self.institution, patch.institution);
        merge_into(&mut self.year, patch.year);
        merge_into(&mut self.month, patch.month);
    }

    fn check(&self, ctx: &RuleContext) -> EntryErrors<EducationField> {
        collect_errors(EducationField::ALL, |field| check_education_field(self, field, ctx))
    }
}

impl GroupItem for CertificationForm {
    type Patch = CertificationPatch;
    type Field = CertificationField;

    fn merge(&mut self, patch: CertificationPatch) {
        merge_into(&mut self.name, patch.name);
        merge_into(&mut self.provider, patch.provider.map(Some));
        merge_into(&mut self.date, patch.date.map(Some));
    }

    fn check(&self, _ctx: &RuleContext) -> EntryErrors<CertificationField> {
        collect_errors(CertificationField::ALL, |field| {
            check_certification_field(self, field)
        })
    }
}

fn merge_into<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

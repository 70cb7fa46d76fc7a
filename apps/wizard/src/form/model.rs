//! In-memory editable résumé and its mapping to and from the wire document.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::form::fields::{
    CertificationField, EducationField, ExperienceField, FieldPath, GroupKind, PersonalField,
};
use crate::form::group::{Cardinality, EntryId, RepeatingGroup};
use crate::models::resume::{
    CertificationRecord, EducationRecord, ExperienceRecord, PersonalDetails, ResumeDocument,
    YearValue,
};

/// Literal stored in `endDate` for a current position.
pub const PRESENT: &str = "present";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonalDetailsForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin: String,
    pub github: String,
}

impl PersonalDetailsForm {
    pub fn get(&self, field: PersonalField) -> &str {
        match field {
            PersonalField::Name => &self.name,
            PersonalField::Email => &self.email,
            PersonalField::Phone => &self.phone,
            PersonalField::Location => &self.location,
            PersonalField::Linkedin => &self.linkedin,
            PersonalField::Github => &self.github,
        }
    }

    fn slot(&mut self, field: PersonalField) -> &mut String {
        match field {
            PersonalField::Name => &mut self.name,
            PersonalField::Email => &mut self.email,
            PersonalField::Phone => &mut self.phone,
            PersonalField::Location => &mut self.location,
            PersonalField::Linkedin => &mut self.linkedin,
            PersonalField::Github => &mut self.github,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceForm {
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub project: String,
    pub present: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EducationForm {
    pub degree: String,
    pub institution: String,
    pub year: YearValue,
    pub month: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CertificationForm {
    pub name: String,
    /// `None` when the key was absent on the wire. Rendered as `""` either way.
    #[serde(serialize_with = "absent_as_empty")]
    pub provider: Option<String>,
    #[serde(serialize_with = "absent_as_empty")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperiencePatch {
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub project: Option<String>,
    pub present: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EducationPatch {
    pub degree: Option<String>,
    pub institution: Option<String>,
    pub year: Option<YearValue>,
    pub month: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificationPatch {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub date: Option<String>,
}

/// The whole editable résumé, owned by one wizard session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeFormModel {
    pub personal_details: PersonalDetailsForm,
    pub summary: String,
    pub skills: String,
    pub experience: RepeatingGroup<ExperienceForm>,
    pub education: RepeatingGroup<EducationForm>,
    pub certifications: RepeatingGroup<CertificationForm>,
}

impl Default for ResumeFormModel {
    /// Blank résumé for the create flow: one empty entry in every group.
    fn default() -> Self {
        let mut model = Self::unseeded(Vec::new(), Vec::new(), vec![CertificationForm::default()]);
        model.seed_groups();
        model
    }
}

/// A value supplied to [`ResumeFormModel::apply`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldEdit {
    pub path: FieldPath,
    pub value: FieldValue,
}

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("No {group} entry with id {id}")]
    UnknownEntry { group: GroupKind, id: EntryId },

    #[error("Field '{0}' cannot be edited directly")]
    NotEditable(FieldPath),

    #[error("Field '{path}' expects {expected}")]
    TypeMismatch {
        path: FieldPath,
        expected: &'static str,
    },
}

impl ResumeFormModel {
    /// Maps a fetched document into the editable shape.
    ///
    /// `present` is derived from `endDate == "present"` rather than read from
    /// the wire. Absent required values become `""`; optional certification
    /// fields remember whether they were sent at all.
    pub fn from_wire(doc: &ResumeDocument) -> Self {
        let experience = doc.experience.iter().map(|exp| ExperienceForm {
            job_title: exp.job_title.clone(),
            company: exp.company.clone(),
            location: exp.location.clone(),
            start_date: exp.start_date.clone(),
            end_date: exp.end_date.clone(),
            project: exp.project.clone(),
            present: exp.end_date == PRESENT,
        });
        let education = doc.education.iter().map(|edu| EducationForm {
            degree: edu.degree.clone(),
            institution: edu.institution.clone(),
            year: edu.year.clone(),
            month: edu.month.clone(),
        });
        let certifications = doc.certifications.iter().map(|cert| CertificationForm {
            name: cert.name.clone(),
            provider: cert.provider.clone(),
            date: cert.date.clone(),
        });

        let details = &doc.personal_details;
        let mut model = Self {
            personal_details: PersonalDetailsForm {
                name: details.name.clone(),
                email: details.email.clone(),
                phone: details.phone.clone(),
                location: details.location.clone(),
                linkedin: details.linkedin.clone(),
                github: details.github.clone(),
            },
            summary: doc.summary.clone(),
            skills: doc.skills.clone(),
            ..Self::unseeded(experience, education, certifications)
        };
        model.seed_groups();
        model
    }

    /// Builds the outgoing document. A `present` entry always carries
    /// `endDate: "present"`, whatever the field last held, and an entry whose
    /// end date is the literal is sent as `present`. The id is left to the
    /// caller.
    pub fn to_wire(&self) -> ResumeDocument {
        let details = &self.personal_details;
        ResumeDocument {
            id: None,
            personal_details: PersonalDetails {
                name: details.name.clone(),
                email: details.email.clone(),
                phone: details.phone.clone(),
                location: details.location.clone(),
                linkedin: details.linkedin.clone(),
                github: details.github.clone(),
            },
            summary: self.summary.clone(),
            skills: self.skills.clone(),
            experience: self
                .experience
                .iter()
                .map(|exp| {
                    let present = exp.present || exp.end_date == PRESENT;
                    ExperienceRecord {
                        job_title: exp.job_title.clone(),
                        company: exp.company.clone(),
                        location: exp.location.clone(),
                        start_date: exp.start_date.clone(),
                        end_date: if present {
                            PRESENT.to_string()
                        } else {
                            exp.end_date.clone()
                        },
                        project: exp.project.clone(),
                        present,
                    }
                })
                .collect(),
            education: self
                .education
                .iter()
                .map(|edu| EducationRecord {
                    degree: edu.degree.clone(),
                    institution: edu.institution.clone(),
                    year: edu.year.clone(),
                    month: edu.month.clone(),
                })
                .collect(),
            certifications: self
                .certifications
                .iter()
                .map(|cert| CertificationRecord {
                    name: cert.name.clone(),
                    provider: cert.provider.clone(),
                    date: cert.date.clone(),
                })
                .collect(),
        }
    }

    /// Applies a single field edit. Toggling `present` also rewrites
    /// `endDate` to `"present"` or `""`, as the end-date input is disabled
    /// while the flag is set. Writing the literal into `endDate` sets the flag.
    pub fn apply(&mut self, edit: FieldEdit) -> Result<(), EditError> {
        let FieldEdit { path, value } = edit;
        match path {
            FieldPath::Personal(field) => {
                *self.personal_details.slot(field) = expect_text(path, value)?;
            }
            FieldPath::Summary => self.summary = expect_text(path, value)?,
            FieldPath::Skills => self.skills = expect_text(path, value)?,
            FieldPath::Experience(id, field) => {
                let edit = ExperienceEdit::new(path, field, value)?;
                self.experience
                    .update(id, |exp| edit.apply(exp))
                    .ok_or(EditError::UnknownEntry {
                        group: GroupKind::Experience,
                        id,
                    })?;
            }
            FieldPath::Education(id, field) => {
                let edit = EducationEdit::new(path, field, value)?;
                self.education
                    .update(id, |edu| edit.apply(edu))
                    .ok_or(EditError::UnknownEntry {
                        group: GroupKind::Education,
                        id,
                    })?;
            }
            FieldPath::Certification(id, field) => {
                let text = expect_text(path, value)?;
                self.certifications
                    .update(id, |cert| match field {
                        CertificationField::Name => cert.name = text,
                        CertificationField::Provider => cert.provider = Some(text),
                        CertificationField::Date => cert.date = Some(text),
                    })
                    .ok_or(EditError::UnknownEntry {
                        group: GroupKind::Certifications,
                        id,
                    })?;
            }
            FieldPath::Group(_) => return Err(EditError::NotEditable(path)),
        }
        Ok(())
    }

    fn unseeded(
        experience: impl IntoIterator<Item = ExperienceForm>,
        education: impl IntoIterator<Item = EducationForm>,
        certifications: impl IntoIterator<Item = CertificationForm>,
    ) -> Self {
        Self {
            personal_details: PersonalDetailsForm::default(),
            summary: String::new(),
            skills: String::new(),
            experience: RepeatingGroup::from_values(Cardinality::AtLeastOne, experience),
            education: RepeatingGroup::from_values(Cardinality::AtLeastOne, education),
            certifications: RepeatingGroup::from_values(Cardinality::Any, certifications),
        }
    }

    fn seed_groups(&mut self) {
        self.experience.ensure_seeded();
        self.education.ensure_seeded();
    }
}

enum ExperienceEdit {
    Text(ExperienceField, String),
    Present(bool),
}

impl ExperienceEdit {
    fn new(path: FieldPath, field: ExperienceField, value: FieldValue) -> Result<Self, EditError> {
        match (field, value) {
            (ExperienceField::Present, FieldValue::Flag(flag)) => Ok(Self::Present(flag)),
            (ExperienceField::Present, _) => Err(EditError::TypeMismatch {
                path,
                expected: "a boolean",
            }),
            (field, value) => Ok(Self::Text(field, expect_text(path, value)?)),
        }
    }

    fn apply(self, exp: &mut ExperienceForm) {
        match self {
            Self::Present(flag) => {
                exp.present = flag;
                exp.end_date = if flag { PRESENT.to_string() } else { String::new() };
            }
            Self::Text(field, text) => match field {
                ExperienceField::JobTitle => exp.job_title = text,
                ExperienceField::Company => exp.company = text,
                ExperienceField::Location => exp.location = text,
                ExperienceField::StartDate => exp.start_date = text,
                ExperienceField::EndDate => {
                    if text == PRESENT {
                        exp.present = true;
                    }
                    exp.end_date = text;
                }
                ExperienceField::Project => exp.project = text,
                ExperienceField::Present => {}
            },
        }
    }
}

enum EducationEdit {
    Year(YearValue),
    Text(EducationField, String),
}

impl EducationEdit {
    fn new(path: FieldPath, field: EducationField, value: FieldValue) -> Result<Self, EditError> {
        match (field, value) {
            (EducationField::Year, FieldValue::Number(n)) => Ok(Self::Year(YearValue::Number(n))),
            (EducationField::Year, FieldValue::Text(s)) => Ok(Self::Year(YearValue::Text(s))),
            (EducationField::Year, FieldValue::Flag(_)) => Err(EditError::TypeMismatch {
                path,
                expected: "a year",
            }),
            (field, value) => Ok(Self::Text(field, expect_text(path, value)?)),
        }
    }

    fn apply(self, edu: &mut EducationForm) {
        match self {
            Self::Year(year) => edu.year = year,
            Self::Text(field, text) => match field {
                EducationField::Degree => edu.degree = text,
                EducationField::Institution => edu.institution = text,
                EducationField::Month => edu.month = text,
                EducationField::Year => edu.year = YearValue::Text(text),
            },
        }
    }
}

fn expect_text(path: FieldPath, value: FieldValue) -> Result<String, EditError> {
    match value {
        FieldValue::Text(text) => Ok(text),
        _ => Err(EditError::TypeMismatch {
            path,
            expected: "a string",
        }),
    }
}

fn absent_as_empty<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or_default())
}

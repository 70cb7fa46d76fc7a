use serde::{Deserialize, Deserializer, Serialize};

/// Résumé document as exchanged with the remote résumé API.
///
/// Required string fields tolerate `null` and absence on the way in (both
/// become `""`); optional fields stay `None` and are omitted on the way out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDocument {
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub personal_details: PersonalDetails,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experience: Vec<ExperienceRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub education: Vec<EducationRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub certifications: Vec<CertificationRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalDetails {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub linkedin: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub github: String,
}

/// `end_date` holds either an ISO date or the literal `"present"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub job_title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub present: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub degree: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub institution: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub year: YearValue,
    #[serde(default, deserialize_with = "null_as_default")]
    pub month: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificationRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Education year, kept in whichever JSON shape it was entered or received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearValue {
    Number(i64),
    Text(String),
}

impl Default for YearValue {
    fn default() -> Self {
        YearValue::Text(String::new())
    }
}

impl YearValue {
    pub fn is_blank(&self) -> bool {
        match self {
            YearValue::Number(_) => false,
            YearValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Integer reading of the year: numbers as-is, text by its leading
    /// integer (`"2021"` and `"2021 (expected)"` both read as 2021).
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            YearValue::Number(n) => Some(*n),
            YearValue::Text(s) => parse_leading_int(s),
        }
    }
}

/// One row of the résumé listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeSummary {
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    pub experience_count: usize,
    pub education_count: usize,
}

impl From<&ResumeDocument> for ResumeSummary {
    fn from(doc: &ResumeDocument) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.personal_details.name.clone(),
            email: doc.personal_details.email.clone(),
            experience_count: doc.experience.len(),
            education_count: doc.education.len(),
        }
    }
}

/// Attachment name for a rendered résumé: whitespace runs in the owner's
/// name become `_`, e.g. `"Ada  Lovelace"` gives `Ada_Lovelace_resume.pdf`.
pub fn pdf_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 11);
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out.push_str("_resume.pdf");
    out
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A résumé that passes every wizard step.
#[cfg(test)]
pub(crate) fn sample_document() -> ResumeDocument {
    serde_json::from_value(serde_json::json!({
        "personalDetails": {
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "phone": "0123456789",
            "location": "London",
            "linkedin": "https://linkedin.com/in/ada",
            "github": "https://github.com/ada"
        },
        "summary": "<p>Analyst</p>",
        "skills": "<ul><li>Maths</li></ul>",
        "experience": [{
            "jobTitle": "Analyst",
            "company": "Engines Ltd",
            "location": "London",
            "startDate": "2020-01-01",
            "endDate": "present",
            "project": "<p>Notes</p>"
        }],
        "education": [{
            "degree": "BSc",
            "institution": "Home",
            "year": 2019,
            "month": "July"
        }],
        "certifications": [{ "name": "Cert" }]
    }))
    .expect("sample resume")
}

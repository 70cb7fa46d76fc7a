//! Addressing for individual form fields.
//!
//! A [`FieldPath`] renders as a dotted string (`personalDetails.email`,
//! `experience.3.endDate`) where the number is the entry's stable id, not its
//! position. Errors are keyed and edits are addressed by these paths.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::form::group::EntryId;

macro_rules! field_enum {
    ($name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }

            fn parse(s: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|f| f.as_str() == s)
            }
        }
    };
}

field_enum!(PersonalField {
    Name => "name",
    Email => "email",
    Phone => "phone",
    Location => "location",
    Linkedin => "linkedin",
    Github => "github",
});

field_enum!(ExperienceField {
    JobTitle => "jobTitle",
    Company => "company",
    Location => "location",
    StartDate => "startDate",
    EndDate => "endDate",
    Present => "present",
    Project => "project",
});

field_enum!(EducationField {
    Degree => "degree",
    Institution => "institution",
    Year => "year",
    Month => "month",
});

field_enum!(CertificationField {
    Name => "name",
    Provider => "provider",
    Date => "date",
});

field_enum!(GroupKind {
    Experience => "experience",
    Education => "education",
    Certifications => "certifications",
});

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupKind {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| FieldPathError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldPath {
    Personal(PersonalField),
    Summary,
    Skills,
    Experience(EntryId, ExperienceField),
    Education(EntryId, EducationField),
    Certification(EntryId, CertificationField),
    /// The group as a whole (e.g. "at least one entry").
    Group(GroupKind),
}

#[derive(Debug, Error, PartialEq)]
#[error("Unknown field path '{0}'")]
pub struct FieldPathError(String);

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Personal(field) => write!(f, "personalDetails.{}", field.as_str()),
            FieldPath::Summary => f.write_str("summary"),
            FieldPath::Skills => f.write_str("skills"),
            FieldPath::Experience(id, field) => write!(f, "experience.{id}.{}", field.as_str()),
            FieldPath::Education(id, field) => write!(f, "education.{id}.{}", field.as_str()),
            FieldPath::Certification(id, field) => {
                write!(f, "certifications.{id}.{}", field.as_str())
            }
            FieldPath::Group(group) => f.write_str(group.as_str()),
        }
    }
}

impl FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || FieldPathError(s.to_string());
        let parts: Vec<&str> = s.split('.').collect();

        let path = match parts.as_slice() {
            ["summary"] => FieldPath::Summary,
            ["skills"] => FieldPath::Skills,
            ["personalDetails", field] => {
                FieldPath::Personal(PersonalField::parse(field).ok_or_else(unknown)?)
            }
            [group] => FieldPath::Group(GroupKind::parse(group).ok_or_else(unknown)?),
            [group, id, field] => {
                let id = EntryId(id.parse().map_err(|_| unknown())?);
                match GroupKind::parse(group).ok_or_else(unknown)? {
                    GroupKind::Experience => FieldPath::Experience(
                        id,
                        ExperienceField::parse(field).ok_or_else(unknown)?,
                    ),
                    GroupKind::Education => FieldPath::Education(
                        id,
                        EducationField::parse(field).ok_or_else(unknown)?,
                    ),
                    GroupKind::Certifications => FieldPath::Certification(
                        id,
                        CertificationField::parse(field).ok_or_else(unknown)?,
                    ),
                }
            }
            _ => return Err(unknown()),
        };
        Ok(path)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_entry_ids() {
        assert_eq!(
            FieldPath::Personal(PersonalField::Email).to_string(),
            "personalDetails.email"
        );
        assert_eq!(
            FieldPath::Experience(EntryId(3), ExperienceField::EndDate).to_string(),
            "experience.3.endDate"
        );
        assert_eq!(FieldPath::Group(GroupKind::Education).to_string(), "education");
    }

    #[test]
    fn test_parse_accepts_every_rendered_path() {
        let paths = [
            FieldPath::Summary,
            FieldPath::Skills,
            FieldPath::Personal(PersonalField::Github),
            FieldPath::Experience(EntryId(7), ExperienceField::Present),
            FieldPath::Education(EntryId(1), EducationField::Month),
            FieldPath::Certification(EntryId(2), CertificationField::Provider),
            FieldPath::Group(GroupKind::Certifications),
        ];
        for path in paths {
            assert_eq!(path.to_string().parse::<FieldPath>(), Ok(path));
        }
    }

    #[test]
    fn test_parse_rejects_unknown_paths() {
        assert!("personalDetails.age".parse::<FieldPath>().is_err());
        assert!("experience.x.company".parse::<FieldPath>().is_err());
        assert!("experience.1.degree".parse::<FieldPath>().is_err());
        assert!("projects".parse::<FieldPath>().is_err());
        assert!("".parse::<FieldPath>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let path = FieldPath::Education(EntryId(4), EducationField::Year);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"education.4.year\"");
        let back: FieldPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}

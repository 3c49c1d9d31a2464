use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{Gender, RelativeType, VoterRecord};

use super::text::FieldCleaner;

/// Whole-text replacements applied before line splitting.
const TYPO_CORRECTIONS: &[(&str, &str)] = &[("Narne", "Name"), ("Numiber", "Number")];

/// One recognized field-start line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineField {
    Name(String),
    Relative {
        kind: RelativeType,
        name: String,
    },
    HouseNumber(String),
    AgeGender {
        age: String,
        gender: Gender,
    },
    Identifier(String),
}

/// The record currently being accumulated by the scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterDraft {
    pub name: Option<String>,
    pub relative_type: Option<RelativeType>,
    pub relative_name: Option<String>,
    pub house_number: Option<String>,
    pub age: Option<String>,
    pub gender: Option<Gender>,
    pub id: Option<String>,
}

impl VoterDraft {
    fn has_corroboration(&self) -> bool {
        self.age.is_some()
            || self.gender.is_some()
            || self.house_number.is_some()
            || self.relative_name.is_some()
            || self.id.is_some()
    }

    /// A draft is emitted only with a non-empty name plus one supporting field.
    pub fn is_complete(&self) -> bool {
        self.name.as_deref().is_some_and(|name| !name.is_empty()) && self.has_corroboration()
    }

    pub fn into_record(self) -> Option<VoterRecord> {
        if !self.is_complete() {
            return None;
        }
        Some(VoterRecord {
            name: self.name?,
            relative_type: self.relative_type,
            relative_name: self.relative_name,
            house_number: self.house_number,
            age: self.age,
            gender: self.gender,
            id: self.id,
        })
    }

    fn apply(&mut self, field: LineField) {
        match field {
            LineField::Name(name) => {
                // Also drops fields seen before the first Name, even when the
                // draft has no name yet to attach them to.
                *self = VoterDraft {
                    name: Some(name),
                    ..VoterDraft::default()
                };
            }
            LineField::Relative { kind, name } => {
                self.relative_type = Some(kind);
                self.relative_name = Some(name);
            }
            LineField::HouseNumber(number) => self.house_number = Some(number),
            LineField::AgeGender { age, gender } => {
                self.age = Some(age);
                self.gender = Some(gender);
            }
            LineField::Identifier(id) => self.id = Some(id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoterScanner {
    cleaner: FieldCleaner,
    name_start: Regex,
    relative_name: Regex,
    house_number: Regex,
    age_gender: Regex,
    identifier: Regex,
}

impl VoterScanner {
    pub fn new(cleaner: FieldCleaner) -> Result<Self> {
        Ok(Self {
            cleaner,
            name_start: Regex::new(r"(?i)^Name\s*[^a-zA-Z0-9]+\s*(.*)")
                .context("failed to compile name regex")?,
            relative_name: Regex::new(
                r"(?i)^(Father|Husband|Mother)['’`]?s\s*Name\s*[^a-zA-Z0-9]+\s*(.*)",
            )
            .context("failed to compile relative name regex")?,
            house_number: Regex::new(r"(?i)^House\s*Number\s*[^a-zA-Z0-9]*\s*(.*)")
                .context("failed to compile house number regex")?,
            age_gender: Regex::new(
                r"(?i)Age\s*[:'}$+\-=!]\s*([0-9&]+)\s*Gender\s*[:*\-=+!]\s*(Male|Female)",
            )
            .context("failed to compile age/gender regex")?,
            identifier: Regex::new(r"[A-Z]{3}\d{7}").context("failed to compile voter id regex")?,
        })
    }

    /// Scans one page worth of column text. Nothing carries over between calls.
    pub fn scan(&self, text: &str) -> Vec<VoterRecord> {
        let corrected = correct_typos(text);
        let mut voters = Vec::new();
        let mut current = VoterDraft::default();

        for line in corrected.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let Some(field) = self.classify_line(line) else {
                continue;
            };

            if matches!(field, LineField::Name(_)) {
                let finished = std::mem::take(&mut current);
                voters.extend(finished.into_record());
            }
            current.apply(field);
        }

        voters.extend(current.into_record());
        voters
    }

    /// First matching rule wins, in record-boundary-first order.
    pub fn classify_line(&self, line: &str) -> Option<LineField> {
        if let Some(captures) = self.name_start.captures(line) {
            let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            return Some(LineField::Name(self.cleaner.clean(name)));
        }

        if let Some(captures) = self.relative_name.captures(line) {
            let kind = captures
                .get(1)
                .and_then(|m| RelativeType::from_label(m.as_str()))?;
            let name = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
            return Some(LineField::Relative {
                kind,
                name: self.cleaner.clean(name),
            });
        }

        if let Some(captures) = self.house_number.captures(line) {
            let number = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            return Some(LineField::HouseNumber(self.cleaner.clean(number)));
        }

        if let Some(captures) = self.age_gender.captures(line) {
            let age = captures.get(1).map(|m| normalize_age(m.as_str()));
            let gender = captures.get(2).and_then(|m| Gender::from_label(m.as_str()));
            if let (Some(age), Some(gender)) = (age, gender) {
                return Some(LineField::AgeGender { age, gender });
            }
        }

        self.identifier
            .find(line)
            .map(|m| LineField::Identifier(m.as_str().to_string()))
    }
}

fn correct_typos(text: &str) -> String {
    TYPO_CORRECTIONS
        .iter()
        .fold(text.to_string(), |acc, (typo, fixed)| acc.replace(typo, fixed))
}

/// `&` is how OCR reads an 8 in this typeface.
pub fn normalize_age(raw: &str) -> String {
    raw.replace('&', "8")
}

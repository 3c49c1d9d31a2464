use anyhow::{Context, Result};
use regex::Regex;

/// Tokens from the neighbouring "Photo Available" cell that OCR glues onto
/// the end of a captured field, including their common misreadings.
const TRAILING_ARTIFACTS: &[&str] = &[
    "Photo",
    "Available",
    "Proto",
    "Availble",
    "Avallable",
    "Avaiiable",
];

#[derive(Debug, Clone)]
pub struct FieldCleaner {
    trailing_artifact: Regex,
}

impl FieldCleaner {
    pub fn new() -> Result<Self> {
        let pattern = format!(r"(?i)\s*(?:{}).*$", TRAILING_ARTIFACTS.join("|"));
        Ok(Self {
            trailing_artifact: Regex::new(&pattern)
                .context("failed to compile trailing artifact regex")?,
        })
    }

    /// Trims the value and drops everything from the first bled-in label
    /// token onward.
    pub fn clean(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        self.trailing_artifact
            .replace(trimmed, "")
            .trim()
            .to_string()
    }

    /// Like [`FieldCleaner::clean`] but maps an empty result to `None`.
    pub fn clean_non_empty(&self, raw: &str) -> Option<String> {
        Some(self.clean(raw)).filter(|value| !value.is_empty())
    }
}

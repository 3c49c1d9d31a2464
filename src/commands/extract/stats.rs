use anyhow::{Context, Result};
use regex::Regex;

/// Reads the elector total off the summary table on the last page.
#[derive(Debug, Clone)]
pub struct StatsExtractor {
    net_electors: Regex,
    mother_roll: Regex,
}

impl StatsExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            net_electors: Regex::new(r"(?im)Net Elector.*?\s+(\d+)\s*$")
                .context("failed to compile net electors regex")?,
            mother_roll: Regex::new(r"(?im)Mother Roll.*?\s+(\d+)\s*$")
                .context("failed to compile mother roll regex")?,
        })
    }

    /// Last number on the "Net Electors" row, else on the "Mother Roll" row.
    pub fn total_electors(&self, text: &str) -> Option<String> {
        [&self.net_electors, &self.mother_roll]
            .into_iter()
            .find_map(|regex| {
                regex
                    .captures(text)
                    .and_then(|captures| captures.get(1))
                    .map(|m| m.as_str().to_string())
            })
    }
}

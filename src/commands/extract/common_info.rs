use anyhow::{Context, Result};
use regex::Regex;

use crate::model::CommonInfo;

use super::text::FieldCleaner;

/// OCR renders the colon after a label as any of these.
const LABEL_SEPARATORS: &str = r"[:=\-?]";

/// Cover-page labels whose value is simply the rest of the line.
const LINE_FIELDS: &[(&str, &str)] = &[
    ("main_town_or_village", "Main Town or Village"),
    ("post_office", "Post Office"),
    ("police_station", "Police Station"),
    ("block", "Block"),
    ("subdivision", "Subdivision"),
    ("district", "District"),
];

#[derive(Debug, Clone)]
pub struct CommonInfoExtractor {
    cleaner: FieldCleaner,
    assembly_constituency: Regex,
    part_no: Regex,
    line_fields: Vec<(&'static str, Regex)>,
    pin_code: Regex,
    station_name_positional: Regex,
    station_name_label: Regex,
    station_type: Regex,
    station_address: Regex,
}

impl CommonInfoExtractor {
    pub fn new(cleaner: FieldCleaner) -> Result<Self> {
        let mut line_fields = Vec::with_capacity(LINE_FIELDS.len());
        for (field, label) in LINE_FIELDS {
            let pattern = format!(r"(?i){}\s*{}\s*(.*)", label.replace(' ', r"\s+"), LABEL_SEPARATORS);
            let regex = Regex::new(&pattern)
                .with_context(|| format!("failed to compile {field} label regex"))?;
            line_fields.push((*field, regex));
        }

        Ok(Self {
            cleaner,
            assembly_constituency: Regex::new(r"(?i)Assembly Constituency.*?[:\-]\s*(.*)")
                .context("failed to compile assembly constituency regex")?,
            part_no: Regex::new(r"(?i)Part No.*?[:.]\s*(\d+)")
                .context("failed to compile part number regex")?,
            line_fields,
            pin_code: Regex::new(&format!(r"(?i)Pin\s*code\s*{LABEL_SEPARATORS}\s*(\d+)"))
                .context("failed to compile pin code regex")?,
            station_name_positional: Regex::new(
                r"(?i)No\. and Name of Polling Station[\s\S]*?(\d+\s*-[^\n]+)",
            )
            .context("failed to compile positional polling station name regex")?,
            station_name_label: Regex::new(r"(?i)Polling Station.*?(?:Name|Address).*?[:\-]\s*(.*)")
                .context("failed to compile polling station label regex")?,
            station_type: Regex::new(r"(?i)Type of Polling Station[\s\S]*?(General|Male|Female)")
                .context("failed to compile polling station type regex")?,
            station_address: Regex::new(
                r"(?i)Stations in this part\s*[:\-]\s*([\s\S]*?)(?:\d+,|NUMBER OF ELECTORS|$)",
            )
            .context("failed to compile polling station address regex")?,
        })
    }

    pub fn extract(&self, text: &str) -> CommonInfo {
        let mut info = CommonInfo {
            assembly_constituency: first_capture(&self.assembly_constituency, text).and_then(
                |raw| {
                    // Drop the "| Part No.: .. |" box that sits on the same line.
                    let head = raw.split('|').next().unwrap_or(raw);
                    self.cleaner.clean_non_empty(head)
                },
            ),
            part_no: first_capture(&self.part_no, text)
                .and_then(|raw| self.cleaner.clean_non_empty(raw)),
            pin_code: first_capture(&self.pin_code, text)
                .and_then(|raw| self.cleaner.clean_non_empty(raw)),
            polling_station_name: self.polling_station_name(text),
            polling_station_type: first_capture(&self.station_type, text)
                .map(canonical_station_type),
            polling_station_address: first_capture(&self.station_address, text)
                .and_then(|raw| self.cleaner.clean_non_empty(&raw.replace('\n', " "))),
            ..CommonInfo::default()
        };

        for (field, regex) in &self.line_fields {
            let value = first_capture(regex, text).and_then(|raw| self.cleaner.clean_non_empty(raw));
            if value.is_none() {
                continue;
            }
            match *field {
                "main_town_or_village" => info.main_town_or_village = value,
                "post_office" => info.post_office = value,
                "police_station" => info.police_station = value,
                "block" => info.block = value,
                "subdivision" => info.subdivision = value,
                "district" => info.district = value,
                _ => {}
            }
        }

        info
    }

    /// The "N - Name" line under the section header wins; the generic label
    /// match is consulted only when it is absent.
    fn polling_station_name(&self, text: &str) -> Option<String> {
        if let Some(raw) = first_capture(&self.station_name_positional, text) {
            return self.cleaner.clean_non_empty(raw);
        }
        first_capture(&self.station_name_label, text).and_then(|raw| self.cleaner.clean_non_empty(raw))
    }
}

fn first_capture<'t>(regex: &Regex, text: &'t str) -> Option<&'t str> {
    regex
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

fn canonical_station_type(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "general" => "General".to_string(),
        "male" => "Male".to_string(),
        "female" => "Female".to_string(),
        _ => raw.trim().to_string(),
    }
}

use serde::{Deserialize, Serialize};

/// Polling-station attributes recovered from the cover page. Every field is
/// optional; a missing label simply leaves the field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_constituency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_town_or_village: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_office: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub police_station: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_station_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_station_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_station_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_electors: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelativeType {
    #[serde(rename = "Fathers")]
    Father,
    #[serde(rename = "Husbands")]
    Husband,
    #[serde(rename = "Mothers")]
    Mother,
}

impl RelativeType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelativeType::Father => "Fathers",
            RelativeType::Husband => "Husbands",
            RelativeType::Mother => "Mothers",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let lowered = label.to_ascii_lowercase();
        if lowered.starts_with("father") {
            Some(RelativeType::Father)
        } else if lowered.starts_with("husband") {
            Some(RelativeType::Husband)
        } else if lowered.starts_with("mother") {
            Some(RelativeType::Mother)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        if label.eq_ignore_ascii_case("male") {
            Some(Gender::Male)
        } else if label.eq_ignore_ascii_case("female") {
            Some(Gender::Female)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_type: Option<RelativeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Per-document artifact written by `extract` and consumed by `upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub common_info: CommonInfo,
    pub voters: Vec<VoterRecord>,
    pub voter_count: usize,
}

impl DocumentResult {
    pub fn new(common_info: CommonInfo, voters: Vec<VoterRecord>) -> Self {
        let voter_count = voters.len();
        Self {
            common_info,
            voters,
            voter_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersions {
    pub pdfinfo: Option<String>,
    pub pdftoppm: Option<String>,
    pub tesseract: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub filename: String,
    pub sha256: Option<String>,
    pub status: String,
    pub page_count: Option<usize>,
    pub voter_count: Option<usize>,
    pub output_path: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractCounts {
    pub pdf_count: usize,
    pub extracted_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub voters_total: usize,
    pub pages_skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub input_dir: String,
    pub output_dir: String,
    pub ocr_lang: String,
    pub dpi: u32,
    pub tool_versions: ToolVersions,
    pub counts: ExtractCounts,
    pub documents: Vec<DocumentOutcome>,
    pub warnings: Vec<String>,
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Result, bail};
use image::{DynamicImage, Rgb, RgbImage};

use crate::model::{CommonInfo, Gender, RelativeType, VoterRecord};

use super::collaborators::{OcrEngine, PageSegMode, Rasterizer};
use super::columns::{ColumnBand, column_bands, join_columns, segment_page};
use super::common_info::CommonInfoExtractor;
use super::document::{DocumentExtractor, PageTexts};
use super::stats::StatsExtractor;
use super::text::FieldCleaner;
use super::voters::{LineField, VoterScanner, normalize_age};

const COVER_TEXT: &str = "\
ELECTORAL ROLL 2024
Assembly Constituency : 123 - Rampur Nagar (SC) | Part No.: 45 |
Main Town or Village : Rampur
Post Office - Rampur Bazar
Police Station = Kotwali
Block : Sadar
Subdivision : Sadar North
District ? Kolkata
Pin code : 700001
No. and Name of Polling Station :
12 - Rampur Primary School Room 1
Type of Polling Station : General
Address of Polling Station : Number of Auxiliary Polling Stations in this part : Rampur Primary School,
Main Road, Rampur 4, NUMBER OF ELECTORS
";

const COLUMN_A: &str = "\
Name : Rahul Kumar
Father's Name: Suresh Kumar
House Number : 12A Photo
Age : 3& Gender : Male
TRW1234567
";

const COLUMN_B: &str = "\
Narne = Sita Devi
Husbands Name : Ram Prasad
House Numiber 7
Age ' 52 Gender * Female
TRW7654321 Available
";

const COLUMN_C: &str = "\
Name :- Mohan Lal
Mothers Name: Kamla Devi
Age +41 Gender - Male
XYZ0001112
";

const SUMMARY_TEXT: &str = "\
Summary of Electors
Mother Roll 78 178
Net Electors Total ... 450
";

fn scanner() -> VoterScanner {
    VoterScanner::new(FieldCleaner::new().expect("cleaner should compile"))
        .expect("scanner should compile")
}

fn common_info_extractor() -> CommonInfoExtractor {
    CommonInfoExtractor::new(FieldCleaner::new().expect("cleaner should compile"))
        .expect("common info extractor should compile")
}

fn expected_page_three_voters() -> Vec<VoterRecord> {
    vec![
        VoterRecord {
            name: "Rahul Kumar".to_string(),
            relative_type: Some(RelativeType::Father),
            relative_name: Some("Suresh Kumar".to_string()),
            house_number: Some("12A".to_string()),
            age: Some("38".to_string()),
            gender: Some(Gender::Male),
            id: Some("TRW1234567".to_string()),
        },
        VoterRecord {
            name: "Sita Devi".to_string(),
            relative_type: Some(RelativeType::Husband),
            relative_name: Some("Ram Prasad".to_string()),
            house_number: Some("7".to_string()),
            age: Some("52".to_string()),
            gender: Some(Gender::Female),
            id: Some("TRW7654321".to_string()),
        },
        VoterRecord {
            name: "Mohan Lal".to_string(),
            relative_type: Some(RelativeType::Mother),
            relative_name: Some("Kamla Devi".to_string()),
            house_number: None,
            age: Some("41".to_string()),
            gender: Some(Gender::Male),
            id: Some("XYZ0001112".to_string()),
        },
    ]
}

#[test]
fn clean_text_strips_bled_in_photo_labels() {
    let cleaner = FieldCleaner::new().expect("cleaner should compile");
    assert_eq!(cleaner.clean("  Ram Prasad  "), "Ram Prasad");
    assert_eq!(cleaner.clean("Ram Prasad Photo Available"), "Ram Prasad");
    assert_eq!(cleaner.clean("Ram Prasad avallable"), "Ram Prasad");
    assert_eq!(cleaner.clean("Ram Prasad Proto"), "Ram Prasad");
    assert_eq!(cleaner.clean_non_empty(" Photo "), None);
}

#[test]
fn scanner_emits_name_with_age_and_gender() {
    let voters = scanner().scan("Name: Alice\nsome noise\nAge : 30 Gender : Female\n");

    assert_eq!(voters.len(), 1);
    assert_eq!(voters[0].name, "Alice");
    assert_eq!(voters[0].age.as_deref(), Some("30"));
    assert_eq!(voters[0].gender, Some(Gender::Female));
}

#[test]
fn scanner_drops_names_without_corroborating_fields() {
    let text = "Name : Ghost\n|||\nName: Real\nAge : 30 Gender : Female\nName : Trailing\n";
    let voters = scanner().scan(text);

    assert_eq!(voters.len(), 1);
    assert_eq!(voters[0].name, "Real");
    assert!(scanner().scan("Name : Lonely\n").is_empty());
}

#[test]
fn scanner_starts_fresh_record_on_each_name_line() {
    let text = "House Number : 99\nName : Asha\nAge : 61 Gender : Female\n";
    let voters = scanner().scan(text);

    assert_eq!(voters.len(), 1);
    assert_eq!(voters[0].name, "Asha");
    assert_eq!(voters[0].house_number, None);
}

#[test]
fn scanner_requires_a_non_empty_name() {
    let voters = scanner().scan("Name : Photo\nAge : 30 Gender : Male\n");
    assert!(voters.is_empty());
}

#[test]
fn scanner_recovers_records_across_joined_columns() {
    let text = join_columns(&[COLUMN_A, COLUMN_B, COLUMN_C]);
    assert_eq!(scanner().scan(&text), expected_page_three_voters());
}

#[test]
fn classify_line_orders_rules_and_anchors_identifier_shape() {
    let scanner = scanner();

    assert_eq!(
        scanner.classify_line("NAME : Bina"),
        Some(LineField::Name("Bina".to_string()))
    );
    assert_eq!(
        scanner.classify_line("Husband's Name : Arun"),
        Some(LineField::Relative {
            kind: RelativeType::Husband,
            name: "Arun".to_string(),
        })
    );
    assert_eq!(
        scanner.classify_line("HouseNumber 4/1"),
        Some(LineField::HouseNumber("4/1".to_string()))
    );
    assert_eq!(
        scanner.classify_line("Age = 2& Gender ! FEMALE"),
        Some(LineField::AgeGender {
            age: "28".to_string(),
            gender: Gender::Female,
        })
    );
    assert_eq!(
        scanner.classify_line("ABC1234567"),
        Some(LineField::Identifier("ABC1234567".to_string()))
    );
    assert_eq!(scanner.classify_line("AB1234567"), None);
    assert_eq!(scanner.classify_line("ABCD123456"), None);
    assert_eq!(scanner.classify_line("Age : 44"), None);
}

#[test]
fn age_normalization_is_idempotent() {
    assert_eq!(normalize_age("7&"), "78");
    assert_eq!(normalize_age("78"), "78");
    assert_eq!(normalize_age(&normalize_age("7&")), "78");
}

#[test]
fn common_info_reads_cover_page_fields() {
    let info = common_info_extractor().extract(COVER_TEXT);

    assert_eq!(
        info.assembly_constituency.as_deref(),
        Some("123 - Rampur Nagar (SC)")
    );
    assert_eq!(info.part_no.as_deref(), Some("45"));
    assert_eq!(info.main_town_or_village.as_deref(), Some("Rampur"));
    assert_eq!(info.post_office.as_deref(), Some("Rampur Bazar"));
    assert_eq!(info.police_station.as_deref(), Some("Kotwali"));
    assert_eq!(info.block.as_deref(), Some("Sadar"));
    assert_eq!(info.subdivision.as_deref(), Some("Sadar North"));
    assert_eq!(info.district.as_deref(), Some("Kolkata"));
    assert_eq!(info.pin_code.as_deref(), Some("700001"));
    assert_eq!(
        info.polling_station_name.as_deref(),
        Some("12 - Rampur Primary School Room 1")
    );
    assert_eq!(info.polling_station_type.as_deref(), Some("General"));
    assert_eq!(
        info.polling_station_address.as_deref(),
        Some("Rampur Primary School, Main Road, Rampur")
    );
    assert_eq!(info.number_of_electors, None);
}

#[test]
fn common_info_labels_ignore_case_and_separator() {
    let extractor = common_info_extractor();
    for text in [
        "District - Kolkata",
        "District: Kolkata",
        "District = Kolkata",
        "district ? Kolkata",
    ] {
        assert_eq!(
            extractor.extract(text).district.as_deref(),
            Some("Kolkata"),
            "{text}"
        );
    }
}

#[test]
fn common_info_rejects_non_numeric_pin_and_leaves_missing_fields_absent() {
    let info = common_info_extractor().extract("Pin code : ABCDEF\nBlock : Sadar\n");

    assert_eq!(info.pin_code, None);
    assert_eq!(info.block.as_deref(), Some("Sadar"));
    assert_eq!(info.district, None);
    assert_eq!(common_info_extractor().extract(""), CommonInfo::default());
}

#[test]
fn polling_station_name_falls_back_to_label_match() {
    let info = common_info_extractor()
        .extract("Polling Station Name and Address : Town Hall, Ward 3\n");
    assert_eq!(
        info.polling_station_name.as_deref(),
        Some("Town Hall, Ward 3")
    );
}

#[test]
fn polling_station_name_prefers_numbered_line_over_label() {
    let extractor = common_info_extractor();
    let label_line = "Polling Station Name : Community Hall\n";
    let text = format!(
        "No. and Name of Polling Station :\n12 - Rampur Primary School\n{label_line}"
    );

    assert_eq!(
        extractor.extract(&text).polling_station_name.as_deref(),
        Some("12 - Rampur Primary School")
    );
    assert_eq!(
        extractor.extract(label_line).polling_station_name.as_deref(),
        Some("Community Hall")
    );
}

#[test]
fn polling_station_type_is_canonicalized() {
    let extractor = common_info_extractor();
    for (text, expected) in [
        ("Type of Polling Station : female", "Female"),
        ("TYPE OF POLLING STATION :\nmale", "Male"),
        ("Type of Polling Station : GENERAL", "General"),
    ] {
        assert_eq!(
            extractor.extract(text).polling_station_type.as_deref(),
            Some(expected),
            "{text}"
        );
    }
}

#[test]
fn stats_prefers_net_electors_over_mother_roll() {
    let stats = StatsExtractor::new().expect("stats extractor should compile");

    assert_eq!(stats.total_electors(SUMMARY_TEXT).as_deref(), Some("450"));
    assert_eq!(
        stats.total_electors("Mother Roll 78 178\nAdditions 0\n").as_deref(),
        Some("178")
    );
    assert_eq!(stats.total_electors("nothing useful here"), None);
}

#[test]
fn column_bands_cover_width_without_overlap() {
    assert_eq!(
        column_bands(100),
        vec![
            ColumnBand { x: 0, width: 33 },
            ColumnBand { x: 33, width: 33 },
            ColumnBand { x: 66, width: 34 },
        ]
    );
    assert_eq!(column_bands(30).iter().map(|band| band.width).sum::<u32>(), 30);
}

#[test]
fn join_columns_preserves_left_to_right_order() {
    assert_eq!(join_columns(&["A", "B", "C"]), "A\nB\nC");
    assert_eq!(join_columns(&["", "x\n", "y"]), "\nx\n\ny");
}

/// Encodes the page number in the red channel and the column index in the
/// green channel of every pixel.
fn page_image(page: usize) -> DynamicImage {
    const WIDTH: u32 = 30;
    DynamicImage::ImageRgb8(RgbImage::from_fn(WIDTH, 6, |x, _| {
        Rgb([page as u8, (x * 3 / WIDTH) as u8, 0])
    }))
}

struct FakeRasterizer {
    pages: usize,
    failing_pages: Vec<usize>,
    fail_inspect: bool,
}

impl FakeRasterizer {
    fn new(pages: usize) -> Self {
        Self {
            pages,
            failing_pages: Vec::new(),
            fail_inspect: false,
        }
    }
}

impl Rasterizer for FakeRasterizer {
    fn page_count(&self, _pdf_path: &Path) -> Result<usize> {
        if self.fail_inspect {
            bail!("corrupt document");
        }
        Ok(self.pages)
    }

    fn render_pages(
        &self,
        _pdf_path: &Path,
        first_page: usize,
        last_page: usize,
    ) -> Result<Vec<DynamicImage>> {
        if let Some(page) = (first_page..=last_page).find(|page| self.failing_pages.contains(page)) {
            bail!("page {page} failed to render");
        }
        Ok((first_page..=last_page).map(page_image).collect())
    }
}

#[derive(Default)]
struct FakeOcr {
    texts: HashMap<(u8, u8, PageSegMode), String>,
    calls: RefCell<Vec<(u8, u8, PageSegMode)>>,
}

impl FakeOcr {
    fn with_text(mut self, page: u8, column: u8, mode: PageSegMode, text: &str) -> Self {
        self.texts.insert((page, column, mode), text.to_string());
        self
    }
}

impl OcrEngine for FakeOcr {
    fn recognize(&self, image: &DynamicImage, mode: PageSegMode) -> Result<String> {
        let [page, column, _] = image.to_rgb8().get_pixel(0, 0).0;
        self.calls.borrow_mut().push((page, column, mode));
        Ok(self
            .texts
            .get(&(page, column, mode))
            .cloned()
            .unwrap_or_default())
    }
}

fn four_page_ocr() -> FakeOcr {
    FakeOcr::default()
        .with_text(1, 0, PageSegMode::Auto, COVER_TEXT)
        .with_text(3, 0, PageSegMode::UniformBlock, COLUMN_A)
        .with_text(3, 1, PageSegMode::UniformBlock, COLUMN_B)
        .with_text(3, 2, PageSegMode::UniformBlock, COLUMN_C)
        .with_text(4, 0, PageSegMode::Auto, SUMMARY_TEXT)
}

#[test]
fn segment_page_ocrs_each_band_as_uniform_block() {
    let ocr = FakeOcr::default()
        .with_text(3, 0, PageSegMode::UniformBlock, "left")
        .with_text(3, 1, PageSegMode::UniformBlock, "middle")
        .with_text(3, 2, PageSegMode::UniformBlock, "right");

    let text = segment_page(&ocr, &page_image(3)).expect("segmentation should succeed");

    assert_eq!(text, "left\nmiddle\nright");
    assert_eq!(
        *ocr.calls.borrow(),
        vec![
            (3, 0, PageSegMode::UniformBlock),
            (3, 1, PageSegMode::UniformBlock),
            (3, 2, PageSegMode::UniformBlock),
        ]
    );
}

#[test]
fn assemble_merges_summary_total_into_common_info() {
    let extractor = DocumentExtractor::new().expect("extractor should compile");
    let result = extractor.assemble(&PageTexts {
        cover: COVER_TEXT.to_string(),
        voter_pages: vec![join_columns(&[COLUMN_A, COLUMN_B, COLUMN_C])],
        summary: Some(SUMMARY_TEXT.to_string()),
    });

    assert_eq!(result.voter_count, 3);
    assert_eq!(result.voters, expected_page_three_voters());
    assert_eq!(result.common_info.number_of_electors.as_deref(), Some("450"));
}

#[test]
fn assemble_never_carries_a_record_across_pages() {
    let extractor = DocumentExtractor::new().expect("extractor should compile");
    let result = extractor.assemble(&PageTexts {
        cover: String::new(),
        voter_pages: vec![
            "Name : Split Voter\n".to_string(),
            "Age : 30 Gender : Male\nName : Whole Voter\nAge : 31 Gender : Female\n".to_string(),
        ],
        summary: None,
    });

    assert_eq!(result.voter_count, 1);
    assert_eq!(result.voters[0].name, "Whole Voter");
    assert_eq!(result.common_info.number_of_electors, None);
}

#[test]
fn process_pdf_extracts_four_page_document() {
    let extractor = DocumentExtractor::new().expect("extractor should compile");
    let ocr = four_page_ocr();

    let extraction = extractor
        .process_pdf(Path::new("roll.pdf"), &FakeRasterizer::new(4), &ocr)
        .expect("document should extract");

    assert_eq!(extraction.page_count, 4);
    assert!(extraction.skipped_pages.is_empty());
    assert_eq!(extraction.result.voter_count, 3);
    assert_eq!(extraction.result.voters, expected_page_three_voters());
    assert_eq!(
        extraction.result.common_info.number_of_electors.as_deref(),
        Some("450")
    );
    assert_eq!(
        extraction.result.common_info.district.as_deref(),
        Some("Kolkata")
    );

    let calls = ocr.calls.borrow();
    assert!(calls.iter().all(|(page, _, _)| *page != 2));
    assert_eq!(calls.first(), Some(&(1, 0, PageSegMode::Auto)));
    assert_eq!(calls.last(), Some(&(4, 0, PageSegMode::Auto)));
}

#[test]
fn process_pdf_skips_pages_that_fail_to_render() {
    let extractor = DocumentExtractor::new().expect("extractor should compile");
    let rasterizer = FakeRasterizer {
        failing_pages: vec![3],
        ..FakeRasterizer::new(4)
    };

    let extraction = extractor
        .process_pdf(Path::new("roll.pdf"), &rasterizer, &four_page_ocr())
        .expect("page failures should not fail the document");

    assert_eq!(extraction.skipped_pages, vec![3]);
    assert_eq!(extraction.result.voter_count, 0);
    assert_eq!(extraction.warnings.len(), 1);
    assert_eq!(
        extraction.result.common_info.number_of_electors.as_deref(),
        Some("450")
    );
}

#[test]
fn process_pdf_fails_document_when_inspection_or_cover_fails() {
    let extractor = DocumentExtractor::new().expect("extractor should compile");

    let corrupt = FakeRasterizer {
        fail_inspect: true,
        ..FakeRasterizer::new(4)
    };
    assert!(
        extractor
            .process_pdf(Path::new("bad.pdf"), &corrupt, &four_page_ocr())
            .is_err()
    );

    let broken_cover = FakeRasterizer {
        failing_pages: vec![1],
        ..FakeRasterizer::new(4)
    };
    assert!(
        extractor
            .process_pdf(Path::new("bad.pdf"), &broken_cover, &four_page_ocr())
            .is_err()
    );
}

#[test]
fn single_page_document_has_no_summary_or_voters() {
    let extractor = DocumentExtractor::new().expect("extractor should compile");
    let ocr = four_page_ocr();

    let extraction = extractor
        .process_pdf(Path::new("cover-only.pdf"), &FakeRasterizer::new(1), &ocr)
        .expect("single page document should extract");

    assert_eq!(extraction.result.voter_count, 0);
    assert_eq!(extraction.result.common_info.number_of_electors, None);
    assert_eq!(ocr.calls.borrow().len(), 1);
}

#[test]
fn document_result_serializes_without_absent_fields() {
    let extractor = DocumentExtractor::new().expect("extractor should compile");
    let result = extractor.assemble(&PageTexts {
        cover: "District : Kolkata\n".to_string(),
        voter_pages: vec![COLUMN_C.to_string()],
        summary: None,
    });

    let value = serde_json::to_value(&result).expect("result should serialize");
    assert_eq!(value["voter_count"], 1);
    assert_eq!(value["common_info"]["district"], "Kolkata");
    assert!(value["common_info"].get("pin_code").is_none());
    assert_eq!(value["voters"][0]["relative_type"], "Mothers");
    assert_eq!(value["voters"][0]["gender"], "Male");
    assert!(value["voters"][0].get("house_number").is_none());
}

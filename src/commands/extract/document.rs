use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::model::DocumentResult;

use super::collaborators::{OcrEngine, PageSegMode, Rasterizer};
use super::columns::segment_page;
use super::common_info::CommonInfoExtractor;
use super::stats::StatsExtractor;
use super::text::FieldCleaner;
use super::voters::VoterScanner;

/// Page 2 is the photo/map sheet; voter cells start on page 3.
pub const FIRST_VOTER_PAGE: usize = 3;

/// OCR text of one document, already split by role.
#[derive(Debug, Clone, Default)]
pub struct PageTexts {
    pub cover: String,
    pub voter_pages: Vec<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    pub result: DocumentResult,
    pub page_count: usize,
    pub skipped_pages: Vec<usize>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    common_info: CommonInfoExtractor,
    voters: VoterScanner,
    stats: StatsExtractor,
}

impl DocumentExtractor {
    pub fn new() -> Result<Self> {
        let cleaner = FieldCleaner::new()?;
        Ok(Self {
            common_info: CommonInfoExtractor::new(cleaner.clone())?,
            voters: VoterScanner::new(cleaner)?,
            stats: StatsExtractor::new()?,
        })
    }

    /// Builds the document result from OCR text alone. Each voter page is
    /// scanned on its own, so a record never spans two pages.
    pub fn assemble(&self, pages: &PageTexts) -> DocumentResult {
        let mut common_info = self.common_info.extract(&pages.cover);

        let voters = pages
            .voter_pages
            .iter()
            .flat_map(|page| self.voters.scan(page))
            .collect::<Vec<_>>();

        if let Some(total) = pages
            .summary
            .as_deref()
            .and_then(|text| self.stats.total_electors(text))
        {
            common_info.number_of_electors = Some(total);
        }

        DocumentResult::new(common_info, voters)
    }

    /// Rasterizes and OCRs one PDF, then assembles its result. Failing to
    /// count pages or to read the cover page fails the document; any other
    /// page failure only drops that page.
    pub fn process_pdf<R, O>(&self, pdf_path: &Path, rasterizer: &R, ocr: &O) -> Result<DocumentExtraction>
    where
        R: Rasterizer + ?Sized,
        O: OcrEngine + ?Sized,
    {
        let document = pdf_path.display().to_string();
        let page_count = rasterizer
            .page_count(pdf_path)
            .with_context(|| format!("failed to inspect {document}"))?;

        let cover_image = rasterizer
            .render_pages(pdf_path, 1, 1)
            .with_context(|| format!("failed to render cover page of {document}"))?
            .into_iter()
            .next()
            .with_context(|| format!("no image rendered for cover page of {document}"))?;
        let cover = ocr
            .recognize(&cover_image, PageSegMode::Auto)
            .with_context(|| format!("failed to OCR cover page of {document}"))?;

        let mut skipped_pages = Vec::new();
        let mut warnings = Vec::new();
        let mut voter_pages = Vec::new();

        for page in FIRST_VOTER_PAGE..=page_count {
            match self.voter_page_text(pdf_path, page, rasterizer, ocr) {
                Ok(Some(text)) => {
                    debug!(document = %document, page, chars = text.len(), "scanned voter page");
                    voter_pages.push(text);
                }
                Ok(None) => {
                    warn!(document = %document, page, "page rendered no image; skipping");
                    warnings.push(format!("{document} page {page}: no image rendered"));
                    skipped_pages.push(page);
                }
                Err(error) => {
                    warn!(document = %document, page, error = %error, "page failed; skipping");
                    warnings.push(format!("{document} page {page}: {error:#}"));
                    skipped_pages.push(page);
                }
            }
        }

        let summary = if page_count > 1 {
            match self.summary_page_text(pdf_path, page_count, rasterizer, ocr) {
                Ok(text) => text,
                Err(error) => {
                    warn!(
                        document = %document,
                        page = page_count,
                        error = %error,
                        "could not read summary page"
                    );
                    warnings.push(format!("{document} summary page {page_count}: {error:#}"));
                    None
                }
            }
        } else {
            None
        };

        let result = self.assemble(&PageTexts {
            cover,
            voter_pages,
            summary,
        });

        Ok(DocumentExtraction {
            result,
            page_count,
            skipped_pages,
            warnings,
        })
    }

    fn voter_page_text<R, O>(
        &self,
        pdf_path: &Path,
        page: usize,
        rasterizer: &R,
        ocr: &O,
    ) -> Result<Option<String>>
    where
        R: Rasterizer + ?Sized,
        O: OcrEngine + ?Sized,
    {
        let Some(image) = rasterizer.render_pages(pdf_path, page, page)?.into_iter().next() else {
            return Ok(None);
        };
        segment_page(ocr, &image).map(Some)
    }

    fn summary_page_text<R, O>(
        &self,
        pdf_path: &Path,
        page: usize,
        rasterizer: &R,
        ocr: &O,
    ) -> Result<Option<String>>
    where
        R: Rasterizer + ?Sized,
        O: OcrEngine + ?Sized,
    {
        let Some(image) = rasterizer.render_pages(pdf_path, page, page)?.into_iter().next() else {
            return Ok(None);
        };
        ocr.recognize(&image, PageSegMode::Auto).map(Some)
    }
}

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};

use super::collaborators::{OcrEngine, PageSegMode};

/// Voter pages print three cells per row.
pub const COLUMN_COUNT: u32 = 3;

/// Pixel span of one vertical band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnBand {
    pub x: u32,
    pub width: u32,
}

/// Splits `width` into `COLUMN_COUNT` adjacent, non-overlapping bands. The
/// last band absorbs the remainder so the bands always cover the full width.
pub fn column_bands(width: u32) -> Vec<ColumnBand> {
    (0..COLUMN_COUNT)
        .map(|index| {
            let start = (u64::from(width) * u64::from(index) / u64::from(COLUMN_COUNT)) as u32;
            let end = (u64::from(width) * u64::from(index + 1) / u64::from(COLUMN_COUNT)) as u32;
            ColumnBand {
                x: start,
                width: end - start,
            }
        })
        .collect()
}

/// OCRs each band as its own text block so reading order stays inside a
/// column, then joins the results left to right.
pub fn segment_page<O: OcrEngine + ?Sized>(ocr: &O, page: &DynamicImage) -> Result<String> {
    let height = page.height();
    let mut column_texts = Vec::with_capacity(COLUMN_COUNT as usize);

    for (index, band) in column_bands(page.width()).into_iter().enumerate() {
        let column = page.crop_imm(band.x, 0, band.width, height);
        let text = ocr
            .recognize(&column, PageSegMode::UniformBlock)
            .with_context(|| format!("failed to OCR column {}", index + 1))?;
        column_texts.push(text);
    }

    Ok(join_columns(&column_texts))
}

pub fn join_columns<S: AsRef<str>>(column_texts: &[S]) -> String {
    column_texts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

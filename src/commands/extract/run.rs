use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::cli::ExtractArgs;
use crate::model::{DocumentOutcome, ExtractCounts, ExtractRunManifest};
use crate::util::{
    discover_files, ensure_directory, file_name_string, now_utc_string, sha256_file,
    utc_compact_string, write_json_pretty,
};

use super::collaborators::{OcrEngine, Poppler, Rasterizer, Tesseract, collect_tool_versions};
use super::document::DocumentExtractor;

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("extract-{}", utc_compact_string(started_ts));

    if !args.input_dir.is_dir() {
        bail!("input directory not found: {}", args.input_dir.display());
    }
    ensure_directory(&args.output_dir)?;

    let mut pdf_paths = discover_files(&args.input_dir, "pdf")?;
    if let Some(max_docs) = args.max_docs {
        pdf_paths.truncate(max_docs);
    }

    if pdf_paths.is_empty() {
        warn!(input_dir = %args.input_dir.display(), "no PDF files found");
        return Ok(());
    }

    info!(
        run_id = %run_id,
        pdf_count = pdf_paths.len(),
        output_dir = %args.output_dir.display(),
        "starting extraction"
    );

    let extractor = DocumentExtractor::new()?;
    let rasterizer = Poppler::new(args.dpi)?;
    let ocr = Tesseract::new(args.ocr_lang.clone());

    let mut counts = ExtractCounts {
        pdf_count: pdf_paths.len(),
        ..ExtractCounts::default()
    };
    let mut documents = Vec::with_capacity(pdf_paths.len());
    let mut warnings = Vec::new();

    for (index, pdf_path) in pdf_paths.iter().enumerate() {
        let filename = file_name_string(pdf_path);
        let output_path = artifact_path(&args.output_dir, pdf_path);
        info!(
            document = %filename,
            position = index + 1,
            total = pdf_paths.len(),
            "processing document"
        );

        if args.skip_existing && output_path.exists() {
            info!(document = %filename, path = %output_path.display(), "artifact exists; skipping");
            counts.skipped_count += 1;
            documents.push(DocumentOutcome {
                filename,
                sha256: None,
                status: "skipped".to_string(),
                page_count: None,
                voter_count: None,
                output_path: Some(output_path.display().to_string()),
                error: None,
            });
            continue;
        }

        let sha256 = sha256_file(pdf_path).ok();
        match extract_one(&extractor, pdf_path, &output_path, &rasterizer, &ocr) {
            Ok(extraction) => {
                info!(
                    document = %filename,
                    path = %output_path.display(),
                    voters = extraction.voter_count,
                    pages = extraction.page_count,
                    "saved document artifact"
                );
                counts.extracted_count += 1;
                counts.voters_total += extraction.voter_count;
                counts.pages_skipped += extraction.skipped_pages;
                warnings.extend(extraction.warnings);
                documents.push(DocumentOutcome {
                    filename,
                    sha256,
                    status: "extracted".to_string(),
                    page_count: Some(extraction.page_count),
                    voter_count: Some(extraction.voter_count),
                    output_path: Some(output_path.display().to_string()),
                    error: None,
                });
            }
            Err(err) => {
                error!(document = %filename, error = %format!("{err:#}"), "document extraction failed");
                counts.failed_count += 1;
                documents.push(DocumentOutcome {
                    filename,
                    sha256,
                    status: "failed".to_string(),
                    page_count: None,
                    voter_count: None,
                    output_path: None,
                    error: Some(format!("{err:#}")),
                });
            }
        }
    }

    let manifest = ExtractRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: if counts.failed_count == 0 {
            "completed".to_string()
        } else {
            "completed_with_failures".to_string()
        },
        started_at,
        updated_at: now_utc_string(),
        input_dir: args.input_dir.display().to_string(),
        output_dir: args.output_dir.display().to_string(),
        ocr_lang: args.ocr_lang.clone(),
        dpi: args.dpi,
        tool_versions: collect_tool_versions(),
        counts,
        documents,
        warnings,
    };

    let manifest_path = args
        .output_dir
        .join("manifests")
        .join(format!("extract_run_{}.json", utc_compact_string(started_ts)));
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote extraction run manifest");
    info!(
        extracted = manifest.counts.extracted_count,
        skipped = manifest.counts.skipped_count,
        failed = manifest.counts.failed_count,
        voters = manifest.counts.voters_total,
        "extraction completed"
    );

    Ok(())
}

struct ExtractSummary {
    page_count: usize,
    voter_count: usize,
    skipped_pages: usize,
    warnings: Vec<String>,
}

fn extract_one<R, O>(
    extractor: &DocumentExtractor,
    pdf_path: &Path,
    output_path: &Path,
    rasterizer: &R,
    ocr: &O,
) -> Result<ExtractSummary>
where
    R: Rasterizer + ?Sized,
    O: OcrEngine + ?Sized,
{
    let extraction = extractor.process_pdf(pdf_path, rasterizer, ocr)?;
    write_json_pretty(output_path, &extraction.result)
        .with_context(|| format!("failed to save artifact for {}", pdf_path.display()))?;

    Ok(ExtractSummary {
        page_count: extraction.page_count,
        voter_count: extraction.result.voter_count,
        skipped_pages: extraction.skipped_pages.len(),
        warnings: extraction.warnings,
    })
}

/// `<output_dir>/<pdf stem>.json`
pub fn artifact_path(output_dir: &Path, pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    output_dir.join(format!("{stem}.json"))
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use image::{DynamicImage, ImageFormat};
use regex::Regex;

use crate::model::ToolVersions;

/// Layout hint passed to the OCR engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageSegMode {
    /// Whole page, free layout.
    Auto,
    /// A single uniform block of text, used for voter columns.
    UniformBlock,
}

impl PageSegMode {
    pub fn tesseract_psm(self) -> u8 {
        match self {
            PageSegMode::Auto => 3,
            PageSegMode::UniformBlock => 6,
        }
    }
}

pub trait Rasterizer {
    fn page_count(&self, pdf_path: &Path) -> Result<usize>;

    /// Renders the 1-based inclusive page range, in page order.
    fn render_pages(
        &self,
        pdf_path: &Path,
        first_page: usize,
        last_page: usize,
    ) -> Result<Vec<DynamicImage>>;
}

pub trait OcrEngine {
    fn recognize(&self, image: &DynamicImage, mode: PageSegMode) -> Result<String>;
}

/// poppler-utils backed rasterizer (`pdfinfo` + `pdftoppm`).
#[derive(Debug, Clone)]
pub struct Poppler {
    dpi: u32,
    pages_line: Regex,
}

impl Poppler {
    pub fn new(dpi: u32) -> Result<Self> {
        Ok(Self {
            dpi,
            pages_line: Regex::new(r"(?m)^Pages:\s+(\d+)\s*$")
                .context("failed to compile pdfinfo pages regex")?,
        })
    }
}

impl Rasterizer for Poppler {
    fn page_count(&self, pdf_path: &Path) -> Result<usize> {
        let output = Command::new("pdfinfo")
            .arg(pdf_path)
            .output()
            .with_context(|| format!("failed to execute pdfinfo for {}", pdf_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "pdfinfo returned non-zero exit status for {}: {}",
                pdf_path.display(),
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let count = self
            .pages_line
            .captures(&stdout)
            .and_then(|captures| captures.get(1))
            .with_context(|| format!("pdfinfo reported no page count for {}", pdf_path.display()))?
            .as_str()
            .parse::<usize>()
            .with_context(|| format!("invalid page count for {}", pdf_path.display()))?;

        Ok(count)
    }

    fn render_pages(
        &self,
        pdf_path: &Path,
        first_page: usize,
        last_page: usize,
    ) -> Result<Vec<DynamicImage>> {
        let work_dir = scratch_path(pdf_path, "render", first_page);
        fs::create_dir_all(&work_dir)
            .with_context(|| format!("failed to create {}", work_dir.display()))?;

        let rendered = render_into(pdf_path, &work_dir, self.dpi, first_page, last_page);
        let _ = fs::remove_dir_all(&work_dir);
        rendered
    }
}

fn render_into(
    pdf_path: &Path,
    work_dir: &Path,
    dpi: u32,
    first_page: usize,
    last_page: usize,
) -> Result<Vec<DynamicImage>> {
    let output = Command::new("pdftoppm")
        .arg("-png")
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-f")
        .arg(first_page.to_string())
        .arg("-l")
        .arg(last_page.to_string())
        .arg(pdf_path)
        .arg(work_dir.join("page"))
        .output()
        .with_context(|| format!("failed to execute pdftoppm for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftoppm returned non-zero exit status for {} pages {}-{}: {}",
            pdf_path.display(),
            first_page,
            last_page,
            stderr.trim()
        );
    }

    // pdftoppm zero-pads page suffixes, so lexical order is page order.
    let mut image_paths = Vec::new();
    for entry in fs::read_dir(work_dir)
        .with_context(|| format!("failed to read {}", work_dir.display()))?
    {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", work_dir.display()))?
            .path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("png") {
            image_paths.push(path);
        }
    }
    image_paths.sort();

    image_paths
        .iter()
        .map(|path| {
            image::open(path).with_context(|| format!("failed to load {}", path.display()))
        })
        .collect()
}

/// Runs the `tesseract` CLI over a temporary PNG.
#[derive(Debug, Clone)]
pub struct Tesseract {
    lang: String,
}

impl Tesseract {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }
}

impl OcrEngine for Tesseract {
    fn recognize(&self, image: &DynamicImage, mode: PageSegMode) -> Result<String> {
        let png_path = PathBuf::from(format!(
            "{}.png",
            scratch_path(Path::new("ocr"), "ocr", mode.tesseract_psm().into()).display()
        ));
        image
            .save_with_format(&png_path, ImageFormat::Png)
            .with_context(|| format!("failed to write {}", png_path.display()))?;

        let output = Command::new("tesseract")
            .arg(&png_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("--psm")
            .arg(mode.tesseract_psm().to_string())
            .output();
        let _ = fs::remove_file(&png_path);
        let output =
            output.with_context(|| format!("failed to execute tesseract for {}", png_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("tesseract returned non-zero exit status: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).replace('\u{0000}', ""))
    }
}

fn scratch_path(source: &Path, purpose: &str, discriminator: usize) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("pdf");
    let safe_stem = stem
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() {
                character
            } else {
                '_'
            }
        })
        .collect::<String>();

    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    std::env::temp_dir().join(format!(
        "eroll_{}_{}_{}_{}_{}",
        purpose,
        safe_stem,
        std::process::id(),
        discriminator,
        stamp
    ))
}

pub fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        pdfinfo: command_version_optional("pdfinfo", &["-v"]),
        pdftoppm: command_version_optional("pdftoppm", &["-v"]),
        tesseract: command_version_optional("tesseract", &["--version"]),
    }
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

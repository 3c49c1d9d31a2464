use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "eroll",
    version,
    about = "Electoral roll OCR extraction and import tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Upload(UploadArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long, default_value = "downloaded_pdfs")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "extracted_data_json")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = "eng")]
    pub ocr_lang: String,

    /// Rasterization resolution handed to pdftoppm.
    #[arg(long, default_value_t = 200)]
    pub dpi: u32,

    /// Leave documents alone when their JSON artifact already exists.
    #[arg(long, default_value_t = false)]
    pub skip_existing: bool,

    #[arg(long)]
    pub max_docs: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    #[arg(long, default_value = "extracted_data_json")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "electoral_roll.sqlite")]
    pub db_path: PathBuf,

    #[arg(long, default_value_t = 500)]
    pub batch_size: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "extracted_data_json")]
    pub output_dir: PathBuf,

    #[arg(long, default_value = "electoral_roll.sqlite")]
    pub db_path: PathBuf,
}

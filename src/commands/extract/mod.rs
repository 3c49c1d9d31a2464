mod collaborators;
mod columns;
mod common_info;
mod document;
mod run;
mod stats;
#[cfg(test)]
mod tests;
mod text;
mod voters;

pub use run::run;

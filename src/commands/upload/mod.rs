mod run;
mod store;

pub use run::run;
pub use store::count_rows;

pub mod cache;
pub mod check;
pub mod depends;
pub mod files;
pub mod generate;

pub mod hashes;
pub mod workbook;

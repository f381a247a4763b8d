pub mod json_canonical;
pub mod run_id;
pub mod zip;

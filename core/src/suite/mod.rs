pub mod coverage;
pub mod model;
pub mod prompt;
pub mod render;
pub mod script;
pub mod splitter;
pub mod table;
pub mod workflow;

pub mod cycle;
pub mod state;

pub mod fixed;
pub mod gemini;
pub mod interface;
pub mod loopback;
pub mod openai_compat;
pub mod providers;

pub mod api;
pub mod core;
pub mod input;
pub mod logging;
pub mod report;

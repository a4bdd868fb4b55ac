pub mod logging;
pub mod output;
pub mod print;
pub mod spinner;

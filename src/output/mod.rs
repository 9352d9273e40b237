#![forbid(unsafe_code)]

pub mod style;
pub mod table;

#![forbid(unsafe_code)]

pub mod dispatch;
pub mod fuzzy;
pub mod git;
pub mod registry;
pub mod select;
pub mod summary;

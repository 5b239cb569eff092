//! CLI command implementations

pub mod inspect;
pub mod resave;
pub mod run;

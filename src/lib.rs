// src/lib.rs

pub mod automation;
pub mod config;
pub mod driver;
pub mod extract;
pub mod reformat;
pub mod run;
pub mod session;
pub mod table;
pub mod validate;

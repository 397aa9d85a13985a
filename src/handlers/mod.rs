// src/handlers/mod.rs

pub mod case_study;
pub mod progress;
pub mod submission;
pub mod topic;

// src/models/mod.rs

pub mod attempt;
pub mod case_study;
pub mod submission;
pub mod topic;

// src/utils/mod.rs
pub mod dedup;
pub mod status_vocabulary;

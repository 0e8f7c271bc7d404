// src/services/mod.rs

pub mod accounts;
pub mod history;
pub mod question_repo;
pub mod recorder;
pub mod session;

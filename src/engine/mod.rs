//! Core computation: pure risk and book math, plus the polling engine.

pub mod book;
pub mod risk;
pub mod sync;

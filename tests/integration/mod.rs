//! Integration test modules, one per feature area.

pub mod mobility_tests;
pub mod runs_tests;
pub mod selection_tests;
pub mod structure_tests;

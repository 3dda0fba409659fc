//! Shared support code for the `md-mdfeed` binary.

pub mod common;

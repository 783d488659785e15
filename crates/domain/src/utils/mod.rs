//! Domain utility functions

pub mod url;

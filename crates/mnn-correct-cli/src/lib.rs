//! Command-line harness around the `mnn-correct` core.
//!
//! Loading matrices, parsing options and writing results all live here so the
//! core crate keeps no file-format or CLI surface.
pub mod commands;
pub mod io;
pub mod util;

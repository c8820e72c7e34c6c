//! UI module root: exposes drawing functions for individual panels.

pub mod console;
pub mod gauges;
pub mod header;
pub mod info;
pub mod theme;
pub mod util;

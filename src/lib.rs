//! tikiblocks: a status line built from shell command blocks.

pub mod aggregator;
pub mod bar;
pub mod blocks;
pub mod config;
pub mod error;
pub mod sinks;
pub mod worker;

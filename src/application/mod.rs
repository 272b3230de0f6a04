//! Application services: the compile job runner and the retention sweeper.

pub mod auth;
pub mod compile;
pub mod error;
pub mod retention;
pub mod toolchain;

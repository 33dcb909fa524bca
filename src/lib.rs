#![warn(clippy::all)]

pub mod harness;
pub mod lang;

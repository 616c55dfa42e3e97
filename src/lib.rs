//! This is the library of the size bot, which labels pull requests by the number of changed lines.
pub mod config;
pub mod github;
pub mod sizer;
pub mod utils;

#[cfg(test)]
mod tests;

pub mod api;
pub mod core;
pub mod error;
pub mod models;
pub mod storage;
pub mod tui;

#[cfg(test)]
mod testing;

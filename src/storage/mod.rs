mod file;

pub use file::{load_props, Storage};

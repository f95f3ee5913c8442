mod app;

pub use app::{App, FieldInput, InputMode, InputValue, PendingAction};

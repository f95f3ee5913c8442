pub mod params;
pub mod resolver;
pub mod response;
pub mod styles;
pub mod view;
pub mod wrapper;

pub use resolver::{ConfigResolver, LoadState};
pub use styles::{HostDocument, ShadowScope, StyleNode, StylesheetLink};
pub use view::View;
pub use wrapper::FormWrapper;

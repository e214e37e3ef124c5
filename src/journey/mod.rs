mod document;
mod state;
mod transition;

pub use document::*;
pub use state::*;
pub use transition::*;

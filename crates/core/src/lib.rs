pub mod event;
pub mod outcome;
pub mod template;

pub use event::*;
pub use outcome::*;
pub use template::expand;

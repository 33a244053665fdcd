mod drag;
mod flatten;
mod mutate;
mod tree;
mod window;

pub use crate::drag::*;
pub use crate::flatten::*;
pub use crate::mutate::*;
pub use crate::tree::*;
pub use crate::window::*;

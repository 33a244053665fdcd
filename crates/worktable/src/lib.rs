mod table;

pub use crate::table::*;

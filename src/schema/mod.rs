//! Input and output schemas
//!
//! The input side reads incident CSV files into tables; the output side is the
//! ordered feature schema the classifier was trained on.

mod features;
mod reader;

pub use features::*;
pub use reader::*;

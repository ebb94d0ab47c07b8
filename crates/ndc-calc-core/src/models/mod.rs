//! Domain models for the NDC calculator.

mod calculation;
mod concept;
mod directive;
mod matching;
mod package;
mod warning;

pub use calculation::*;
pub use concept::*;
pub use directive::*;
pub use matching::*;
pub use package::*;
pub use warning::*;

pub mod lanes;
pub mod palette;

pub use lanes::*;
pub use palette::*;

pub mod axis;
pub mod frame;
pub mod palette;
pub mod shape;

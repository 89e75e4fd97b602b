pub mod frame;
pub mod svg;

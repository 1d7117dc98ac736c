pub mod corridor;
pub mod polyline;

pub use corridor::Corridor;
pub use polyline::Polyline;

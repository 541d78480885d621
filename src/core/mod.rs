pub mod crop;
pub mod geometry;
pub mod model;
pub mod template;

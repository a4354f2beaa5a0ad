pub mod math;

pub use math::{Rotator, Vec3};

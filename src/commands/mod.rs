pub mod display;
pub mod fetch;
pub mod transform;

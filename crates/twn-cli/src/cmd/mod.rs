pub mod build;
pub mod dev;
pub mod extract;
pub mod flatten;

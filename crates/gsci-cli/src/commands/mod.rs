pub mod index;
pub mod portfolio;

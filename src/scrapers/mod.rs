pub mod base;
pub mod constituents;
pub mod news;
pub mod yahoo;

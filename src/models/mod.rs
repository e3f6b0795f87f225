pub mod instrument;
pub mod market;
pub mod news;

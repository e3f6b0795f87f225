pub mod breadth;
pub mod market;
pub mod report_service;

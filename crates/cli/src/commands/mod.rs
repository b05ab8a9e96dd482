pub mod analyzers;
pub mod review;

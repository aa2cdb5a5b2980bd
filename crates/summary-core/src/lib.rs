pub mod accumulator;
pub mod error;
pub mod highlight;
pub mod histogram;
pub mod keywords;
pub mod pipeline;
pub mod producer;
pub mod similarity;

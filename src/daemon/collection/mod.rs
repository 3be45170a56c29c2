pub mod accumulator;
pub mod scanner;

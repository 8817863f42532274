pub mod contracts;
pub mod debug;
pub mod results;

pub mod accumulator;
pub mod destination;
mod message;
mod publisher;
mod types;

pub use accumulator::*;
pub use message::*;
pub use publisher::*;
pub use types::*;

pub extern crate serde;
pub extern crate serde_json;

#[macro_use]
extern crate log;

mod config;
mod dissect;
mod error;
mod layer;
mod packet;
mod source;

pub use config::Config;
pub use dissect::*;
pub use error::*;
pub use layer::*;
pub use packet::*;
pub use source::*;

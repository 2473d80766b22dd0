#[macro_use]
extern crate serde;

mod circuit;
mod election;
mod error;
mod field;
mod groth16;
mod hash;
mod identifier;
mod merkle;
mod params;
mod proof;
mod prover;
mod relay;
mod serde_hex;
mod signals;
mod store;
mod util;

pub use circuit::*;
pub use election::*;
pub use error::*;
pub use field::*;
pub use groth16::*;
pub use hash::*;
pub use identifier::*;
pub use merkle::*;
pub use params::*;
pub use proof::*;
pub use prover::*;
pub use relay::*;
pub use serde_hex::*;
pub use signals::*;
pub use store::*;
pub use util::*;

#[cfg(test)]
mod tests;

#![warn(missing_docs)]

//! Light-weight helpers shared across the Warden crates. Their chief
//! quality is that they have virtually zero dependencies.

mod time;
pub use time::*;

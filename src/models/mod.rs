mod auth;
mod connections;
mod devices;
mod links;
pub mod ports;
mod topology;

pub use auth::*;
pub use connections::*;
pub use devices::*;
pub use links::*;
pub use topology::*;

#[cfg(test)]
pub(crate) use topology::fixtures;

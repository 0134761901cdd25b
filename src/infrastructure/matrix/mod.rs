//! Matrix homeserver adapter implementing the `ChatClient` port.

mod client;
mod types;

pub use client::MatrixClient;

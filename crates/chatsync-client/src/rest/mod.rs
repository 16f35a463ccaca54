mod client;

pub use client::{RestBackend, RestBackendBuilder};

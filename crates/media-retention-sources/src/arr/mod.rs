pub mod api;
pub mod client;

pub use api::{ArrHttpClient, ArrKind};
pub use client::ArrDeleter;

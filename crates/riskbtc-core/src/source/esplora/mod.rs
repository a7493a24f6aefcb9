mod client;
mod connection;
mod parsing;

pub use client::EsploraClient;

pub mod client;

pub use client::VibeModel;

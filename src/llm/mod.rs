pub mod client;
pub mod client_impl;
pub mod factory;

pub use client::{GenerationClient, MockGenerationClient};
pub use factory::create_client;

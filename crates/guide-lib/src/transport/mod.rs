//! HTTP boundary between the conversational front end and the vision service.

pub mod client;
pub mod server;
pub mod wire;

pub use client::VisionClient;
pub use server::{router, serve};
pub use wire::{ErrorResponse, PredictResponse};

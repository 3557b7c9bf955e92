//! API route definitions

pub mod health;
pub mod stream;
pub mod webhook;

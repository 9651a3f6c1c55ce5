//! Concrete provider implementations.

pub mod openai;

pub mod common;
mod token_lifecycle;

pub mod token;
pub mod token_manager;
pub mod token_store;

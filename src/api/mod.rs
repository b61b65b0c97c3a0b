pub mod aggregation;
pub mod dispatcher;
pub mod models;
pub mod smappee;

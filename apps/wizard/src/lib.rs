pub mod config;
pub mod errors;
pub mod form;
pub mod gateway;
pub mod models;
pub mod notify;
pub mod routes;
pub mod state;
pub mod wizard;

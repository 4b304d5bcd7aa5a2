pub mod routes;
pub mod session;
pub mod spotify;

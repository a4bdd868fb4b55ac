pub mod reporter;
pub mod server;

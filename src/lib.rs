pub mod authorizer;
pub mod db;
pub mod emitter;
pub mod error;
pub mod events;
pub mod ledger;
pub mod model;
pub mod resolver;
pub mod server;

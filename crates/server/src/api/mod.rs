pub mod catalog;
pub mod handlers;
pub mod middleware;
pub mod player;
pub mod routes;
pub mod searches;
pub mod watch;

pub use routes::create_router;

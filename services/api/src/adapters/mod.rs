pub mod auth;
pub mod db;

pub use auth::{CookieAuthAdapter, SessionLookup};
pub use db::DbAdapter;

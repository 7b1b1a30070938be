pub mod errors;
pub mod db;
pub mod user;
pub mod service_listing;
pub mod order;

pub use user::Role;

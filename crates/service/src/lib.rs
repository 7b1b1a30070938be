//! Service layer for the marketplace backend.
//! - Separates business logic from data access and from the HTTP surface.
//! - Every external collaborator (store, cache, mail, payments, images) sits behind a trait
//!   with an always-compiled in-memory `mock` for tests.
//! - Reuses entity definitions and persistence helpers from the `models` crate.

pub mod errors;
pub mod pagination;
pub mod auth;
pub mod mail;
pub mod media;
pub mod users;
pub mod listings;
pub mod payments;
pub mod orders;

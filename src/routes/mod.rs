//! Router Module Index
//!
//! Splits the page routes by who may reach them. Access control is applied per
//! group with a route layer in `create_router`.

/// Pages reachable without a session (sign-in, registration, health).
pub mod public;

/// Dashboard pages for any signed-in user.
pub mod authenticated;

/// Dashboard pages restricted to the `admin` role.
pub mod admin;

//! Bazaar storefront library.
//!
//! Accounts, cart, coupons, Razorpay checkout and invoices. The binary in
//! `main.rs` wires these into an axum server; the library form lets the
//! integration tests reach the services and repositories.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod flash;
pub mod middleware;
pub mod models;
pub mod razorpay;
pub mod routes;
pub mod services;
pub mod state;

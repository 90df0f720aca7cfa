//! Business logic services.

pub mod application;
pub mod auth;
pub mod confirmation;
pub mod document;
pub mod notify;
pub mod payment;
pub mod receipt;
pub mod review;
pub mod statistics;

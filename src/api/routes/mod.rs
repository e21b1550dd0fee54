//! API Routes
//!
//! Route handlers organized by functionality.

pub mod assistant;
pub mod health;

//! Data models for the price-comparison backend.
//!
//! These models match the JSON contract of the HTTP surface.

mod alert;
mod basket;
mod product;
mod user;

pub use alert::*;
pub use basket::*;
pub use product::*;
pub use user::*;

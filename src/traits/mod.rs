//! Trait definitions for Yeti operations.
//!
//! Each API generation implements the traits it supports, encapsulating
//! endpoint and body differences in the implementations.

mod entities;
mod links;
mod observables;

pub use entities::EntityApi;
pub use links::LinkApi;
pub use observables::ObservableApi;

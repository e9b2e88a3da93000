//! Protocol adapters, one per API generation.
//!
//! [`YetiApi`] speaks the legacy endpoints and [`YetiV2Api`] the v2 ones.
//! Both implement [`ObservableApi`](crate::ObservableApi),
//! [`EntityApi`](crate::EntityApi) and [`LinkApi`](crate::LinkApi), so code
//! written against the traits works with either server.

mod legacy;
mod v2;

pub use legacy::YetiApi;
pub use v2::YetiV2Api;

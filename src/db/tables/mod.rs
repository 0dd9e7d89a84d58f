pub mod listings;
pub mod payments;

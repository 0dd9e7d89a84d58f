pub mod listing;

pub use listing::{Listing, ListingFilter};

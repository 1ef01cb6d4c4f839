pub mod booking;
pub mod listing;
pub mod rental_days;
pub mod status;
pub mod time_slots;

pub use booking::BookingRecord;
pub use listing::{Contact, Listing, ListingKind, PriceRange, DEFAULT_CURRENCY};
pub use rental_days::RentalDays;
pub use status::ModerationStatus;
pub use time_slots::{RawTimeSlots, TimeCommitment, TimeSlotsError};

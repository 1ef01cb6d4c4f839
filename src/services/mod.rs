pub mod calendar;
pub mod csv_export;
pub mod currency;
pub mod moderation;
pub mod overlap;
pub mod search;

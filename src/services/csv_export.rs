use chrono::{DateTime, NaiveDateTime};

use crate::models::{Listing, ListingKind, RentalDays, TimeCommitment, DEFAULT_CURRENCY};

/// Keeps spreadsheet apps from guessing a legacy encoding.
pub const UTF8_BOM: &str = "\u{FEFF}";

pub const EMPTY_FIELD: &str = "Empty";

pub const DEMAND_HEADERS: [&str; 15] = [
    "Title",
    "Description",
    "Start time",
    "End time",
    "Min price",
    "Max price",
    "Currency",
    "Category",
    "Status",
    "Created",
    "Needs support",
    "Note",
    "Owner ID",
    "Owner email",
    "Owner name",
];

/// Services carry weekly rental days instead of a start/end window.
pub const SERVICE_HEADERS: [&str; 14] = [
    "Title",
    "Description",
    "Min price",
    "Max price",
    "Currency",
    "Rental days",
    "Category",
    "Status",
    "Created",
    "Needs support",
    "Note",
    "Owner ID",
    "Owner email",
    "Owner name",
];

pub fn headers_for(kind: ListingKind) -> &'static [&'static str] {
    match kind {
        ListingKind::Service => &SERVICE_HEADERS,
        ListingKind::Demand => &DEMAND_HEADERS,
    }
}

/// Quotes a field when it holds a comma, quote or newline. Blank and
/// missing values render as [`EMPTY_FIELD`].
pub fn escape_field(field: Option<&str>) -> String {
    let Some(value) = field.filter(|v| !v.trim().is_empty()) else {
        return EMPTY_FIELD.to_string();
    };
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One CSV for one listing kind; every row uses that kind's columns.
pub fn export_listings_csv(kind: ListingKind, listings: &[Listing]) -> String {
    let mut lines = Vec::with_capacity(listings.len() + 1);
    lines.push(headers_for(kind).join(","));
    lines.extend(listings.iter().map(|l| listing_row(kind, l)));
    format!("{UTF8_BOM}{}", lines.join("\n"))
}

fn listing_row(kind: ListingKind, listing: &Listing) -> String {
    let price = listing.price_range.as_ref();
    // zero prices are shown as empty, same as missing ones
    let amount = |v: Option<i64>| v.filter(|n| *n != 0).map(|n| n.to_string());
    let min = amount(price.and_then(|p| p.min));
    let max = amount(price.and_then(|p| p.max));
    let currency = price
        .map(|p| p.currency.as_str())
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CURRENCY);
    let created = listing.created_at.format("%Y-%m-%d").to_string();

    let mut fields = vec![
        escape_field(Some(&listing.title)),
        escape_field(listing.description.as_deref()),
    ];
    match kind {
        ListingKind::Demand => {
            let (start, end) = match &listing.selected_time_slots {
                TimeCommitment::DateRange { start, end } => {
                    (Some(display_timestamp(start)), Some(display_timestamp(end)))
                }
                _ => (None, None),
            };
            fields.extend([
                escape_field(start.as_deref()),
                escape_field(end.as_deref()),
                escape_field(min.as_deref()),
                escape_field(max.as_deref()),
                escape_field(Some(currency)),
            ]);
        }
        ListingKind::Service => {
            let days = RentalDays::from_stored(&listing.weekdays).display_with("; ");
            fields.extend([
                escape_field(min.as_deref()),
                escape_field(max.as_deref()),
                escape_field(Some(currency)),
                escape_field(Some(&days)),
            ]);
        }
    }
    fields.extend([
        escape_field(listing.category.as_deref()),
        escape_field(Some(listing.status.label())),
        escape_field(Some(&created)),
        escape_field(Some(if listing.need_support { "Yes" } else { "No" })),
        escape_field(listing.note.as_deref()),
        escape_field(listing.owner_id.as_deref()),
        escape_field(listing.owner_email.as_deref()),
        escape_field(listing.owner_name.as_deref()),
    ]);
    fields.join(",")
}

fn display_timestamp(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.naive_utc().format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    raw.to_string()
}

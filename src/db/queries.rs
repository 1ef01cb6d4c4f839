use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use serde::{de::DeserializeOwned, Serialize};

use crate::models::{
    BookingRecord, Contact, Listing, ListingKind, ModerationStatus, PriceRange, TimeCommitment,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now_str() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn optional_json<T: Serialize>(value: Option<&T>) -> anyhow::Result<Option<String>> {
    value.map(to_json).transpose()
}

fn from_json_or_default<T: DeserializeOwned + Default>(column: &str, raw: Option<String>) -> T {
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, column, "unreadable JSON column, using default");
            T::default()
        }),
        None => T::default(),
    }
}

// ── Listings ──

const LISTING_COLUMNS: &str = "id, kind, title, description, price_range, weekdays, selected_time_slots, \
     category, note, status, need_support, contacts, post_content, image_urls, is_public, \
     owner_id, owner_email, owner_name, created_at, updated_at";

pub fn create_listing(conn: &Connection, listing: &Listing) -> anyhow::Result<()> {
    let sql = format!(
        "INSERT INTO listings ({LISTING_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
    );
    conn.execute(
        &sql,
        params![
            listing.id,
            listing.kind.as_str(),
            listing.title,
            listing.description,
            optional_json(listing.price_range.as_ref())?,
            to_json(&listing.weekdays)?,
            optional_json(listing.selected_time_slots.to_raw().as_ref())?,
            listing.category,
            listing.note,
            listing.status.as_str(),
            listing.need_support,
            to_json(&listing.contacts)?,
            listing.post_content,
            to_json(&listing.image_urls)?,
            listing.is_public,
            listing.owner_id,
            listing.owner_email,
            listing.owner_name,
            format_ts(&listing.created_at),
            format_ts(&listing.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_listing(conn: &Connection, id: &str) -> anyhow::Result<Option<Listing>> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_listing_row(row)));

    match result {
        Ok(listing) => Ok(Some(listing?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_listings(
    conn: &Connection,
    kind: Option<ListingKind>,
    status: Option<ModerationStatus>,
) -> anyhow::Result<Vec<Listing>> {
    let mut clauses: Vec<&str> = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(kind) = kind {
        params_vec.push(Box::new(kind.as_str()));
        clauses.push(if params_vec.len() == 1 { "kind = ?1" } else { "kind = ?2" });
    }
    if let Some(status) = status {
        params_vec.push(Box::new(status.as_str()));
        clauses.push(if params_vec.len() == 1 { "status = ?1" } else { "status = ?2" });
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {LISTING_COLUMNS} FROM listings {where_clause} ORDER BY created_at DESC, id ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_listing_row(row)))?;

    let mut listings = vec![];
    for row in rows {
        listings.push(row??);
    }
    Ok(listings)
}

/// Writes the fields editable from the listing form.
pub fn update_listing(conn: &Connection, listing: &Listing) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE listings SET
           title = ?1,
           description = ?2,
           price_range = ?3,
           weekdays = ?4,
           selected_time_slots = ?5,
           category = ?6,
           note = ?7,
           status = ?8,
           contacts = ?9,
           updated_at = ?10
         WHERE id = ?11",
        params![
            listing.title,
            listing.description,
            optional_json(listing.price_range.as_ref())?,
            to_json(&listing.weekdays)?,
            optional_json(listing.selected_time_slots.to_raw().as_ref())?,
            listing.category,
            listing.note,
            listing.status.as_str(),
            to_json(&listing.contacts)?,
            now_str(),
            listing.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn update_listing_status(
    conn: &Connection,
    id: &str,
    status: ModerationStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE listings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_str(), id],
    )?;
    Ok(count > 0)
}

pub fn save_post(
    conn: &Connection,
    id: &str,
    post_content: &str,
    image_urls: &[String],
    is_public: bool,
    status: ModerationStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE listings SET post_content = ?1, image_urls = ?2, is_public = ?3, status = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            post_content,
            to_json(&image_urls)?,
            is_public,
            status.as_str(),
            now_str(),
            id
        ],
    )?;
    Ok(count > 0)
}

fn parse_listing_row(row: &rusqlite::Row) -> anyhow::Result<Listing> {
    let kind_str: String = row.get(1)?;
    let kind = ListingKind::parse(&kind_str)
        .ok_or_else(|| anyhow::anyhow!("unknown listing kind: {kind_str}"))?;
    let slots_json: Option<String> = row.get(6)?;
    let status_str: String = row.get(9)?;
    let created_at_str: String = row.get(18)?;
    let updated_at_str: String = row.get(19)?;

    Ok(Listing {
        id: row.get(0)?,
        kind,
        title: row.get(2)?,
        description: row.get(3)?,
        price_range: from_json_or_default::<Option<PriceRange>>("price_range", row.get(4)?),
        weekdays: from_json_or_default::<Vec<String>>("weekdays", row.get(5)?),
        selected_time_slots: TimeCommitment::from_stored(slots_json.as_deref()),
        category: row.get(7)?,
        note: row.get(8)?,
        status: ModerationStatus::parse(&status_str),
        need_support: row.get(10)?,
        contacts: from_json_or_default::<Vec<Contact>>("contacts", row.get(11)?),
        post_content: row.get(12)?,
        image_urls: from_json_or_default::<Vec<String>>("image_urls", row.get(13)?),
        is_public: row.get(14)?,
        owner_id: row.get(15)?,
        owner_email: row.get(16)?,
        owner_name: row.get(17)?,
        created_at: parse_ts(&created_at_str),
        updated_at: parse_ts(&updated_at_str),
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, listing_id, applicant_name, applicant_id, note, expect_price_range, \
     status, selected_time_slots, created_at, updated_at";

pub fn create_booking(conn: &Connection, booking: &BookingRecord) -> anyhow::Result<()> {
    let sql = format!(
        "INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
    );
    conn.execute(
        &sql,
        params![
            booking.id,
            booking.listing_id,
            booking.applicant_name,
            booking.applicant_id,
            booking.note,
            optional_json(booking.expect_price_range.as_ref())?,
            booking.status.as_str(),
            optional_json(booking.selected_time_slots.to_raw().as_ref())?,
            format_ts(&booking.created_at),
            format_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

/// The sibling snapshot the duplicate detector runs over.
pub fn get_bookings_for_listing(
    conn: &Connection,
    listing_id: &str,
) -> anyhow::Result<Vec<BookingRecord>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE listing_id = ?1 ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![listing_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingRecord>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_booking_row(row)));

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: ModerationStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_str(), id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<BookingRecord> {
    let status_str: String = row.get(6)?;
    let slots_json: Option<String> = row.get(7)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    Ok(BookingRecord {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        applicant_name: row.get(2)?,
        applicant_id: row.get(3)?,
        note: row.get(4)?,
        expect_price_range: from_json_or_default::<Option<PriceRange>>(
            "expect_price_range",
            row.get(5)?,
        ),
        status: ModerationStatus::parse(&status_str),
        selected_time_slots: TimeCommitment::from_stored(slots_json.as_deref()),
        created_at: parse_ts(&created_at_str),
        updated_at: parse_ts(&updated_at_str),
    })
}

// ── Dashboard ──

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub categories: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub services: KindStats,
    pub demands: KindStats,
}

impl DashboardStats {
    fn kind_mut(&mut self, kind: ListingKind) -> &mut KindStats {
        match kind {
            ListingKind::Service => &mut self.services,
            ListingKind::Demand => &mut self.demands,
        }
    }
}

pub fn get_dashboard_stats(conn: &Connection) -> anyhow::Result<DashboardStats> {
    let mut stats = DashboardStats::default();

    let mut stmt =
        conn.prepare("SELECT kind, status, COUNT(*) FROM listings GROUP BY kind, status")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;
    for row in rows {
        let (kind, status, count) = row?;
        let Some(kind) = ListingKind::parse(&kind) else {
            continue;
        };
        let entry = stats.kind_mut(kind);
        entry.total += count;
        match ModerationStatus::parse(&status) {
            ModerationStatus::Pending => entry.pending += count,
            ModerationStatus::Approved => entry.approved += count,
            ModerationStatus::Rejected => entry.rejected += count,
        }
    }

    let mut stmt = conn.prepare(
        "SELECT kind, category, COUNT(*) FROM listings
         WHERE category IS NOT NULL AND TRIM(category) != ''
         GROUP BY kind, category",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;
    for row in rows {
        let (kind, category, count) = row?;
        if let Some(kind) = ListingKind::parse(&kind) {
            stats.kind_mut(kind).categories.insert(category, count);
        }
    }

    Ok(stats)
}

const DAY_ORDER: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// Weekdays on which a service can be rented, e.g. `["mon", "wed"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalDays {
    pub days: Vec<String>,
}

impl RentalDays {
    /// Normalizes to lowercase, drops repeats, and rejects unknown days.
    pub fn parse(days: &[String]) -> anyhow::Result<Self> {
        let mut normalized: Vec<String> = Vec::with_capacity(days.len());
        for day in days {
            let day = parse_weekday(day)?;
            if !normalized.iter().any(|d| d == day) {
                normalized.push(day.to_string());
            }
        }
        normalized.sort_by_key(|d| day_index(d));
        Ok(Self { days: normalized })
    }

    /// Lenient view over stored values; unknown days sort last.
    pub fn from_stored(days: &[String]) -> Self {
        let mut days = days.to_vec();
        days.sort_by_key(|d| day_index(d));
        Self { days }
    }

    pub fn to_human_readable(&self) -> String {
        self.display_with(", ")
    }

    /// Uppercase day names joined with `separator`.
    pub fn display_with(&self, separator: &str) -> String {
        self.days
            .iter()
            .map(|d| d.to_uppercase())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

fn day_index(day: &str) -> usize {
    let day = day.to_lowercase();
    DAY_ORDER.iter().position(|d| *d == day).unwrap_or(DAY_ORDER.len())
}

fn parse_weekday(s: &str) -> anyhow::Result<&'static str> {
    let lower = s.trim().to_lowercase();
    DAY_ORDER
        .iter()
        .find(|d| **d == lower)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("invalid weekday: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_parse_sorts_and_dedupes() {
        let parsed = RentalDays::parse(&days(&["fri", "Mon", "mon", "wed"])).unwrap();
        assert_eq!(parsed.days, days(&["mon", "wed", "fri"]));
    }

    #[test]
    fn test_parse_invalid_day() {
        assert!(RentalDays::parse(&days(&["mon", "xyz"])).is_err());
    }

    #[test]
    fn test_human_readable() {
        let parsed = RentalDays::parse(&days(&["sun", "tue"])).unwrap();
        assert_eq!(parsed.to_human_readable(), "TUE, SUN");
    }

    #[test]
    fn test_empty_is_empty_string() {
        assert_eq!(RentalDays::from_stored(&[]).to_human_readable(), "");
        assert_eq!(
            RentalDays::from_stored(&days(&["sat", "mon"])).display_with("; "),
            "MON; SAT"
        );
    }
}

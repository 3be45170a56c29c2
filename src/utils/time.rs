use chrono::NaiveDate;

pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%d";

/// This is the standard way of converting a date to a string in gametime.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format(RECORD_DATE_FORMAT).to_string()
}

/// Inverse of [date_to_record_name]. Returns [None] for anything that isn't a record date.
pub fn record_name_to_date(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, RECORD_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{date_to_record_name, record_name_to_date};

    #[test]
    fn test_record_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_to_record_name(date), "2024-03-07");
        assert_eq!(record_name_to_date("2024-03-07"), Some(date));
        assert_eq!(record_name_to_date("aliases"), None);
    }
}

use chrono::{DateTime, Duration, NaiveDate, Utc};

pub fn news_window(now_utc: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    let to = now_utc.date_naive();
    (to - Duration::days(1), to)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// UTC now as RFC 3339 with milliseconds, as stamped on saved pipeline records.
pub fn get_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

//! Small helpers shared by the library and the CLI.

/// Trim user or environment input, treating blank text as absent.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Wall-clock "now" in Unix milliseconds, the unit of ids and version stamps.
pub fn unix_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_counts_as_absent() {
        assert_eq!(normalize_text_option(Some("\t \n".to_string())), None);
        assert_eq!(
            normalize_text_option(Some("  Main hall ".to_string())).as_deref(),
            Some("Main hall")
        );
    }

    #[test]
    fn clock_reads_milliseconds() {
        // Any date after 2001-09-09 has a 13-digit millisecond timestamp.
        assert!(unix_timestamp_millis() >= 1_000_000_000_000);
    }
}

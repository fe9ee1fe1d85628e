use chrono::Local;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Local wall-clock time for report headers.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" ts, ,js,  prefab ");
        assert_eq!(parts, vec!["ts", "js", "prefab"]);
    }

    #[test]
    fn timestamp_has_date_and_time() {
        let stamp = timestamp();
        assert_eq!(stamp.len(), "2025-01-01 00:00:00".len());
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], " ");
    }
}

// 🧪 Synthetic Dataset
// A year of plausible weekly records for local development without the feed

use chrono::{Duration, NaiveDate};

use crate::record::{format_iso_week, Metric, Pathogen, SurveillanceRecord};

pub const MOCK_WEEKS: i64 = 52;

/// Influenza positivity and RSV case counts for the 52 weeks before `today`, oldest first.
pub fn generate_mock_records(today: NaiveDate) -> Vec<SurveillanceRecord> {
    let mut records = Vec::with_capacity(MOCK_WEEKS as usize * 2);

    for weeks_ago in (1..=MOCK_WEEKS).rev() {
        let iso_week = format_iso_week(today - Duration::weeks(weeks_ago));
        let step = weeks_ago as f64;

        records.push(SurveillanceRecord::new(
            iso_week.clone(),
            Pathogen::Influenza,
            Metric::PositivityRate,
            5.0 + (step % 10.0) * 2.5,
        ));
        records.push(SurveillanceRecord::new(
            iso_week,
            Pathogen::Rsv,
            Metric::Cases,
            50.0 + (step % 15.0) * 10.0,
        ));
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_shape() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let records = generate_mock_records(today);

        assert_eq!(records.len(), 104);
        // Oldest week first: 52 weeks before 2024-W10
        assert_eq!(records[0].iso_week, "2023-W10");
        assert_eq!(records[103].iso_week, "2024-W09");
        assert_eq!(records[0].pathogen, Pathogen::Influenza);
        assert_eq!(records[1].pathogen, Pathogen::Rsv);
    }

    #[test]
    fn test_mock_values_in_range() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let records = generate_mock_records(today);

        // weeks_ago = 52: 5.0 + 2 * 2.5 and 50.0 + 7 * 10.0
        assert_eq!(records[0].value, 10.0);
        assert_eq!(records[1].value, 120.0);
        assert!(records
            .iter()
            .filter(|r| r.metric == Metric::PositivityRate)
            .all(|r| (0.0..=100.0).contains(&r.value)));
    }
}

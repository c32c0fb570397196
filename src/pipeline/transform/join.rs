// Stage C: crime-to-district inner join

use super::crime::CleanedCrime;
use super::district::CleanedDistrict;
use crate::domain::CanonicalCrimeRecord;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub rows: Vec<CanonicalCrimeRecord>,
    /// Crime rows whose district id had no district row
    pub unmatched_crimes: usize,
}

/// Inner join on `district_id`.
///
/// Output follows crime order; a crime matching several district rows yields
/// one output row per match, in district order.
pub fn join_crimes_with_districts(
    crimes: &[CleanedCrime],
    districts: &[CleanedDistrict],
) -> JoinOutcome {
    let mut by_id: HashMap<i64, Vec<&CleanedDistrict>> = HashMap::new();
    for district in districts {
        by_id.entry(district.district_id).or_default().push(district);
    }

    let mut rows = Vec::with_capacity(crimes.len());
    let mut unmatched_crimes = 0;

    for crime in crimes {
        let Some(matches) = by_id.get(&crime.district_id) else {
            unmatched_crimes += 1;
            continue;
        };

        rows.extend(matches.iter().map(|district| CanonicalCrimeRecord {
            district_id: crime.district_id,
            day_of_week: crime.day_of_week.clone(),
            date: crime.date,
            time: crime.time,
            crime_type: crime.crime_type.clone(),
            nearest_patrol_distance_km: crime.nearest_patrol_distance_km,
            district_name: district.district_name.clone(),
            population: district.population,
            governor: district.governor.clone(),
        }));
    }

    JoinOutcome {
        rows,
        unmatched_crimes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn crime(district_id: i64, crime_type: &str) -> CleanedCrime {
        CleanedCrime {
            district_id,
            day_of_week: "Monday".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            crime_type: crime_type.to_string(),
            nearest_patrol_distance_km: 1.0,
        }
    }

    fn district(district_id: i64, name: &str) -> CleanedDistrict {
        CleanedDistrict {
            district_id,
            district_name: name.to_string(),
            population: 100,
            governor: "Smith".to_string(),
        }
    }

    #[test]
    fn test_unmatched_crimes_are_dropped() {
        let outcome = join_crimes_with_districts(
            &[crime(1, "Theft"), crime(2, "Fraud"), crime(1, "Assault")],
            &[district(1, "Alpha")],
        );

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.unmatched_crimes, 1);
        assert_eq!(outcome.rows[0].crime_type, "Theft");
        assert_eq!(outcome.rows[1].crime_type, "Assault");
        assert!(outcome.rows.iter().all(|r| r.district_name == "Alpha"));
    }

    #[test]
    fn test_unreferenced_districts_contribute_nothing() {
        let outcome = join_crimes_with_districts(
            &[crime(1, "Theft")],
            &[district(1, "Alpha"), district(9, "Omega")],
        );
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.unmatched_crimes, 0);
    }

    #[test]
    fn test_duplicate_keys_produce_cross_product() {
        let outcome = join_crimes_with_districts(
            &[crime(1, "Theft"), crime(1, "Fraud")],
            &[district(1, "Alpha"), district(1, "Alpha Prime")],
        );

        let pairs: Vec<(&str, &str)> = outcome
            .rows
            .iter()
            .map(|r| (r.crime_type.as_str(), r.district_name.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Theft", "Alpha"),
                ("Theft", "Alpha Prime"),
                ("Fraud", "Alpha"),
                ("Fraud", "Alpha Prime"),
            ]
        );
    }

    #[test]
    fn test_empty_sides() {
        assert!(join_crimes_with_districts(&[], &[district(1, "Alpha")]).rows.is_empty());
        let outcome = join_crimes_with_districts(&[crime(1, "Theft")], &[]);
        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.unmatched_crimes, 1);
    }
}

// Stage B: district cleaning

use crate::config::TransformRules;
use crate::domain::{KeyedRow, StagedDistrictRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct CleanedDistrict {
    pub district_id: i64,
    pub district_name: String,
    pub population: i64,
    pub governor: String,
}

/// Remove every occurrence of each token, then collapse whitespace runs and trim.
/// Matching is literal substring matching, so a token inside a longer word is removed too.
pub fn strip_placeholders(value: &str, tokens: &[String]) -> String {
    let mut stripped = value.to_string();
    for token in tokens.iter().filter(|t| !t.is_empty()) {
        stripped = stripped.replace(token.as_str(), "");
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn clean_district_rows(
    rows: &[KeyedRow<StagedDistrictRecord>],
    rules: &TransformRules,
) -> Vec<CleanedDistrict> {
    rows.iter()
        .map(|row| CleanedDistrict {
            district_id: row.record.district_id,
            district_name: strip_placeholders(&row.record.district_name, &rules.placeholder_tokens),
            population: row.record.population,
            governor: strip_placeholders(&row.record.governor, &rules.placeholder_tokens),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Vec<String> {
        TransformRules::default().placeholder_tokens
    }

    #[test]
    fn test_placeholder_removed_and_trimmed() {
        assert_eq!(strip_placeholders("District Alpha", &tokens()), "Alpha");
        assert_eq!(strip_placeholders("District Smith", &tokens()), "Smith");
        assert_eq!(strip_placeholders("Upper District East", &tokens()), "Upper East");
        assert_eq!(strip_placeholders("Beta", &tokens()), "Beta");
    }

    #[test]
    fn test_placeholder_is_case_sensitive_substring() {
        assert_eq!(strip_placeholders("district Alpha", &tokens()), "district Alpha");
        assert_eq!(strip_placeholders("Districts", &tokens()), "s");
        assert_eq!(strip_placeholders("District", &tokens()), "");
    }

    #[test]
    fn test_clean_rows_keeps_ids_and_population() {
        let rows = vec![KeyedRow::new(
            1,
            StagedDistrictRecord {
                district_id: 4,
                district_name: "District Alpha".to_string(),
                population: 10000,
                governor: "District Smith".to_string(),
            },
        )];

        let cleaned = clean_district_rows(&rows, &TransformRules::default());
        assert_eq!(
            cleaned,
            vec![CleanedDistrict {
                district_id: 4,
                district_name: "Alpha".to_string(),
                population: 10000,
                governor: "Smith".to_string(),
            }]
        );
    }

    #[test]
    fn test_extra_tokens_from_rules() {
        let mut rules = TransformRules::default();
        rules.placeholder_tokens.push("Province".to_string());
        assert_eq!(
            strip_placeholders("Province District North", &rules.placeholder_tokens),
            "North"
        );
    }
}

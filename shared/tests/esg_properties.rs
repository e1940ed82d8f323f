use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use proptest::test_runner::Config;
use serde_json::{json, Value};
use shared::{
    format_emissions_value, parse_formatted, validate_date_range, validate_emissions_data,
    NumberFormat,
};

fn instant(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("timestamp in range")
}

proptest! {
    #![proptest_config(Config::with_cases(256))]

    #[test]
    fn non_negative_finite_numbers_are_valid(v in 0.0_f64..1e15) {
        prop_assert!(validate_emissions_data(&json!(v)));
    }

    #[test]
    fn negative_numbers_are_invalid(v in -1e15_f64..-1e-9) {
        prop_assert!(!validate_emissions_data(&json!(v)));
    }

    #[test]
    fn strings_are_invalid(s in ".*") {
        prop_assert!(!validate_emissions_data(&Value::String(s)));
    }

    #[test]
    fn ordered_ranges_are_valid(start in 0_i64..4_000_000_000, len in 0_i64..400_000_000) {
        let start = instant(start);
        prop_assert!(validate_date_range(&start, &(start + Duration::seconds(len))));
        prop_assert!(validate_date_range(&start, &start));
    }

    #[test]
    fn inverted_ranges_are_invalid(start in 0_i64..4_000_000_000, gap in 1_i64..400_000_000) {
        let start = instant(start);
        prop_assert!(!validate_date_range(&(start + Duration::seconds(gap)), &start));
    }

    #[test]
    fn formatted_values_match_display_pattern(v in 0.0_f64..1e15) {
        let out = format_emissions_value(v).expect("finite input");
        let (integer, fraction) = out.split_once('.').expect("decimal point");
        prop_assert_eq!(fraction.len(), 2);
        prop_assert!(fraction.chars().all(|c| c.is_ascii_digit()));
        let groups: Vec<&str> = integer.split(',').collect();
        prop_assert!(!groups[0].is_empty() && groups[0].len() <= 3);
        prop_assert!(groups[1..].iter().all(|g| g.len() == 3));
        prop_assert!(groups.iter().all(|g| g.chars().all(|c| c.is_ascii_digit())));
    }

    #[test]
    // Up to 1e12 the two-decimal rendering has at most 15 significant digits,
    // so it survives a round trip through f64 exactly.
    fn reformatting_is_idempotent(v in 0.0_f64..1e12) {
        let once = format_emissions_value(v).expect("finite input");
        let parsed = parse_formatted(&once, &NumberFormat::EN_US).expect("own output parses");
        let twice = format_emissions_value(parsed).expect("finite input");
        prop_assert_eq!(once, twice);
    }
}

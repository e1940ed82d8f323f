// Validation and display rules for ESG data, shared by every consumer of
// emissions readings (engine service, CSV import, CLI output).

/// Predicates and narrowing functions for emissions readings and reporting periods.
pub mod esg_validation {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use serde_json::Value;

    use crate::error::ValidationError;
    use crate::models::DateRange;

    /// An emissions reading that is known to be finite and non-negative.
    #[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
    pub struct EmissionsValue(f64);

    impl EmissionsValue {
        pub fn get(self) -> f64 {
            self.0
        }
    }

    impl TryFrom<f64> for EmissionsValue {
        type Error = ValidationError;

        fn try_from(value: f64) -> Result<Self, Self::Error> {
            if validate_emissions_value(value) {
                Ok(Self(value))
            } else {
                Err(ValidationError::InvalidEmissionsValue(format!(
                    "{} is not a finite, non-negative number",
                    value
                )))
            }
        }
    }

    // The one place where unchecked input becomes a verified number.
    impl TryFrom<&Value> for EmissionsValue {
        type Error = ValidationError;

        fn try_from(value: &Value) -> Result<Self, Self::Error> {
            match value {
                Value::Number(n) => {
                    let v = n.as_f64().ok_or_else(|| {
                        ValidationError::InvalidEmissionsValue(format!(
                            "{} is not representable as a number",
                            n
                        ))
                    })?;
                    Self::try_from(v)
                }
                other => Err(ValidationError::InvalidEmissionsValue(format!(
                    "expected a number, got {}",
                    json_type_name(other)
                ))),
            }
        }
    }

    fn json_type_name(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        }
    }

    /// Typed predicate: finite and `>= 0`.
    pub fn validate_emissions_value(value: f64) -> bool {
        value.is_finite() && value >= 0.0
    }

    /// Returns true only for JSON numbers that are finite and `>= 0`.
    /// Strings, null, booleans, arrays and objects are all invalid, even a
    /// string such as `"42"`. Never panics.
    pub fn validate_emissions_data(value: &Value) -> bool {
        EmissionsValue::try_from(value).is_ok()
    }

    /// `start <= end`, compared at millisecond resolution. Equal instants form
    /// a valid single-point range.
    pub fn validate_date_range<Tz1: TimeZone, Tz2: TimeZone>(
        start: &DateTime<Tz1>,
        end: &DateTime<Tz2>,
    ) -> bool {
        start.timestamp_millis() <= end.timestamp_millis()
    }

    /// Parses RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) or a
    /// calendar date `YYYY-MM-DD` (midnight UTC).
    pub fn parse_date(input: &str) -> Result<DateTime<Utc>, ValidationError> {
        let s = input.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(naive.and_utc());
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(date.and_time(NaiveTime::MIN).and_utc());
        }
        Err(ValidationError::InvalidArgument(format!(
            "'{}' is not a recognised date (expected YYYY-MM-DD or RFC 3339)",
            input
        )))
    }

    /// Malformed text fails with `InvalidArgument`, an inverted range with
    /// `InvertedDateRange`.
    pub fn parse_date_range(start: &str, end: &str) -> Result<DateRange, ValidationError> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        DateRange::new(start, end)
    }

}

/// Display formatting of emissions values.
pub mod esg_format {
    use serde::{Deserialize, Serialize};

    use crate::error::ValidationError;

    const MAX_FRACTION_DIGITS: usize = 20;

    /// Separators and precision used to render numbers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct NumberFormat {
        pub grouping: char,
        pub decimal: char,
        pub fraction_digits: usize,
    }

    impl NumberFormat {
        /// `1,234.57`
        pub const EN_US: NumberFormat = NumberFormat {
            grouping: ',',
            decimal: '.',
            fraction_digits: 2,
        };

        /// `1.234,57`
        pub const PT_BR: NumberFormat = NumberFormat {
            grouping: '.',
            decimal: ',',
            fraction_digits: 2,
        };

        pub fn new(grouping: char, decimal: char, fraction_digits: usize) -> Result<Self, ValidationError> {
            let format = Self {
                grouping,
                decimal,
                fraction_digits,
            };
            format.validate()?;
            Ok(format)
        }

        pub fn validate(&self) -> Result<(), ValidationError> {
            if self.grouping == self.decimal {
                return Err(ValidationError::InvalidArgument(format!(
                    "grouping and decimal separators must differ (both '{}')",
                    self.grouping
                )));
            }
            for sep in [self.grouping, self.decimal] {
                if sep.is_ascii_digit() || sep == '-' {
                    return Err(ValidationError::InvalidArgument(format!(
                        "'{}' cannot be used as a separator",
                        sep
                    )));
                }
            }
            if self.fraction_digits > MAX_FRACTION_DIGITS {
                return Err(ValidationError::InvalidArgument(format!(
                    "at most {} fraction digits are supported, got {}",
                    MAX_FRACTION_DIGITS, self.fraction_digits
                )));
            }
            Ok(())
        }
    }

    impl Default for NumberFormat {
        fn default() -> Self {
            Self::EN_US
        }
    }

    /// Formats with the default `NumberFormat::EN_US`:
    /// `1234.567 -> "1,234.57"`, `0 -> "0.00"`.
    pub fn format_emissions_value(value: f64) -> Result<String, ValidationError> {
        format_with(value, &NumberFormat::EN_US)
    }

    /// Groups the integer digits, rounds half away from zero to
    /// `fraction_digits` and never uses scientific notation. Negative values
    /// keep their sign unless they round to zero; NaN and infinities are
    /// rejected.
    ///
    /// Rounding is exact only up to about 15 significant digits. Beyond that
    /// the value is first reduced to its shortest round-trip decimal form.
    pub fn format_with(value: f64, format: &NumberFormat) -> Result<String, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidArgument(format!(
                "cannot format non-finite value {}",
                value
            )));
        }
        format.validate()?;

        let (integer, fraction) = round_half_away(value.abs(), format.fraction_digits);
        let is_zero = integer.bytes().chain(fraction.bytes()).all(|b| b == b'0');

        let mut out = String::with_capacity(integer.len() * 4 / 3 + fraction.len() + 2);
        if value.is_sign_negative() && !is_zero {
            out.push('-');
        }
        push_grouped(&mut out, &integer, format.grouping);
        if format.fraction_digits > 0 {
            out.push(format.decimal);
            out.push_str(&fraction);
        }
        Ok(out)
    }

    /// Inverse of `format_with`: strips grouping separators and reads the
    /// decimal separator. Only an optional leading `-`, digits and one decimal
    /// separator are accepted.
    pub fn parse_formatted(input: &str, format: &NumberFormat) -> Result<f64, ValidationError> {
        let trimmed = input.trim();
        let invalid = || {
            ValidationError::InvalidArgument(format!("'{}' is not a formatted number", input))
        };

        let mut normalized = String::with_capacity(trimmed.len());
        let mut seen_decimal = false;
        let mut seen_digit = false;
        for (i, c) in trimmed.chars().enumerate() {
            match c {
                '-' if i == 0 => normalized.push('-'),
                c if c == format.grouping && !seen_decimal => {}
                c if c == format.decimal && !seen_decimal => {
                    seen_decimal = true;
                    normalized.push('.');
                }
                c if c.is_ascii_digit() => {
                    seen_digit = true;
                    normalized.push(c);
                }
                _ => return Err(invalid()),
            }
        }
        if !seen_digit {
            return Err(invalid());
        }
        normalized.parse::<f64>().map_err(|_| invalid())
    }

    // Works on the shortest round-trip decimal string of the value (what
    // `Display` for f64 produces, never with an exponent), so `1.005` rounds
    // to `1.01` rather than following the binary approximation.
    //
    // Past ~15 significant digits the shortest string is itself already
    // rounded, so this rounds twice: `1e15 + 0.125` is stored exactly but
    // prints as `...000.1` and formats to `.10`, not `.13`.
    fn round_half_away(magnitude: f64, fraction_digits: usize) -> (String, String) {
        let repr = magnitude.to_string();
        let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

        let mut digits: Vec<u8> = int_part
            .bytes()
            .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(fraction_digits))
            .collect();

        if frac_part.as_bytes().get(fraction_digits).is_some_and(|d| *d >= b'5') {
            let mut carry = true;
            for d in digits.iter_mut().rev() {
                if *d == b'9' {
                    *d = b'0';
                } else {
                    *d += 1;
                    carry = false;
                    break;
                }
            }
            if carry {
                digits.insert(0, b'1');
            }
        }

        let split = digits.len() - fraction_digits;
        let integer = digits[..split].iter().map(|&b| b as char).collect();
        let fraction = digits[split..].iter().map(|&b| b as char).collect();
        (integer, fraction)
    }

    fn push_grouped(out: &mut String, integer: &str, grouping: char) {
        let len = integer.len();
        for (i, ch) in integer.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                out.push(grouping);
            }
            out.push(ch);
        }
    }

}

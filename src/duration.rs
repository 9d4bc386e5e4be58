use crate::error::DurationParseError;
use std::time::Duration;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const WEEK: f64 = 7.0 * DAY;

/// Parse an ISO-8601 duration such as `PT30M`, `P0DT1H5M` or `PT5400.0S`.
///
/// Year and month designators are rejected since they have no fixed length.
/// A range such as `PT15-20M` counts as its upper bound.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let fail = |reason| DurationParseError {
        input: input.to_string(),
        reason,
    };

    let rest = input
        .trim()
        .strip_prefix(['P', 'p'])
        .ok_or_else(|| fail("missing leading 'P'"))?;

    let (date_part, time_part) = match rest.find(['T', 't']) {
        Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
        None => (rest, None),
    };

    let mut seconds = 0.0;
    let mut components = 0;

    for (value, designator) in components_of(date_part).map_err(fail)? {
        seconds += value
            * match designator {
                'W' => WEEK,
                'D' => DAY,
                'Y' | 'M' => return Err(fail("calendar years and months are not supported")),
                _ => return Err(fail("unknown date designator")),
            };
        components += 1;
    }

    if let Some(time_part) = time_part {
        if time_part.is_empty() {
            return Err(fail("empty time section"));
        }
        for (value, designator) in components_of(time_part).map_err(fail)? {
            seconds += value
                * match designator {
                    'H' => HOUR,
                    'M' => MINUTE,
                    'S' => 1.0,
                    _ => return Err(fail("unknown time designator")),
                };
            components += 1;
        }
    }

    if components == 0 {
        return Err(fail("no duration components"));
    }
    if !seconds.is_finite() || seconds >= u64::MAX as f64 {
        return Err(fail("duration out of range"));
    }

    Ok(Duration::from_secs_f64(seconds))
}

/// Whole minutes of a duration, rounding leftover seconds to the nearest minute
pub fn total_minutes(duration: Duration) -> u64 {
    (duration.as_secs() + 30) / 60
}

fn components_of(section: &str) -> Result<Vec<(f64, char)>, &'static str> {
    let mut components = Vec::new();
    let mut number = String::new();

    for c in section.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else if c == '.' || c == ',' {
            number.push('.');
        } else if c == '-' {
            if number.is_empty() || number.contains('-') {
                return Err("misplaced range separator");
            }
            number.push('-');
        } else if c.is_ascii_alphabetic() {
            if number.is_empty() {
                return Err("designator without a value");
            }
            let value = match number.split_once('-') {
                Some((low, high)) => {
                    let low: f64 = low.parse().map_err(|_| "invalid number")?;
                    let high: f64 = high.parse().map_err(|_| "invalid range")?;
                    if high < low {
                        return Err("descending range");
                    }
                    high
                }
                None => number.parse().map_err(|_| "invalid number")?,
            };
            components.push((value, c.to_ascii_uppercase()));
            number.clear();
        } else {
            return Err("unexpected character");
        }
    }

    if !number.is_empty() {
        return Err("value without a designator");
    }

    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(input: &str) -> u64 {
        total_minutes(parse_duration(input).unwrap())
    }

    #[test]
    fn test_equivalent_representations() {
        assert_eq!(minutes("PT1H30M"), 90);
        assert_eq!(minutes("PT90M"), 90);
        assert_eq!(minutes("PT5400S"), 90);
        assert_eq!(minutes("PT5400.0S"), 90);
        assert_eq!(minutes("PT1.5H"), 90);
    }

    #[test]
    fn test_chefkoch_day_prefixed_format() {
        assert_eq!(minutes("P0DT0H5M"), 5);
        assert_eq!(minutes("P0DT1H20M"), 80);
        assert_eq!(minutes("P1DT2H"), 26 * 60);
        assert_eq!(minutes("P0DT0H0M"), 0);
    }

    #[test]
    fn test_weeks() {
        assert_eq!(minutes("P1W"), 7 * 24 * 60);
    }

    #[test]
    fn test_ranges_use_upper_bound() {
        assert_eq!(minutes("PT15-20M"), 20);
        assert_eq!(minutes("PT1H10-15M"), 75);
        assert_eq!(minutes("P0DT1-2H"), 120);
    }

    #[test]
    fn test_malformed_durations() {
        for input in [
            "", "30M", "P", "PT", "PT30", "PTM", "P1Y", "P2M", "PT3X", "PT 30M", "PT-20M",
            "PT15-M", "PT20-15M", "PT1-2-3M",
        ] {
            assert!(parse_duration(input).is_err(), "{input:?} should fail");
        }
    }

    #[test]
    fn test_error_keeps_input() {
        let err = parse_duration("PT3X").unwrap_err();
        assert_eq!(err.input, "PT3X");
    }
}

//! Minimal ISO-8601 duration literal support (`PT60S`, `PT1H30M`, …) for the
//! `lease_duration` field — the rest of the wire format uses plain JSON types
//! that serde/chrono already cover, so this is the one bespoke bit of codec.

use std::time::Duration;

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoDuration(pub Duration);

impl<'de> Deserialize<'de> for IsoDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map(IsoDuration).map_err(DeError::custom)
    }
}

impl Serialize for IsoDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(self.0))
    }
}

fn parse(raw: &str) -> Result<Duration, String> {
    let rest = raw
        .strip_prefix('P')
        .ok_or_else(|| format!("'{raw}' is not an ISO-8601 duration: must start with 'P'"))?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };

    let mut total_secs = parse_units(date_part, &[('D', 86_400.0)])?;
    total_secs += parse_units(time_part, &[('H', 3600.0), ('M', 60.0), ('S', 1.0)])?;

    Duration::try_from_secs_f64(total_secs)
        .map_err(|_| format!("'{raw}' denotes a negative or non-finite duration"))
}

fn parse_units(segment: &str, units: &[(char, f64)]) -> Result<f64, String> {
    let mut total = 0.0;
    let mut number = String::new();
    for ch in segment.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            number.push(ch);
            continue;
        }
        let (_, scale) = units
            .iter()
            .find(|(unit, _)| *unit == ch)
            .ok_or_else(|| format!("unexpected unit '{ch}' in ISO-8601 duration '{segment}'"))?;
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid numeric component '{number}' in ISO-8601 duration"))?;
        total += value * scale;
        number.clear();
    }
    if !number.is_empty() {
        return Err(format!("trailing component '{number}' with no unit"));
    }
    Ok(total)
}

fn format(d: Duration) -> String {
    format!("PT{}S", d.as_secs())
}

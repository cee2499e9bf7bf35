use serde::Serialize;

/// Saucer colors used by the device diagnostics panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TempColor {
    Gray,
    LightBlue,
    Blue,
    Yellow,
    Red,
    Green,
}

/// Treats zero and NaN the same as a missing reading.
fn reading(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

/// Color for a CPU temperature in degrees C.
pub fn color_from_temp(temp: Option<f64>) -> TempColor {
    let Some(temp) = reading(temp) else {
        return TempColor::Gray;
    };

    if temp < 0.0 {
        TempColor::LightBlue
    } else if temp < 10.0 {
        TempColor::Blue
    } else if temp > 75.0 {
        TempColor::Red
    } else if temp > 60.0 {
        TempColor::Yellow
    } else {
        TempColor::Green
    }
}

/// Rounds half up, toward positive infinity.
fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Empirical curve fit from dBm to a signal percentage. Not clamped.
pub fn wifi_percent(dbm: Option<f64>) -> i64 {
    match reading(dbm) {
        Some(x) => round_half_up(-0.0154 * x.powi(2) - 0.4 * x + 98.0) as i64,
        None => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WifiStrengthDisplay {
    /// `"-50dBm"`, or `"N/A"` without a reading.
    pub label: String,
    pub db_string: String,
    pub percent: i64,
    pub percent_string: String,
    pub show_bar: bool,
}

impl WifiStrengthDisplay {
    pub fn new(wifi_strength: Option<f64>) -> Self {
        let present = reading(wifi_strength);
        let percent = wifi_percent(wifi_strength);
        let db_string = format!("{}dBm", present.unwrap_or(0.0));

        Self {
            label: if present.is_some() {
                db_string.clone()
            } else {
                "N/A".to_string()
            },
            db_string,
            percent,
            percent_string: format!("{percent}%"),
            show_bar: present.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChipTemperatureDisplay {
    pub chip: Option<String>,
    pub temperature: String,
    pub color: TempColor,
}

impl ChipTemperatureDisplay {
    pub fn new(chip: Option<&str>, temperature: Option<f64>) -> Self {
        Self {
            chip: chip.filter(|c| !c.is_empty()).map(str::to_uppercase),
            temperature: match reading(temperature) {
                Some(t) => format!("{t}°C"),
                None => "unknown".to_string(),
            },
            color: color_from_temp(temperature),
        }
    }
}

/// Integer prefix of `raw`: optional whitespace and sign, then digits.
/// `None` when no digit follows.
fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = &rest[..rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len())];
    if digits.is_empty() {
        return None;
    }

    let magnitude = digits
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as i64));
    Some(if negative { -magnitude } else { magnitude })
}

/// Whether `version` is at least `expected_major.expected_minor`. A missing version
/// counts as `0.0.0`; components that are not numbers never compare as OK.
pub fn version_ok(version: Option<&str>, expected_major: i64, expected_minor: i64) -> bool {
    let version = version.unwrap_or("0.0.0");
    let mut parts = version.split('.').map(parse_leading_int);
    let major = parts.next().flatten();
    let minor = parts.next().flatten();

    match major {
        Some(major) if major > expected_major => true,
        Some(major) => major == expected_major && minor.is_some_and(|m| m >= expected_minor),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub controller_version: Option<String>,
    pub compatible: bool,
}

impl CompatibilityReport {
    pub fn check(
        controller_version: Option<&str>,
        expected_major: i64,
        expected_minor: i64,
    ) -> Self {
        Self {
            controller_version: controller_version.map(str::to_string),
            compatible: version_ok(controller_version, expected_major, expected_minor),
        }
    }
}

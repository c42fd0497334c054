//! Built-in countries and World Bank indicators

use std::collections::HashMap;

/// Common World Bank indicator codes
pub mod indicators {
    /// GDP growth (annual %)
    pub const GDP_GROWTH: &str = "NY.GDP.MKTP.KD.ZG";
    /// Inflation, consumer prices (annual %)
    pub const INFLATION_CPI: &str = "FP.CPI.TOTL.ZG";
    /// Unemployment, total (% of labor force, modeled ILO estimate)
    pub const UNEMPLOYMENT: &str = "SL.UEM.TOTL.ZS";
}

/// Selectable countries as (display name, ISO3 code)
///
/// `EMU` is the Euro Area aggregate; use `EUU` for the European Union.
pub const COUNTRIES: &[(&str, &str)] = &[
    ("United States", "USA"),
    ("Euro Area", "EMU"),
    ("United Kingdom", "GBR"),
    ("Germany", "DEU"),
    ("France", "FRA"),
    ("Italy", "ITA"),
    ("Spain", "ESP"),
    ("Japan", "JPN"),
    ("China", "CHN"),
    ("India", "IND"),
    ("Brazil", "BRA"),
    ("Canada", "CAN"),
    ("Australia", "AUS"),
];

/// Indicator metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorInfo {
    pub code: &'static str,
    pub label: &'static str,
    pub units: &'static str,
}

/// Selectable indicators
pub const INDICATORS: &[IndicatorInfo] = &[
    IndicatorInfo {
        code: indicators::GDP_GROWTH,
        label: "GDP growth",
        units: "% (annual)",
    },
    IndicatorInfo {
        code: indicators::INFLATION_CPI,
        label: "Inflation, CPI",
        units: "% (annual)",
    },
    IndicatorInfo {
        code: indicators::UNEMPLOYMENT,
        label: "Unemployment",
        units: "% of labor force",
    },
];

pub const DEFAULT_COUNTRIES: &[&str] = &["USA", "EMU", "GBR"];

pub const DEFAULT_INDICATORS: &[&str] = &[
    indicators::GDP_GROWTH,
    indicators::INFLATION_CPI,
    indicators::UNEMPLOYMENT,
];

/// Bounds of the selectable year range
pub const YEAR_BOUNDS: (i32, i32) = (1960, 2025);

/// Default selected year range
pub const DEFAULT_YEAR_RANGE: (i32, i32) = (2000, 2024);

/// Look up indicator metadata by code
pub fn indicator(code: &str) -> Option<&'static IndicatorInfo> {
    INDICATORS.iter().find(|info| info.code == code)
}

/// Resolve a country selection given as ISO3 code or display name
///
/// Codes not present in the catalog are passed through upper-cased, since the
/// API accepts any ISO3 or aggregate code.
pub fn resolve_country(input: &str) -> String {
    let trimmed = input.trim();
    COUNTRIES
        .iter()
        .find(|(name, code)| name.eq_ignore_ascii_case(trimmed) || code.eq_ignore_ascii_case(trimmed))
        .map_or_else(|| trimmed.to_uppercase(), |(_, code)| (*code).to_string())
}

/// Display name of a catalog country
pub fn country_name(code: &str) -> Option<&'static str> {
    COUNTRIES
        .iter()
        .find(|(_, c)| c.eq_ignore_ascii_case(code))
        .map(|(name, _)| *name)
}

/// Indicator code to human label mapping
///
/// Unknown codes render as the code itself.
#[derive(Debug, Clone, Default)]
pub struct IndicatorLabels {
    labels: HashMap<String, String>,
}

impl IndicatorLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels for every catalog indicator
    pub fn builtin() -> Self {
        INDICATORS
            .iter()
            .fold(Self::new(), |labels, info| labels.with(info.code, info.label))
    }

    pub fn with(mut self, code: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(code.into(), label.into());
        self
    }

    pub fn label<'a>(&'a self, code: &'a str) -> &'a str {
        self.labels.get(code).map_or(code, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_constants() {
        assert_eq!(indicators::GDP_GROWTH, "NY.GDP.MKTP.KD.ZG");
        assert_eq!(indicator(indicators::UNEMPLOYMENT).map(|i| i.label), Some("Unemployment"));
        assert!(indicator("NOT.A.CODE").is_none());
    }

    #[test]
    fn test_resolve_country() {
        assert_eq!(resolve_country("United Kingdom"), "GBR");
        assert_eq!(resolve_country("euro area"), "EMU");
        assert_eq!(resolve_country("usa"), "USA");
        assert_eq!(resolve_country(" mex "), "MEX");
        assert_eq!(country_name("JPN"), Some("Japan"));
    }

    #[test]
    fn test_labels_fallback_to_code() {
        let labels = IndicatorLabels::builtin();
        assert_eq!(labels.label(indicators::INFLATION_CPI), "Inflation, CPI");
        assert_eq!(labels.label("SP.POP.TOTL"), "SP.POP.TOTL");

        let labels = labels.with("SP.POP.TOTL", "Population");
        assert_eq!(labels.label("SP.POP.TOTL"), "Population");
    }

    #[test]
    fn test_defaults_are_in_catalog() {
        for code in DEFAULT_INDICATORS {
            assert!(indicator(code).is_some());
        }
        for code in DEFAULT_COUNTRIES {
            assert!(country_name(code).is_some());
        }
        assert!(YEAR_BOUNDS.0 <= DEFAULT_YEAR_RANGE.0 && DEFAULT_YEAR_RANGE.1 <= YEAR_BOUNDS.1);
    }
}

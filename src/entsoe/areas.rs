use std::collections::HashMap;
use once_cell::sync::Lazy;

/// ISO 3166-1 alpha-2 country code
pub type CountryCode = &'static str;

/// ENTSO-E area/bidding zone code (EIC)
pub type AreaCode = &'static str;

/// An ENTSO-E bidding zone or control area, with the label the
/// transparency platform uses for it in CSV export headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiddingZone {
    pub code: AreaCode,
    pub country_code: CountryCode,
    pub name: &'static str,
    pub tso: Option<&'static str>, // Transmission System Operator
    pub export_label: &'static str,
}

impl BiddingZone {
    pub const fn new(
        code: AreaCode,
        country_code: CountryCode,
        name: &'static str,
        tso: Option<&'static str>,
        export_label: &'static str,
    ) -> Self {
        Self {
            code,
            country_code,
            name,
            tso,
            export_label,
        }
    }

    /// Scheduling area suffix used in export headers, e.g. `SCA|NL`
    pub fn column_suffix(&self) -> String {
        format!("SCA|{}", self.export_label)
    }
}

pub static BIDDING_ZONES: Lazy<HashMap<CountryCode, Vec<BiddingZone>>> = Lazy::new(|| {
    let zones = vec![
        BiddingZone::new("10YAT-APG------L", "AT", "Austria", None, "AT"),
        BiddingZone::new("10YBE----------2", "BE", "Belgium", None, "BE"),
        BiddingZone::new("10YCZ-CEPS-----N", "CZ", "Czech Republic", None, "CZ"),
        BiddingZone::new("10Y1001A1001A796", "DK", "Denmark", None, "DK"),
        BiddingZone::new("10YFR-RTE------C", "FR", "France", None, "FR"),
        BiddingZone::new("10Y1001A1001A83F", "DE", "Germany", None, "DE"),
        BiddingZone::new("10YDE-VE-------2", "DE", "Germany", Some("50Hertz"), "DE(50Hertz)"),
        BiddingZone::new("10YDE-RWENET---I", "DE", "Germany", Some("Amprion"), "DE(Amprion)"),
        BiddingZone::new("10YDE-EON------1", "DE", "Germany", Some("TenneT"), "DE(TenneT GER)"),
        BiddingZone::new("10YDE-ENBW-----N", "DE", "Germany", Some("TransnetBW"), "DE(TransnetBW)"),
        BiddingZone::new("10YNL----------L", "NL", "Netherlands", None, "NL"),
        BiddingZone::new("10YPL-AREA-----S", "PL", "Poland", None, "PL"),
        BiddingZone::new("10YCH-SWISSGRIDZ", "CH", "Switzerland", None, "CH"),
    ];

    // Group by country code
    let mut map: HashMap<CountryCode, Vec<BiddingZone>> = HashMap::new();
    for zone in zones {
        map.entry(zone.country_code).or_default().push(zone);
    }
    map
});

/// EIC of the TenneT Germany control area
pub const TENNET_DE: AreaCode = "10YDE-EON------1";

/// EIC of the Netherlands bidding zone
pub const NETHERLANDS: AreaCode = "10YNL----------L";

/// Get a specific bidding zone by its ENTSO-E code
pub fn get_zone_by_code(area_code: &str) -> Option<&'static BiddingZone> {
    BIDDING_ZONES
        .values()
        .flatten()
        .find(|zone| zone.code == area_code)
}

/// Get the primary bidding zone for a country (first one if multiple exist)
pub fn get_primary_zone(country_code: &str) -> Option<&'static BiddingZone> {
    BIDDING_ZONES.get(country_code).and_then(|zones| zones.first())
}

/// Resolve either an EIC code or a country code
pub fn resolve(key: &str) -> Option<&'static BiddingZone> {
    get_zone_by_code(key).or_else(|| get_primary_zone(&key.to_ascii_uppercase()))
}

/// List all available country codes
pub fn list_countries() -> Vec<CountryCode> {
    let mut countries: Vec<_> = BIDDING_ZONES.keys().copied().collect();
    countries.sort();
    countries
}

impl std::fmt::Display for BiddingZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tso {
            Some(tso) => write!(f, "{} ({}) - {}", self.name, self.country_code, tso),
            None => write!(f, "{} ({})", self.name, self.country_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_suffix() {
        assert_eq!(get_zone_by_code(NETHERLANDS).unwrap().column_suffix(), "SCA|NL");
        assert_eq!(
            get_zone_by_code(TENNET_DE).unwrap().column_suffix(),
            "SCA|DE(TenneT GER)"
        );
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("nl").unwrap().code, NETHERLANDS);
        assert_eq!(resolve("DE").unwrap().tso, None);
        assert_eq!(resolve(TENNET_DE).unwrap().tso, Some("TenneT"));
        assert!(resolve("XX").is_none());
    }

    #[test]
    fn test_display() {
        let zone = resolve(TENNET_DE).unwrap();
        assert_eq!(zone.to_string(), "Germany (DE) - TenneT");
        assert!(list_countries().contains(&"NL"));
    }
}

//! Call sign → continent lookup used to pick a spotter's icon.
//!
//! [`PrefixTable`] resolves by longest matching prefix over a built-in table
//! of common ITU prefixes. Entries from the `[continents]` config section are
//! layered on top and win over built-ins.

use std::collections::{BTreeMap, HashMap};

use rbnbot_core::{Continent, UNKNOWN_ICON};

/// Resolves a call sign to its continent.
pub trait ContinentResolver: Send + Sync {
    fn continent(&self, call: &str) -> Option<Continent>;

    /// Icon for `call`, or [`UNKNOWN_ICON`] when the continent is unknown.
    fn icon(&self, call: &str) -> &'static str {
        self.continent(call).map_or(UNKNOWN_ICON, Continent::icon)
    }
}

/// Suffixes that never carry location information.
const IGNORED_SUFFIXES: &[&str] = &["P", "M", "MM", "AM", "QRP", "A", "B"];

const EU: &[&str] = &[
    "G", "M", "2", "EI", "EJ", "F", "TK", "DA", "DB", "DC", "DD", "DF", "DG", "DH", "DJ", "DK",
    "DL", "DM", "DN", "DO", "DP", "DQ", "DR", "I", "IS0", "EA", "EB", "EC", "ED", "EE", "EF", "EG",
    "EH", "EA6", "CT", "CU", "ON", "OO", "OP", "OQ", "OR", "OS", "OT", "PA", "PB", "PC", "PD", "PE",
    "PF", "PG", "PH", "PI", "OZ", "OU", "OV", "OW", "OY", "LA", "LB", "LC", "LG", "LJ", "LN", "SA",
    "SB", "SC", "SD", "SE", "SF", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "7S", "8S", "OF", "OG",
    "OH", "OI", "OJ", "ES", "YL", "LY", "SN", "SO", "SP", "SQ", "SR", "3Z", "HF", "OK", "OL", "OM",
    "HA", "HG", "YO", "YP", "YQ", "YR", "LZ", "SV", "SW", "SX", "SY", "SZ", "J4", "9A", "S5", "E7",
    "YU", "YT", "Z3", "ZA", "4O", "OE", "HB", "LX", "9H", "T7", "3A", "C3", "HV", "R", "U", "UR",
    "US", "UT", "UU", "UV", "UW", "UX", "UY", "UZ", "EM", "EN", "EO", "EW", "EU", "ER", "TF", "JW",
    "JX", "TA1", "ZB", "GD", "GI", "GJ", "GM", "GU", "GW", "MD", "MI", "MJ", "MM", "MU", "MW",
];

const NA: &[&str] = &[
    "K", "W", "N", "AA", "AB", "AC", "AD", "AE", "AF", "AG", "AI", "AJ", "AK", "AL", "KL7", "KP4",
    "NP4", "WP4", "KP2", "VA", "VE", "VO", "VY", "CY", "CF", "CG", "CH", "CI", "CJ", "CK", "XE",
    "XF", "4A", "6D", "TI", "HP", "YN", "HR", "TG", "YS", "V3", "CO", "CM", "T4", "HI", "HH", "6Y",
    "FM", "FG", "FS", "FJ", "J3", "J6", "J7", "J8", "V2", "V4", "VP2", "VP5", "VP9", "C6", "8P",
    "PJ5", "PJ6", "PJ7", "ZF", "OX", "XP", "FP", "KG4",
];

const SA: &[&str] = &[
    "PP", "PQ", "PR", "PS", "PT", "PU", "PV", "PW", "PX", "PY", "ZV", "ZW", "ZX", "ZY", "ZZ", "LU",
    "LW", "LO", "LP", "LQ", "LR", "LS", "LT", "AY", "AZ", "CA", "CB", "CC", "CD", "CE", "XQ", "XR",
    "3G", "CX", "CV", "CW", "ZP", "CP", "OA", "OB", "OC", "4T", "HC", "HD", "HK", "5J", "5K", "YV",
    "YW", "YX", "YY", "4M", "8R", "PZ", "FY", "VP8", "9Y", "9Z", "PJ2", "PJ4", "P4", "CE0",
];

const AF: &[&str] = &[
    "ZS", "ZR", "ZT", "ZU", "5H", "5I", "5Z", "5Y", "5N", "5O", "9J", "9I", "9G", "6W", "CN", "5C",
    "7X", "3V", "SU", "6A", "ET", "5R", "3B8", "3B9", "FR", "D4", "EA8", "EA9", "CT3", "IH9", "IG9",
    "ZD7", "ZD8", "ZD9", "V5", "A2", "Z2", "7Q", "9X", "9U", "TR", "TJ", "TU", "TY", "TZ", "6V",
    "J5", "3C", "S9", "5T", "5U", "5V", "5X", "ST", "9Q", "D2", "C9", "7P", "3DA", "3X", "9L", "EL",
    "C5", "J2", "T5", "6O", "E3", "S7", "D6", "FH", "TL", "TT", "5A", "3C0", "SU8",
];

const AS: &[&str] = &[
    "JA", "JE", "JF", "JG", "JH", "JI", "JJ", "JK", "JL", "JM", "JN", "JO", "JP", "JQ", "JR", "JS",
    "7J", "7K", "7L", "7M", "7N", "8J", "8N", "HL", "DS", "DT", "6K", "6L", "6M", "6N", "B", "VU",
    "AT", "AU", "AV", "AW", "8T", "8U", "8V", "8W", "8X", "8Y", "HS", "E2", "9M2", "9M4", "9V", "4X",
    "4Z", "TA", "TB", "TC", "YM", "4L", "EK", "4J", "4K", "UN", "UO", "UP", "UQ", "UK", "EX", "EY",
    "EZ", "AP", "A4", "A5", "A6", "A7", "A9", "HZ", "7Z", "9K", "YI", "EP", "EQ", "OD", "YK", "JY",
    "5B", "C4", "P3", "H2", "ZC4", "4S", "S2", "9N", "XV", "3W", "XU", "XW", "XZ", "JT", "VR2",
    "XX9", "7O", "YA", "T6", "UA8", "UA9", "UA0", "R8", "R9", "R0", "RA8", "RA9", "RA0", "RK9",
    "RK0", "RU9", "RU0", "RV9", "RV0", "RW9", "RW0", "RX9", "RX0", "RZ9", "RZ0", "UB8", "UB9", "UB0",
    "UI8", "UI9", "UI0", "4W",
];

const OC: &[&str] = &[
    "VK", "AX", "ZL", "ZM", "KH6", "NH6", "WH6", "AH6", "KH7", "KH2", "NH2", "WH2", "AH2", "KH0",
    "KH8", "FK", "FO", "FW", "YJ", "3D2", "5W", "A3", "T2", "T3", "E5", "E6", "ZK", "P2", "H4", "YB",
    "YC", "YD", "YE", "YF", "YG", "YH", "DU", "DV", "DW", "DX", "DY", "DZ", "4D", "4E", "4F", "4G",
    "4H", "4I", "9M6", "9M8", "V8", "V6", "V7", "T8", "C2", "KC6", "VK9",
];

const AN: &[&str] = &["KC4", "3Y", "CE9", "DP1", "RI1AN", "8J1R"];

/// Longest-prefix continent lookup.
#[derive(Debug, Clone)]
pub struct PrefixTable {
    prefixes: HashMap<String, Continent>,
    longest: usize,
}

impl PrefixTable {
    /// Table seeded with the built-in prefixes only.
    pub fn builtin() -> Self {
        let groups = [
            (EU, Continent::Eu),
            (NA, Continent::Na),
            (SA, Continent::Sa),
            (AF, Continent::Af),
            (AS, Continent::As),
            (OC, Continent::Oc),
            (AN, Continent::An),
        ];
        let mut table = Self {
            prefixes: HashMap::new(),
            longest: 0,
        };
        for (prefixes, continent) in groups {
            for prefix in prefixes {
                table.insert(prefix, continent);
            }
        }
        table
    }

    /// Built-ins plus `overrides` (which win on conflict).
    pub fn with_overrides(overrides: &BTreeMap<String, Continent>) -> Self {
        let mut table = Self::builtin();
        for (prefix, continent) in overrides {
            table.insert(prefix, *continent);
        }
        table
    }

    pub fn insert(&mut self, prefix: &str, continent: Continent) {
        let prefix = prefix.trim().to_ascii_uppercase();
        if prefix.is_empty() {
            return;
        }
        self.longest = self.longest.max(prefix.len());
        self.prefixes.insert(prefix, continent);
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl ContinentResolver for PrefixTable {
    fn continent(&self, call: &str) -> Option<Continent> {
        let call = location_part(call);
        let max = call.len().min(self.longest);
        (1..=max)
            .rev()
            .filter(|&n| call.is_char_boundary(n))
            .find_map(|n| self.prefixes.get(&call[..n]).copied())
    }
}

/// Strip skimmer (`-#`) and portable (`/P`) decorations, keeping the part of
/// the call that identifies where the station is.
fn location_part(call: &str) -> String {
    let call = call
        .split('-')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase();
    let parts: Vec<&str> = call
        .split('/')
        .filter(|p| !p.is_empty() && !IGNORED_SUFFIXES.contains(p))
        .filter(|p| !(p.len() == 1 && p.chars().all(|c| c.is_ascii_digit())))
        .collect();
    match parts.as_slice() {
        [] => call.clone(),
        [only] => only.to_string(),
        // `EA8/DL1ABC` or `DL1ABC/EA8`: the shorter part is the location prefix.
        [first, second, ..] => {
            if first.len() <= second.len() {
                first.to_string()
            } else {
                second.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_longest_prefix() {
        let table = PrefixTable::builtin();
        assert_eq!(table.continent("HA6PX"), Some(Continent::Eu));
        assert_eq!(table.continent("W8WTS"), Some(Continent::Na));
        assert_eq!(table.continent("KH6LC"), Some(Continent::Oc));
        assert_eq!(table.continent("EA8TL"), Some(Continent::Af));
        assert_eq!(table.continent("EA5WU"), Some(Continent::Eu));
        assert_eq!(table.continent("UA9CDC"), Some(Continent::As));
        assert_eq!(table.continent("PY2ZXU"), Some(Continent::Sa));
        assert_eq!(table.continent("VK2GR"), Some(Continent::Oc));
        assert_eq!(table.continent("JA1XYZ"), Some(Continent::As));
    }

    #[test]
    fn skimmer_and_portable_decorations_are_ignored() {
        let table = PrefixTable::builtin();
        assert_eq!(table.continent("dk9ip-#"), Some(Continent::Eu));
        assert_eq!(table.continent("IV3IFZ/P"), Some(Continent::Eu));
        assert_eq!(table.continent("DL1ABC/EA8"), Some(Continent::Af));
        assert_eq!(table.continent("EA8/DL1ABC"), Some(Continent::Af));
    }

    #[test]
    fn unknown_call_gets_unknown_icon() {
        let table = PrefixTable::builtin();
        assert_eq!(table.continent("QQ1XYZ"), None);
        assert_eq!(table.icon("QQ1XYZ"), UNKNOWN_ICON);
        assert_eq!(table.icon(""), UNKNOWN_ICON);
        assert_eq!(table.icon("HB9IIH"), "🔵");
    }

    #[test]
    fn overrides_win_over_builtins() {
        let mut overrides = BTreeMap::new();
        overrides.insert("qq".to_string(), Continent::An);
        overrides.insert("HB9".to_string(), Continent::Oc);
        let table = PrefixTable::with_overrides(&overrides);
        assert_eq!(table.continent("QQ1XYZ"), Some(Continent::An));
        assert_eq!(table.continent("HB9IIH"), Some(Continent::Oc));
        assert_eq!(table.continent("HB0XX"), Some(Continent::Eu));
    }
}

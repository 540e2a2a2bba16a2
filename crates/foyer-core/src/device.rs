//! Device types for tracking network presence

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Display name assigned when a hostname sanitizes down to nothing.
pub const PLACEHOLDER_NAME: &str = "Unknown Device";

/// A single preference value: string, number, or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl From<&str> for PrefValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// Open key/value bag attached to a known device (type, location, user, ...).
///
/// Insertion order is preserved so stored and served preferences read the
/// same way they were written.
pub type Preferences = IndexMap<String, PrefValue>;

/// Default preferences assigned to a freshly admitted device.
pub fn default_preferences() -> Preferences {
    let mut prefs = Preferences::new();
    prefs.insert("type".to_string(), PrefValue::from("unknown"));
    prefs.insert("location".to_string(), PrefValue::from("unknown"));
    prefs
}

/// Lowercase form of a MAC address, used as the catalogue key.
///
/// Comparisons are case-insensitive everywhere; the stored `mac` field
/// keeps whatever casing the scanner reported.
pub fn mac_key(mac: &str) -> String {
    mac.trim().to_ascii_lowercase()
}

/// Derive a display name from a scanner-supplied hostname.
///
/// Everything outside `[A-Za-z0-9-]` is stripped; an empty result falls
/// back to [`PLACEHOLDER_NAME`].
pub fn sanitize_hostname(hostname: &str) -> String {
    let cleaned: String = hostname
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if cleaned.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        cleaned
    }
}

/// A device the system knows about, with its place in the priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownDevice {
    /// Hardware address as originally reported (casing preserved)
    pub mac: String,
    /// Human-assigned label, defaults to the sanitized hostname
    pub display_name: String,
    /// Open preference bag, shallow-merged on update
    pub preferences: Preferences,
    /// Position in the ordering sequence; 0 = highest priority.
    /// Derived, recomputed on every mutation, never stored on disk.
    pub priority: usize,
}

/// A point-in-time sighting from the presence scanner.
///
/// Scanner-supplied and untrusted; replaced wholesale on every ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedDevice {
    pub mac: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

/// One entry of the served snapshot: an observation annotated with
/// known-device metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub mac: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<usize>,
    pub is_known: bool,
}

impl PresenceRecord {
    /// Annotate an observation with catalogue metadata, if any.
    pub fn annotate(observed: ObservedDevice, known: Option<&KnownDevice>) -> Self {
        Self {
            mac: observed.mac,
            ip: observed.ip,
            hostname: observed.hostname,
            last_seen: observed.last_seen,
            display_name: known.map(|d| d.display_name.clone()),
            preferences: known.map(|d| d.preferences.clone()),
            priority: known.map(|d| d.priority),
            is_known: known.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_key_lowercases() {
        assert_eq!(mac_key("AA:BB:CC:DD:EE:FF"), "aa:bb:cc:dd:ee:ff");
        assert_eq!(mac_key("  aa:bb:cc:dd:ee:ff "), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_sanitize_hostname_strips_punctuation() {
        assert_eq!(sanitize_hostname("My Phone!!"), "MyPhone");
        assert_eq!(sanitize_hostname("living-room-tv"), "living-room-tv");
        assert_eq!(sanitize_hostname("printer.lan"), "printerlan");
    }

    #[test]
    fn test_sanitize_hostname_empty_falls_back() {
        assert_eq!(sanitize_hostname(""), PLACEHOLDER_NAME);
        assert_eq!(sanitize_hostname("!!??"), PLACEHOLDER_NAME);
    }

    #[test]
    fn test_default_preferences() {
        let prefs = default_preferences();
        assert_eq!(prefs.get("type"), Some(&PrefValue::from("unknown")));
        assert_eq!(prefs.get("location"), Some(&PrefValue::from("unknown")));
        assert_eq!(prefs.len(), 2);
    }

    #[test]
    fn test_pref_value_untagged_round_trip() {
        let json = r#"{"type":"phone","greet":true,"volume":7}"#;
        let prefs: Preferences = serde_json::from_str(json).unwrap();
        assert_eq!(prefs.get("type"), Some(&PrefValue::from("phone")));
        assert_eq!(prefs.get("greet"), Some(&PrefValue::Bool(true)));
        assert_eq!(prefs.get("volume"), Some(&PrefValue::Number(7.0)));
    }

    #[test]
    fn test_annotate_unknown_observation() {
        let observed = ObservedDevice {
            mac: "aa:bb:cc:dd:ee:ff".to_string(),
            ip: Some("192.168.1.10".to_string()),
            hostname: None,
            last_seen: None,
        };
        let record = PresenceRecord::annotate(observed, None);
        assert!(!record.is_known);
        assert!(record.display_name.is_none());
        assert!(record.priority.is_none());
    }
}

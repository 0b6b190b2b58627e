//! Per-visitor display settings.

use serde::{Deserialize, Serialize};

use super::price::{CurrencyCode, Language};

/// Language and currency chosen by the visitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub language: Language,
    pub currency: CurrencyCode,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: UserSettings = serde_json::from_str(r#"{"language":"ar"}"#).unwrap();
        assert_eq!(settings.language, Language::Ar);
        assert_eq!(settings.currency, CurrencyCode::EGP);
    }
}

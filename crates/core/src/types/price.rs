//! Prices, currencies, and display formatting.
//!
//! Formatting always uses ASCII digits and `,` thousands separators, whatever
//! the display language. Only the position and spelling of the currency label
//! changes between languages.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Maximum number of fraction digits shown in a formatted amount.
const MAX_FRACTION_DIGITS: u32 = 2;

/// Display language for the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    /// Two-letter language code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }

    /// Text direction for the `dir` attribute.
    #[must_use]
    pub const fn direction(self) -> &'static str {
        match self {
            Self::En => "ltr",
            Self::Ar => "rtl",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unknown language or currency code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported code: {0}")]
pub struct UnknownCode(pub String);

impl FromStr for Language {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ar" => Ok(Self::Ar),
            other => Err(UnknownCode(other.to_string())),
        }
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EGP,
    USD,
    EUR,
    GBP,
    SAR,
    AED,
}

impl CurrencyCode {
    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EGP => "EGP",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::SAR => "SAR",
            Self::AED => "AED",
        }
    }

    /// Label shown next to amounts in the given language.
    #[must_use]
    pub const fn label(self, language: Language) -> &'static str {
        match language {
            Language::En => self.code(),
            Language::Ar => match self {
                Self::EGP => "ج.م",
                Self::USD => "$",
                Self::EUR => "€",
                Self::GBP => "£",
                Self::SAR => "ر.س",
                Self::AED => "د.إ",
            },
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EGP" => Ok(Self::EGP),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "SAR" => Ok(Self::SAR),
            "AED" => Ok(Self::AED),
            other => Err(UnknownCode(other.to_string())),
        }
    }
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., pounds, not piastres).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display in the given language.
    #[must_use]
    pub fn display(&self, language: Language) -> String {
        with_label(
            &format_decimal(self.amount),
            self.currency_code,
            language,
        )
    }
}

/// Format an amount with grouped thousands and at most two fraction digits.
///
/// Missing, `NaN`, and infinite values format as `"0"`.
///
/// ```
/// use maison_core::format_amount;
///
/// assert_eq!(format_amount(Some(1234.5)), "1,234.5");
/// assert_eq!(format_amount(None), "0");
/// assert_eq!(format_amount(Some(f64::NAN)), "0");
/// ```
#[must_use]
pub fn format_amount(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return "0".to_string();
    };

    match Decimal::try_from(value) {
        Ok(amount) => format_decimal(amount),
        // Outside the decimal range; fall back to float formatting
        Err(_) => {
            let fixed = format!("{value:.2}");
            let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
            group_digits(trimmed)
        }
    }
}

/// Format an amount with its currency label for the given language.
///
/// `format_price(None, ..)` is the zero-amount string for that
/// currency and language.
#[must_use]
pub fn format_price(value: Option<f64>, currency: CurrencyCode, language: Language) -> String {
    with_label(&format_amount(value), currency, language)
}

fn with_label(amount: &str, currency: CurrencyCode, language: Language) -> String {
    match language {
        Language::En => format!("{} {amount}", currency.label(language)),
        Language::Ar => format!("{amount} {}", currency.label(language)),
    }
}

fn format_decimal(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(MAX_FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    group_digits(&rounded.to_string())
}

/// Insert `,` every three digits in the integer part of a plain decimal string.
fn group_digits(plain: &str) -> String {
    let (sign, unsigned) = plain
        .strip_prefix('-')
        .map_or(("", plain), |rest| ("-", rest));
    let (int_part, frac_part) = unsigned
        .split_once('.')
        .map_or((unsigned, None), |(i, f)| (i, Some(f)));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = String::with_capacity(sign.len() + grouped.len() + 3);
    out.push_str(sign);
    out.push_str(&grouped);
    if let Some(frac) = frac_part.filter(|f| !f.is_empty()) {
        out.push('.');
        out.push_str(frac);
    }
    out
}

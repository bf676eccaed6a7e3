// src/i18n.rs

use serde::Deserialize;
use strum_macros::{Display, EnumString};

/// Kurs używany do orientacyjnych cen w dolarach (PLN / 4).
const PLN_PER_USD: f64 = 4.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Lang {
    #[default]
    Pl,
    En,
}

impl Lang {
    /// Wybiera wersję tekstu dla danego języka. Pusty tekst angielski
    /// zastępowany jest polskim.
    pub fn pick<'a>(&self, pl: &'a str, en: &'a str) -> &'a str {
        match self {
            Lang::Pl => pl,
            Lang::En if en.trim().is_empty() => pl,
            Lang::En => en,
        }
    }

    pub fn other(&self) -> Lang {
        match self {
            Lang::Pl => Lang::En,
            Lang::En => Lang::Pl,
        }
    }
}

pub fn format_price(price_pln: f64, lang: Lang) -> String {
    match lang {
        Lang::Pl => {
            if price_pln.fract() == 0.0 {
                format!("{} PLN", price_pln as i64)
            } else {
                format!("{:.2} PLN", price_pln).replace('.', ",")
            }
        }
        Lang::En => format_usd(price_pln / PLN_PER_USD),
    }
}

fn format_usd(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = group_thousands(cents / 100);
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, whole, cents % 100)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Zakres rozmiarów do wyświetlenia; para jest nieuporządkowana.
pub fn format_size_range(a: f64, b: f64) -> String {
    let (lo, hi) = (a.min(b), a.max(b));
    if lo == hi {
        format!("{} cm", trim_number(lo))
    } else {
        format!("{}–{} cm", trim_number(lo), trim_number(hi))
    }
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn hundred_pln_in_both_modes() {
        assert_eq!(format_price(100.0, Lang::Pl), "100 PLN");
        assert_eq!(format_price(100.0, Lang::En), "$25.00");
    }

    #[test]
    fn fractional_and_large_prices() {
        assert_eq!(format_price(99.5, Lang::Pl), "99,50 PLN");
        assert_eq!(format_price(10_000.0, Lang::En), "$2,500.00");
        assert_eq!(format_price(4_000_002.0, Lang::En), "$1,000,000.50");
        assert_eq!(format_price(1.0, Lang::En), "$0.25");
    }

    #[test]
    fn english_falls_back_to_polish_text() {
        assert_eq!(Lang::En.pick("Pasek", ""), "Pasek");
        assert_eq!(Lang::En.pick("Pasek", "Belt"), "Belt");
        assert_eq!(Lang::Pl.pick("Pasek", "Belt"), "Pasek");
    }

    #[test]
    fn lang_parses_case_insensitively() {
        assert_eq!(Lang::from_str("EN").unwrap(), Lang::En);
        assert_eq!(Lang::from_str("pl").unwrap(), Lang::Pl);
        assert_eq!(Lang::En.to_string(), "en");
        assert!(Lang::from_str("de").is_err());
    }

    #[test]
    fn size_range_uses_min_and_max_of_pair() {
        assert_eq!(format_size_range(110.0, 95.0), "95–110 cm");
        assert_eq!(format_size_range(100.0, 100.0), "100 cm");
        assert_eq!(format_size_range(90.5, 100.0), "90.5–100 cm");
    }
}

use anyhow::{Result, anyhow};
use isolang::Language;

/// Locale utilities
///
/// This module validates and normalizes locale codes of the form
/// `language[_Script][_REGION]`, where the language part is an ISO 639-1 or
/// ISO 639-2 code. Both `_` and `-` are accepted as separators.
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    match code {
        "fre" => Some("fra"),
        "ger" => Some("deu"),
        "dut" => Some("nld"),
        "gre" => Some("ell"),
        "chi" => Some("zho"),
        "cze" => Some("ces"),
        "ice" => Some("isl"),
        "alb" => Some("sqi"),
        "arm" => Some("hye"),
        "baq" => Some("eus"),
        "bur" => Some("mya"),
        "per" => Some("fas"),
        "geo" => Some("kat"),
        "may" => Some("msa"),
        "mac" => Some("mkd"),
        "rum" => Some("ron"),
        "slo" => Some("slk"),
        "wel" => Some("cym"),
        _ => None,
    }
}

/// Validate the language part of a locale
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 && Language::from_639_1(&normalized_code).is_some() {
        return Ok(LanguageCodeType::Part1);
    }

    if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2T);
        }
        if part2b_to_part2t(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2B);
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

fn split_locale(code: &str) -> (&str, Vec<&str>) {
    let mut parts = code.trim().split(['_', '-']);
    let language = parts.next().unwrap_or_default();
    (language, parts.collect())
}

// Normalize a script or region subtag, rejecting anything else
fn normalize_subtag(subtag: &str) -> Option<String> {
    let is_alpha = subtag.chars().all(|c| c.is_ascii_alphabetic());
    let is_digit = subtag.chars().all(|c| c.is_ascii_digit());

    match subtag.len() {
        2 if is_alpha => Some(subtag.to_ascii_uppercase()),
        3 if is_digit => Some(subtag.to_string()),
        4 if is_alpha => {
            let lower = subtag.to_ascii_lowercase();
            let mut chars = lower.chars();
            chars
                .next()
                .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
        }
        _ => None,
    }
}

/// Validate a locale code such as `fr`, `fr_FR`, `pt-BR` or `zh_Hant_TW`
pub fn validate_locale(code: &str) -> Result<()> {
    normalize_locale(code).map(|_| ())
}

/// Normalize a locale to `language[_Script][_REGION]`
pub fn normalize_locale(code: &str) -> Result<String> {
    let (language, subtags) = split_locale(code);
    validate_language_code(language).map_err(|_| anyhow!("Invalid locale: {}", code))?;

    if subtags.len() > 2 {
        return Err(anyhow!("Invalid locale: {}", code));
    }

    let mut normalized = language.to_lowercase();
    for subtag in subtags {
        let subtag =
            normalize_subtag(subtag).ok_or_else(|| anyhow!("Invalid locale: {}", code))?;
        normalized.push('_');
        normalized.push_str(&subtag);
    }

    Ok(normalized)
}

/// Check if two locale codes represent the same locale
pub fn locales_match(code1: &str, code2: &str) -> bool {
    match (normalize_locale(code1), normalize_locale(code2)) {
        (Ok(normalized1), Ok(normalized2)) => normalized1 == normalized2,
        _ => false,
    }
}

/// Get the English name of a locale's language
pub fn language_name(code: &str) -> Result<String> {
    let (language, _) = split_locale(code);
    let language = language.to_lowercase();

    let lang = match language.len() {
        2 => Language::from_639_1(&language),
        3 => Language::from_639_3(part2b_to_part2t(&language).unwrap_or(language.as_str())),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;

    Ok(lang.to_name().to_string())
}

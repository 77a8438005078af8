// src/amounts.rs
//
// Final stage: given the word predicted to precede the total amount,
// scan the receipt's OCR token stream for the amount itself.

use regex::Regex;

/// Alphabetic characters only, lowercased — the normal form used to match
/// stream tokens against the selected predecessor word.
fn normalize(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect::<String>()
        .to_lowercase()
}

/// Predicted amount for one receipt: the digits of the first token after
/// the first occurrence of `predecessor` whose first character, once any
/// leading currency symbol is stripped, is numeric. Decimal points are not
/// reconstructed; "€45.99" comes out as "4599". No such token, or no
/// occurrence of the predecessor at all, yields "0".
pub fn extract_amount(full_text: &str, predecessor: &str) -> String {
    // a digit first, allowing a currency prefix
    let numeric = Regex::new(r"^[€$£]*[0-9]").expect("literal pattern");

    let words: Vec<&str> = full_text.split_whitespace().collect();
    let Some(idx) = words.iter().position(|w| normalize(w) == predecessor) else {
        return "0".to_string();
    };

    for word in &words[idx + 1..] {
        if numeric.is_match(word) {
            return word.chars().filter(|c| c.is_ascii_digit()).collect();
        }
    }
    "0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_and_decimal_point_stripped() {
        assert_eq!(
            extract_amount("merchant says €45.99 thanks", "merchant"),
            "4599"
        );
        assert_eq!(extract_amount("totaal $12.50", "totaal"), "1250");
    }

    #[test]
    fn test_skips_non_numeric_tokens() {
        assert_eq!(extract_amount("totaal te betalen 8,40", "totaal"), "840");
    }

    #[test]
    fn test_no_amount_after_predecessor_yields_zero() {
        assert_eq!(extract_amount("dank u wel totaal", "totaal"), "0");
    }

    #[test]
    fn test_predecessor_absent_yields_zero() {
        assert_eq!(extract_amount("koffie 2.50 thee 1.80", "totaal"), "0");
    }

    #[test]
    fn test_only_first_occurrence_is_used() {
        // the forward scan starts at the first "totaal", not the second
        assert_eq!(extract_amount("totaal volgt totaal 9.99", "totaal"), "999");
    }

    #[test]
    fn test_predecessor_matched_in_normal_form() {
        // "TOTAAL:" normalizes to "totaal"
        assert_eq!(extract_amount("TOTAAL: €7.00", "totaal"), "700");
    }

    #[test]
    fn test_bare_currency_symbol_is_not_an_amount() {
        assert_eq!(extract_amount("totaal € 3.20", "totaal"), "320");
    }
}

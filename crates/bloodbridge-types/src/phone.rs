//! Phone number handling for registration and SMS delivery.

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '-' | '(' | ')' | '.')
}

/// Accepts 10 to 15 digits, an optional leading `+`, and the separators
/// space, dash, dot and parentheses.
pub fn is_valid(phone: &str) -> bool {
    let cleaned: String = phone.chars().filter(|c| !is_separator(*c)).collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && (10..=15).contains(&digits.len())
}

/// Digits only. Two numbers are the same subscriber when these match.
pub fn normalize(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// E.164 form (`+919876543210`) for the SMS gateway.
///
/// Numbers without a country code are assumed to be Indian when they have
/// ten digits; anything else unprefixed gets `+1`.
pub fn to_e164(phone: &str) -> String {
    let trimmed = phone.trim();
    let digits = normalize(trimmed);
    if trimmed.starts_with('+') {
        return format!("+{digits}");
    }
    if digits.len() == 12 && digits.starts_with("91") {
        format!("+{digits}")
    } else if digits.len() == 10 {
        format!("+91{digits}")
    } else {
        format!("+1{digits}")
    }
}

/// Display form: bare ten digit numbers become `+91-XXXXX-XXXXX`, anything
/// else is returned as entered.
pub fn display(phone: &str) -> String {
    let cleaned: String = phone.chars().filter(|c| !is_separator(*c)).collect();
    if !cleaned.starts_with('+') && cleaned.len() == 10 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        return format!("+91-{}-{}", &cleaned[..5], &cleaned[5..]);
    }
    phone.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(is_valid("+91-98765-43210"));
        assert!(is_valid("(555) 123.4567"));
        assert!(is_valid("9876543210"));
        assert!(!is_valid("12345"));
        assert!(!is_valid("98765abc10"));
        assert!(!is_valid("+1234567890123456"));
        assert!(!is_valid(""));
        assert!(!is_valid("++9876543210"));
    }

    #[test]
    fn e164() {
        assert_eq!(to_e164("+91-98765-43210"), "+919876543210");
        assert_eq!(to_e164("98765 43210"), "+919876543210");
        assert_eq!(to_e164("919876543210"), "+919876543210");
        assert_eq!(to_e164("15551234567"), "+115551234567");
    }

    #[test]
    fn normalized_numbers_compare_equal() {
        assert_eq!(normalize("+91-98765-43210"), normalize("+91 (98765) 43210"));
    }

    #[test]
    fn display_format() {
        assert_eq!(display("9876543210"), "+91-98765-43210");
        assert_eq!(display("+1 555 123 4567"), "+1 555 123 4567");
    }
}

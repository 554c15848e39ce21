//! Field-format predicates shared by extraction and validation.
//!
//! All checks are pure and total: invalid input yields `false` or a cleaned
//! string, never an error.

use std::sync::LazyLock;

use regex::Regex;

/// Email shape check. Intentionally looser than full RFC 5322; OCR output
/// never benefits from the exotic corners of that grammar.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
    });
    EMAIL.is_match(email)
}

/// A phone number is plausible when it carries 7 to 15 digits, whatever
/// punctuation surrounds them.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    (7..=15).contains(&digits)
}

/// Invoice numbers are at least three characters of letters, digits,
/// hyphens and underscores.
pub fn is_valid_invoice_number(invoice_number: &str) -> bool {
    static NUMBER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-_]+$").unwrap());
    invoice_number.len() >= 3 && NUMBER.is_match(invoice_number)
}

/// Tax ids are compared after stripping spaces and hyphens; what remains
/// must be 3 to 20 alphanumerics.
pub fn is_valid_tax_id(tax_id: &str) -> bool {
    let cleaned: String = tax_id
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    (3..=20).contains(&cleaned.len()) && cleaned.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Postal codes worldwide reduce to 3 to 10 alphanumerics once separators
/// are stripped.
pub fn is_valid_postal_code(postal_code: &str) -> bool {
    let cleaned: String = postal_code
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    (3..=10).contains(&cleaned.len()) && cleaned.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn is_valid_tenant_id(tenant_id: &str) -> bool {
    (3..=50).contains(&tenant_id.len())
        && tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Trim and strip control characters from free-text fields. Tab, newline
/// and carriage return survive; extraction is line-oriented.
pub fn sanitize_text(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Reduce an uploaded file name to a safe token: path separators and shell
/// metacharacters become underscores, dot runs collapse, length is capped.
pub fn sanitize_file_name(filename: &str) -> String {
    static UNSAFE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-.]").unwrap());
    static DOTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.+").unwrap());

    if filename.is_empty() {
        return "unknown_file".to_string();
    }

    let sanitized = UNSAFE.replace_all(filename, "_");
    let mut sanitized = DOTS.replace_all(&sanitized, ".").to_string();

    if sanitized.len() > 255 {
        match sanitized.rsplit_once('.') {
            Some((name, ext)) => {
                let keep = 255usize.saturating_sub(ext.len() + 1);
                let name: String = name.chars().take(keep).collect();
                sanitized = format!("{name}.{ext}");
            }
            None => sanitized = sanitized.chars().take(255).collect(),
        }
    }

    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

/// Extension allowlist check, case-insensitive.
pub fn has_allowed_extension(filename: &str, allowed: &[String]) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => {
            let ext = ext.to_lowercase();
            allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_accepts_common_shapes() {
        assert!(is_valid_email("billing@acme.example"));
        assert!(is_valid_email("jane.doe+invoices@sub.domain.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn phone_counts_digits_only() {
        assert!(is_valid_phone("(555) 123-4567"));
        assert!(is_valid_phone("+1 555.123.4567"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("1234567890123456"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn invoice_number_charset_and_length() {
        assert!(is_valid_invoice_number("INV-2024-001"));
        assert!(is_valid_invoice_number("A_1"));
        assert!(!is_valid_invoice_number("AB"));
        assert!(!is_valid_invoice_number("INV 001"));
        assert!(!is_valid_invoice_number("INV#1"));
    }

    #[test]
    fn tax_id_strips_separators() {
        assert!(is_valid_tax_id("12-3456789"));
        assert!(is_valid_tax_id("GB 123 4567 89"));
        assert!(!is_valid_tax_id("12"));
        assert!(!is_valid_tax_id("123456789012345678901"));
        assert!(!is_valid_tax_id("12-34!"));
    }

    #[test]
    fn postal_code_bounds() {
        assert!(is_valid_postal_code("62704"));
        assert!(is_valid_postal_code("62704-1234"));
        assert!(is_valid_postal_code("SW1A 1AA"));
        assert!(!is_valid_postal_code("12"));
        assert!(!is_valid_postal_code("123456789012"));
    }

    #[test]
    fn tenant_id_charset() {
        assert!(is_valid_tenant_id("default"));
        assert!(is_valid_tenant_id("tenant_42"));
        assert!(!is_valid_tenant_id("ab"));
        assert!(!is_valid_tenant_id("has-hyphen"));
        assert!(!is_valid_tenant_id(""));
    }

    #[test]
    fn sanitize_text_strips_control_characters() {
        assert_eq!(sanitize_text("  Acme\x00 Corp\x07  "), "Acme Corp");
        assert_eq!(sanitize_text("line1\nline2\tend"), "line1\nline2\tend");
        assert_eq!(sanitize_text(""), "");
    }

    #[test]
    fn file_name_sanitization() {
        assert_eq!(sanitize_file_name("invoice (1).pdf"), "invoice__1_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "._._etc_passwd");
        assert_eq!(sanitize_file_name(""), "unknown_file");

        let long = format!("{}.pdf", "a".repeat(300));
        let sanitized = sanitize_file_name(&long);
        assert!(sanitized.len() <= 255);
        assert!(sanitized.ends_with(".pdf"));
    }

    #[test]
    fn extension_allowlist_is_case_insensitive() {
        let allowed = vec!["pdf".to_string(), "png".to_string()];
        assert!(has_allowed_extension("scan.PDF", &allowed));
        assert!(has_allowed_extension("scan.png", &allowed));
        assert!(!has_allowed_extension("scan.tiff", &allowed));
        assert!(!has_allowed_extension("no_extension", &allowed));
        assert!(!has_allowed_extension("trailing.", &allowed));
    }
}

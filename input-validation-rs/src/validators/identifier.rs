//! Identifier validators for UUIDs and ISBNs

use uuid::{Uuid, Variant};

/// Hyphenated UUID of any version
pub fn is_uuid(s: &str) -> bool {
    parse_hyphenated(s).is_some()
}

pub fn is_uuid3(s: &str) -> bool {
    is_uuid_version(s, 3)
}

pub fn is_uuid4(s: &str) -> bool {
    is_uuid_version(s, 4)
}

pub fn is_uuid5(s: &str) -> bool {
    is_uuid_version(s, 5)
}

fn is_uuid_version(s: &str, version: usize) -> bool {
    parse_hyphenated(s)
        .map(|uuid| uuid.get_version_num() == version && uuid.get_variant() == Variant::RFC4122)
        .unwrap_or(false)
}

fn parse_hyphenated(s: &str) -> Option<Uuid> {
    if s.len() != 36 {
        return None;
    }
    Uuid::try_parse(s).ok()
}

/// ISBN-10 or ISBN-13
pub fn is_isbn(s: &str) -> bool {
    is_isbn10(s) || is_isbn13(s)
}

/// Ten characters (hyphens and spaces ignored), the last may be `X`
pub fn is_isbn10(s: &str) -> bool {
    let chars = isbn_chars(s);
    if chars.len() != 10 {
        return false;
    }

    let mut sum = 0u32;
    for (i, c) in chars.iter().enumerate() {
        let digit = match c {
            'X' if i == 9 => 10,
            c => match c.to_digit(10) {
                Some(d) => d,
                None => return false,
            },
        };
        sum += (10 - i as u32) * digit;
    }
    sum % 11 == 0
}

/// Thirteen digits starting with 978 or 979 (hyphens and spaces ignored)
pub fn is_isbn13(s: &str) -> bool {
    let chars = isbn_chars(s);
    if chars.len() != 13 || !chars.iter().all(char::is_ascii_digit) {
        return false;
    }
    if !(chars.starts_with(&['9', '7', '8']) || chars.starts_with(&['9', '7', '9'])) {
        return false;
    }

    let sum: u32 = chars
        .iter()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    sum % 10 == 0
}

fn isbn_chars(s: &str) -> Vec<char> {
    s.chars().filter(|c| *c != '-' && *c != ' ').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_uuid_versions() {
        let v4 = Uuid::new_v4().to_string();
        assert!(is_uuid(&v4));
        assert!(is_uuid4(&v4));
        assert!(!is_uuid3(&v4));
        assert!(!is_uuid5(&v4));

        // RFC 4122 appendix example (DNS namespace, "www.example.com")
        assert!(is_uuid3("5df41881-3aed-3515-88a7-2f4a814cf09e"));
        assert!(is_uuid5("2ed6657d-e927-568b-95e1-2665a8aea6a2"));

        assert!(!is_uuid("not-a-uuid"));
        assert!(!is_uuid(&v4.replace('-', "")));
    }

    #[test_case("0-306-40615-2", true ; "isbn10 hyphenated")]
    #[test_case("080442957X", true ; "isbn10 with x")]
    #[test_case("0306406153", false ; "isbn10 bad checksum")]
    #[test_case("978-0-306-40615-7", true ; "isbn13 hyphenated")]
    #[test_case("9780306406158", false ; "isbn13 bad checksum")]
    #[test_case("1230306406157", false ; "isbn13 bad prefix")]
    fn test_isbn(input: &str, expected: bool) {
        assert_eq!(is_isbn(input), expected);
    }

    #[test]
    fn test_isbn_lengths_are_distinct() {
        assert!(is_isbn10("0-306-40615-2"));
        assert!(!is_isbn13("0-306-40615-2"));
        assert!(is_isbn13("978-0-306-40615-7"));
        assert!(!is_isbn10("978-0-306-40615-7"));
    }
}

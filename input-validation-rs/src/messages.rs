//! Human-readable messages for rule violations

/// Message for a violated rule, given its tag and parameter
pub fn error_message(tag: &str, param: &str) -> String {
    match tag {
        // Required and length
        "required" => "must not be undefined".to_string(),
        "min" => format!("must be at least {} characters long", param),
        "max" => format!("must be at most {} characters long", param),
        "len" => format!("must be exactly {} characters long", param),

        // Comparisons
        "eq" | "eqfield" => format!("must be equal to {}", param),
        "ne" | "nefield" => format!("must not be equal to {}", param),
        "lt" | "ltfield" => format!("must be less than {}", param),
        "lte" | "ltefield" => format!("must be less than or equal to {}", param),
        "gt" | "gtfield" => format!("must be greater than {}", param),
        "gte" | "gtefield" => format!("must be greater than or equal to {}", param),
        "oneof" => format!("must be one of [{}]", param),

        // String types
        "alpha" => "must contain only alphabetic characters".to_string(),
        "alphanum" => "must contain only alphanumeric characters".to_string(),
        "alphanumunicode" => "must contain only alphanumeric characters and spaces".to_string(),
        "email" => "must be a valid email address".to_string(),

        // Formats
        "url" => "must be a valid URL".to_string(),
        "uri" => "must be a valid URI".to_string(),
        "uuid" => "must be a valid UUID".to_string(),
        "uuid3" => "must be a valid UUIDv3".to_string(),
        "uuid4" => "must be a valid UUIDv4".to_string(),
        "uuid5" => "must be a valid UUIDv5".to_string(),
        "isbn" => "must be a valid ISBN".to_string(),
        "isbn10" => "must be a valid ISBN-10".to_string(),
        "isbn13" => "must be a valid ISBN-13".to_string(),
        "contains" => format!("must contain '{}'", param),
        "excludes" => format!("must not contain '{}'", param),
        "startswith" => format!("must start with '{}'", param),
        "endswith" => format!("must end with '{}'", param),
        "ip" => "must be a valid IP address".to_string(),
        "ipv4" => "must be a valid IPv4 address".to_string(),
        "ipv6" => "must be a valid IPv6 address".to_string(),
        "mac" => "must be a valid MAC address".to_string(),
        "cidr" => "must be a valid CIDR notation".to_string(),
        "cidrv4" => "must be a valid CIDR notation (IPv4)".to_string(),
        "cidrv6" => "must be a valid CIDR notation (IPv6)".to_string(),
        "dive" => "must have valid items only".to_string(),

        _ => "is invalid".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("required", "", "must not be undefined")]
    #[test_case("min", "2", "must be at least 2 characters long")]
    #[test_case("max", "10", "must be at most 10 characters long")]
    #[test_case("len", "5", "must be exactly 5 characters long")]
    #[test_case("eqfield", "Password", "must be equal to Password")]
    #[test_case("gte", "18", "must be greater than or equal to 18")]
    #[test_case("ltefield", "End", "must be less than or equal to End")]
    #[test_case("oneof", "red green", "must be one of [red green]")]
    #[test_case("alphanumunicode", "", "must contain only alphanumeric characters and spaces")]
    #[test_case("email", "", "must be a valid email address")]
    #[test_case("uuid4", "", "must be a valid UUIDv4")]
    #[test_case("isbn13", "", "must be a valid ISBN-13")]
    #[test_case("startswith", "ab", "must start with 'ab'")]
    #[test_case("excludes", "x", "must not contain 'x'")]
    #[test_case("cidrv6", "", "must be a valid CIDR notation (IPv6)")]
    #[test_case("dive", "", "must have valid items only")]
    #[test_case("foo", "", "is invalid" ; "unknown tag")]
    fn test_error_message(tag: &str, param: &str, expected: &str) {
        assert_eq!(error_message(tag, param), expected);
    }
}

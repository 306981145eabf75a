use std::borrow::Cow;

const REDACTED: &str = "REDACTED";

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(0);
    }
    if nee.len() > hay.len() {
        return None;
    }

    (0..=hay.len() - nee.len()).find(|&i| {
        hay[i..i + nee.len()]
            .iter()
            .zip(nee)
            .all(|(a, b)| a.to_ascii_lowercase() == b.to_ascii_lowercase())
    })
}

/// Replaces the value following every occurrence of `marker` up to the first
/// character rejected by `is_value_char`.
fn redact_after(text: String, marker: &str, is_value_char: fn(char) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    loop {
        let Some(idx) = find_ascii_case_insensitive(rest, marker) else {
            out.push_str(rest);
            break;
        };
        let end = idx + marker.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        let consumed: usize = rest
            .chars()
            .take_while(|c| is_value_char(*c))
            .map(char::len_utf8)
            .sum();
        if consumed > 0 {
            out.push_str(REDACTED);
        }
        rest = &rest[consumed..];
    }
    out
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~' | '+' | '/' | '=')
}

fn is_json_string_char(ch: char) -> bool {
    ch != '"'
}

fn is_query_value_char(ch: char) -> bool {
    !matches!(ch, '&' | '#' | ' ' | '\n' | '\r' | '"')
}

/// Strips bearer credentials, token JSON fields and `token=` query values.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut value = input.to_string();

    value = redact_after(value, "Bearer ", is_token_char);
    for field in ["\"accessToken\":\"", "\"refreshToken\":\"", "\"token\":\""] {
        value = redact_after(value, field, is_json_string_char);
    }
    for field in ["\"accessToken\": \"", "\"refreshToken\": \"", "\"token\": \""] {
        value = redact_after(value, field, is_json_string_char);
    }
    for param in ["?token=", "&token="] {
        value = redact_after(value, param, is_query_value_char);
    }

    if value == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(value)
    }
}

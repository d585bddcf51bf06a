//! Minimal readers for the flat XML documents the IAM endpoint returns.

use super::error::{IamError, IamErrorCode};

/// Text of the first `<tag>...</tag>` element, entity-decoded
pub fn field(xml: &str, tag: &str) -> Option<String> {
    element(xml, tag).map(unescape)
}

/// Raw inner text of every `<tag>...</tag>` element, in document order
pub fn blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let start = format!("<{}>", tag);
    let end = format!("</{}>", tag);
    let mut found = Vec::new();
    let mut rest = xml;
    while let Some(si) = rest.find(&start) {
        let body = &rest[si + start.len()..];
        match body.find(&end) {
            Some(ei) => {
                found.push(&body[..ei]);
                rest = &body[ei + end.len()..];
            }
            None => break,
        }
    }
    found
}

pub fn flag(xml: &str, tag: &str) -> bool {
    field(xml, tag).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Decode an `<ErrorResponse><Error>...</Error></ErrorResponse>` document
pub fn error(xml: &str) -> Option<IamError> {
    let body = element(xml, "Error")?;
    let code = field(body, "Code")?;
    let message = field(body, "Message").unwrap_or_default();
    let error_code = code
        .trim()
        .parse::<IamErrorCode>()
        .unwrap_or_else(|never| match never {});
    Some(IamError::new(error_code, message))
}

fn element<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let start = format!("<{}>", tag);
    let end = format!("</{}>", tag);
    let si = xml.find(&start)? + start.len();
    let ei = xml[si..].find(&end)? + si;
    Some(&xml[si..ei])
}

fn unescape(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

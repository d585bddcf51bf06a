//! AWS Signature Version 4 for IAM Query API requests.
//!
//! Requests are `POST /` with a form-encoded body, so the signature covers
//! the headers and the body hash rather than a query string.

use super::error::{GatewayError, GatewayResult};
use crate::common::CredentialContext;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

pub const SERVICE: &str = "iam";
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// RFC 3986 unreserved characters pass through, everything else is escaped
const AWS_QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type HmacSha256 = Hmac<Sha256>;

pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, AWS_QUERY_ENCODE_SET).to_string()
}

/// Encode parameters as a form body, keys sorted the same way the
/// canonical query is.
pub fn form_body(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> GatewayResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| GatewayError::protocol(format!("invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Headers to attach to a signed request, in canonical order
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub headers: Vec<(String, String)>,
}

/// Sign a `POST /` request carrying `body` for the given host and region.
pub fn sign_post(
    context: &CredentialContext,
    region: &str,
    host: &str,
    body: &str,
    now: DateTime<Utc>,
) -> GatewayResult<SignedRequest> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = &amz_date[..8];
    let payload_hash = sha256_hex(body.as_bytes());

    // Header names are already lowercase and sorted
    let mut headers: Vec<(String, String)> = vec![
        ("content-type".to_string(), CONTENT_TYPE.to_string()),
        ("host".to_string(), host.to_string()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(token) = context.session_token() {
        headers.push(("x-amz-security-token".to_string(), token.to_string()));
    }

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let canonical_request = format!(
        "POST\n/\n\n{}\n{}\n{}",
        canonical_headers, signed_headers, payload_hash
    );

    // String to sign
    let scope = format!("{}/{}/{}/aws4_request", date_stamp, region, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    // Derive signing key
    let k_date = hmac_sha256(
        format!("AWS4{}", context.secret_key()).as_bytes(),
        date_stamp.as_bytes(),
    )?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes())?;
    let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
    let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM,
        context.access_key(),
        scope,
        signed_headers,
        signature
    );
    headers.push(("authorization".to_string(), authorization));

    Ok(SignedRequest { headers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signature_of(signed: &SignedRequest) -> &str {
        let (_, auth) = signed
            .headers
            .iter()
            .find(|(k, _)| k == "authorization")
            .unwrap();
        auth.rsplit("Signature=").next().unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_encode_unreserved_passthrough() {
        assert_eq!(encode("abc-_.~XYZ09"), "abc-_.~XYZ09");
        assert_eq!(encode("a b@c/d"), "a%20b%40c%2Fd");
        assert_eq!(encode("Passw0rd!"), "Passw0rd%21");
    }

    #[test]
    fn test_form_body_sorted() {
        let params = vec![
            ("Email".to_string(), "t1@x.com".to_string()),
            ("Action".to_string(), "CreateAccount".to_string()),
            ("AccountName".to_string(), "tenant1".to_string()),
        ];
        assert_eq!(
            form_body(&params),
            "AccountName=tenant1&Action=CreateAccount&Email=t1%40x.com"
        );
    }

    #[test]
    fn test_signature_known_vector() {
        let ctx = CredentialContext::root("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
        let body = "Action=ListAccounts";
        let signed = sign_post(&ctx, "us-east-1", "127.0.0.1:9080", body, fixed_now()).unwrap();

        assert_eq!(
            signature_of(&signed),
            "85f085665e54a7ef54e72b858c13adca987da316220dcb092eb7504995d691f9"
        );
        let auth = &signed.headers.last().unwrap().1;
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20200115/us-east-1/iam/aws4_request, SignedHeaders=content-type;host;x-amz-date, Signature="
        ));
    }

    #[test]
    fn test_session_token_is_signed() {
        let ctx = CredentialContext::caller(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            Some("session-token".to_string()),
        );
        let signed =
            sign_post(&ctx, "us-east-1", "127.0.0.1:9080", "Action=ListAccounts", fixed_now())
                .unwrap();

        assert_eq!(
            signature_of(&signed),
            "73be1137cd8ceb1debec9e2b85b0f993cea60e240354fc35603ba3a1a1881e5e"
        );
        assert!(signed
            .headers
            .iter()
            .any(|(k, v)| k == "x-amz-security-token" && v == "session-token"));
        assert!(signed
            .headers
            .last()
            .unwrap()
            .1
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token"));
    }
}

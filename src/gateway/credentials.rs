//! `Authorization: Basic` decoding and surface validation.

use base64ct::{Base64, Encoding};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::GatewayError;

const BASIC_SCHEME: &str = "Basic";

/// Username/password pair that lives for one request. The password is redacted in `Debug`.
#[derive(Debug)]
pub struct Credential {
    username: String,
    password: SecretString,
}

impl Credential {
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

/// 3 to 16 letters, digits or hyphens.
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[-a-zA-Z0-9]{3,16}$").is_ok_and(|re| re.is_match(username))
}

/// 2 to 32 characters, no spaces.
pub fn valid_password(password: &str) -> bool {
    Regex::new(r"^[^ ]{2,32}$").is_ok_and(|re| re.is_match(password))
}

/// Decode the raw `Authorization` header value into a [`Credential`].
///
/// # Errors
/// - `MissingCredentials` when the header, the `Basic` scheme or the single payload token is missing
/// - `MalformedEncoding` when the payload is not base64 of UTF-8 text
/// - `MalformedCredentialPair` when the text is not exactly `user:password`
/// - `InvalidCredentialFormat` when either field fails the syntax rules
pub fn decode_basic(header: Option<&str>) -> Result<Credential, GatewayError> {
    let header = header.ok_or(GatewayError::MissingCredentials)?;
    let mut tokens = header.split_whitespace();
    let (Some(scheme), Some(payload), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(GatewayError::MissingCredentials);
    };
    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return Err(GatewayError::MissingCredentials);
    }

    let decoded = Base64::decode_vec(payload).map_err(|_| GatewayError::MalformedEncoding)?;
    let decoded = SecretString::from(
        String::from_utf8(decoded).map_err(|_| GatewayError::MalformedEncoding)?,
    );

    let mut fields = decoded.expose_secret().split(':');
    let (Some(username), Some(password), None) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(GatewayError::MalformedCredentialPair);
    };

    if !valid_username(username) || !valid_password(password) {
        return Err(GatewayError::InvalidCredentialFormat);
    }

    Ok(Credential {
        username: username.to_string(),
        password: SecretString::from(password),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(pair: &str) -> String {
        format!("Basic {}", Base64::encode_string(pair.as_bytes()))
    }

    #[test]
    fn decodes_valid_pair() {
        let header = basic("validuser:s3cret!");
        let credential = decode_basic(Some(&header));
        assert!(credential.is_ok());
        if let Ok(credential) = credential {
            assert_eq!(credential.username(), "validuser");
            assert_eq!(credential.password().expose_secret(), "s3cret!");
        }
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let header = basic("validuser:secret").replacen("Basic", "basic", 1);
        assert!(decode_basic(Some(&header)).is_ok());
    }

    #[test]
    fn debug_output_redacts_password() {
        let header = basic("validuser:hunter22");
        let credential = decode_basic(Some(&header));
        let rendered = format!("{credential:?}");
        assert!(rendered.contains("validuser"));
        assert!(!rendered.contains("hunter22"));
    }

    #[test]
    fn missing_header_or_payload() {
        for header in [None, Some(""), Some("Basic"), Some("Basic   ")] {
            assert!(
                matches!(decode_basic(header), Err(GatewayError::MissingCredentials)),
                "{header:?}"
            );
        }
    }

    #[test]
    fn wrong_scheme_or_arity() {
        let payload = Base64::encode_string(b"validuser:secret");
        for header in [
            format!("Bearer {payload}"),
            format!("Basic {payload} extra"),
            payload.clone(),
        ] {
            assert!(
                matches!(
                    decode_basic(Some(&header)),
                    Err(GatewayError::MissingCredentials)
                ),
                "{header}"
            );
        }
    }

    #[test]
    fn undecodable_payload() {
        assert!(matches!(
            decode_basic(Some("Basic not*base64")),
            Err(GatewayError::MalformedEncoding)
        ));
        let not_utf8 = format!("Basic {}", Base64::encode_string(&[0xff, 0xfe, 0x3a, 0x41]));
        assert!(matches!(
            decode_basic(Some(&not_utf8)),
            Err(GatewayError::MalformedEncoding)
        ));
    }

    #[test]
    fn pair_needs_exactly_one_separator() {
        for pair in ["validuser", "validuser:pass:word", "a:b:c:d"] {
            let header = basic(pair);
            assert!(
                matches!(
                    decode_basic(Some(&header)),
                    Err(GatewayError::MalformedCredentialPair)
                ),
                "{pair}"
            );
        }
    }

    #[test]
    fn field_syntax_is_enforced() {
        for pair in [
            "ab:secret",
            ":secret",
            "seventeen-chars-x:secret",
            "bad_user:secret",
            "validuser:x",
            "validuser:has space",
            "validuser:",
        ] {
            let header = basic(pair);
            assert!(
                matches!(
                    decode_basic(Some(&header)),
                    Err(GatewayError::InvalidCredentialFormat)
                ),
                "{pair}"
            );
        }
        let long_password = format!("validuser:{}", "p".repeat(33));
        assert!(matches!(
            decode_basic(Some(&basic(&long_password))),
            Err(GatewayError::InvalidCredentialFormat)
        ));
    }

    #[test]
    fn field_syntax_accepts_bounds() {
        assert!(valid_username("abc"));
        assert!(valid_username("sixteen-chars-xx"));
        assert!(valid_password("ab"));
        assert!(valid_password(&"p".repeat(32)));
    }
}

//! Caller origin resolution.

use std::fmt;

use super::GatewayError;

/// Network address of the caller without the port; the lockout key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a raw peer address (`host:port` or `[v6]:port`) and keep the host.
///
/// # Errors
/// Returns `GatewayError::UnresolvedOrigin` if the address is absent, has no
/// port, or either part is malformed.
pub fn resolve_origin(peer: Option<&str>) -> Result<ClientIdentity, GatewayError> {
    let raw = peer.map(str::trim).unwrap_or_default();
    let (host, port) = split_host_port(raw).ok_or(GatewayError::UnresolvedOrigin)?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(GatewayError::UnresolvedOrigin);
    }
    Ok(ClientIdentity(host.to_string()))
}

fn split_host_port(raw: &str) -> Option<(&str, &str)> {
    if let Some(rest) = raw.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        return Some((host, port));
    }
    let (host, port) = raw.rsplit_once(':')?;
    // An unbracketed IPv6 literal is ambiguous.
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}

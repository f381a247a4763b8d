use crate::error::{CoreError, CoreResult};
use std::net::IpAddr;

pub fn is_loopback_endpoint(endpoint: &str) -> CoreResult<bool> {
    let url = url::Url::parse(endpoint)
        .map_err(|_| CoreError::Config(format!("invalid endpoint URL: {}", endpoint)))?;
    let host = url
        .host_str()
        .ok_or_else(|| CoreError::Config("endpoint missing host".to_string()))?;
    if host.eq_ignore_ascii_case("localhost") {
        return Ok(true);
    }
    let host = host.trim_start_matches('[').trim_end_matches(']');
    match host.parse::<IpAddr>() {
        Ok(ip) => Ok(ip.is_loopback()),
        Err(_) => Ok(false),
    }
}

/// Local model servers must not be reachable through a remote address.
pub fn enforce_loopback_endpoint(endpoint: &str) -> CoreResult<()> {
    if !is_loopback_endpoint(endpoint)? {
        return Err(CoreError::PolicyBlocked(format!(
            "local provider endpoint rejected: {} is not loopback",
            endpoint
        )));
    }
    Ok(())
}

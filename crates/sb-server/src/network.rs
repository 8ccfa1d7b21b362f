//! Advertised-address discovery.

use std::net::IpAddr;

use tokio::net::UdpSocket;

/// Well-known public address used only to pick the outbound interface.
const PROBE_TARGET: &str = "8.8.8.8:80";

/// IP address of the interface the OS would route public traffic through.
///
/// Connecting a UDP socket only selects a route; no packet is sent.
pub async fn outbound_ip() -> sb_core::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(PROBE_TARGET).await.map_err(|e| {
        sb_core::Error::Internal(format!("No route to {PROBE_TARGET} to discover outbound IP: {e}"))
    })?;
    Ok(socket.local_addr()?.ip())
}

/// Host embedded in generated URLs: the configured one, else the outbound IP.
pub async fn advertised_host(configured: Option<&str>) -> sb_core::Result<String> {
    match configured.map(str::trim).filter(|h| !h.is_empty()) {
        Some(host) => Ok(host.to_string()),
        None => Ok(outbound_ip().await?.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn configured_host_wins() {
        assert_eq!(
            advertised_host(Some("media.local")).await.unwrap(),
            "media.local"
        );
    }
}

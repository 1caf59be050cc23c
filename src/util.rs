use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static INTERVAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*([mhd])\s*$").expect("interval pattern is a valid regex")
});

/// Parse a reporting interval of the form `<integer><unit>`.
///
/// Supported units are `m` (minutes), `h` (hours) and `d` (days).
/// Returns `None` for anything else, including bare numbers.
pub fn parse_interval(raw: &str) -> Option<Duration> {
    let captures = INTERVAL_PATTERN.captures(raw)?;
    let amount: u64 = captures[1].parse().ok()?;

    let unit_secs = match &captures[2] {
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        _ => return None,
    };

    amount.checked_mul(unit_secs).map(Duration::from_secs)
}

/// Normalize a sensor identifier so that `aa:bb:cc` and `AABBCC` refer to the same sensor.
pub fn normalize_sensor_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ':' | '-') && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

const FALLBACK_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Best guess at the address this host is reachable under on the local network.
///
/// Connecting a UDP socket does not send any packets, it only selects the
/// outbound interface.
pub fn get_local_ip() -> IpAddr {
    let lookup = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(10, 255, 255, 255), 1))?;
        Ok(socket.local_addr()?.ip())
    };

    lookup().unwrap_or(FALLBACK_ADDR)
}

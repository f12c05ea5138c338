//! Network identity reported upstream.
//!
//! The reported state carries the address the device is reachable on.
//! The first non-loopback IPv4 interface wins; IPv6 is only used when no
//! IPv4 address exists.

use std::net::IpAddr;

use if_addrs::get_if_addrs;
use log::{debug, warn};

/// Pick the address to report from `(interface name, address)` pairs.
pub fn select_primary<'a>(addrs: impl IntoIterator<Item = (&'a str, IpAddr)>) -> Option<IpAddr> {
    let mut fallback_v6 = None;
    for (name, ip) in addrs {
        if ip.is_loopback() || ip.is_unspecified() {
            continue;
        }
        match ip {
            IpAddr::V4(_) => {
                debug!("DeviceId: primary address {} on {}", ip, name);
                return Some(ip);
            }
            IpAddr::V6(_) => {
                fallback_v6.get_or_insert(ip);
            }
        }
    }
    fallback_v6
}

/// Address of this host, if any interface is up.
pub fn primary_ip() -> Option<IpAddr> {
    let interfaces = match get_if_addrs() {
        Ok(list) => list,
        Err(e) => {
            warn!("DeviceId: cannot enumerate interfaces: {}", e);
            return None;
        }
    };
    select_primary(interfaces.iter().map(|i| (i.name.as_str(), i.ip())))
}

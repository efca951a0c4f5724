//! IpAddress value as defined in [Section 5.4](https://datatracker.ietf.org/doc/html/rfc2741#section-5.4)
//!
//! Sent as an Octet String holding exactly four octets in network order.

use std::net::Ipv4Addr;

use crate::codec::{Reader, Writer};
use crate::{Error, Result};

/// number of bytes of the encoded form: length plus four octets, no padding
pub const ENCODING_SIZE: usize = 8;

/// append `addr` to `w`
pub fn encode(w: &mut Writer<'_>, addr: &Ipv4Addr) {
    w.trace(format_args!("appending IpAddress: {}", addr));
    let start = w.len();
    w.trace(format_args!("appending IpAddress size"));
    w.put_i32(4);
    w.trace(format_args!("appending IpAddress bytes"));
    w.put_bytes(&addr.octets());
    w.trace_since("IpAddress", start);
}

/// consume an address from `r`
pub fn decode(r: &mut Reader<'_, '_>) -> Result<Ipv4Addr> {
    r.trace(format_args!("parsing IpAddress size"));
    let len = r.get_i32()?;
    if len != 4 {
        return Err(Error::InvalidIpAddressLength(len));
    }
    r.trace(format_args!("parsing IpAddress bytes:"));
    let b = r.chunk(4)?;
    let addr = Ipv4Addr::new(b[0], b[1], b[2], b[3]);
    r.trace(format_args!("parsed IpAddress: {}", addr));
    Ok(addr)
}

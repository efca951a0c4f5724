#![warn(missing_docs)]

//! AgentX PDU codec
//!
//! This library converts AgentX Protocol Data Units as defined in [RFC2741](https://datatracker.ietf.org/doc/html/rfc2741) to and from their wire representation.
//! It is a pure encode/decode engine: no transport, no session state, no MIB modelling.
//!
//! A PDU is read in two steps, a fixed size header followed by the payload whose size the header declares:
//!
//! ```
//! # use agentx_codec::pdu::{self, Flags, Pdu, PayloadParams, PduTag, HEADER_SIZE};
//! # use agentx_codec::encodings::{ObjectId, SearchRange};
//! # use std::str::FromStr;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut get = Pdu::new(PduTag::Get, PayloadParams::NoParams);
//! get.flags = Flags::NETWORK_BYTE_ORDER;
//! get.ranges.push(SearchRange::new(ObjectId::from_str("1.3.6.1.4.1.999.1.0")?, ObjectId::default()));
//! let bytes = pdu::encode(&get)?;
//!
//! let mut got = pdu::decode_header(&bytes[..HEADER_SIZE])?;
//! pdu::decode_payload(&mut got, &bytes[HEADER_SIZE..])?;
//! assert_eq!(got.ranges, get.ranges);
//! # Ok(())
//! # }
//! ```
//!
//! Every entry point has a `_traced` twin that produces identical results and narrates each step,
//! including hex dumps of the bytes involved, to a [`trace::LogSink`].

pub mod codec;
pub mod encodings;
pub mod error;
pub mod hex;
pub mod pdu;
pub mod trace;

#[doc(inline)]
pub use error::{Error, Result};

use std::convert::TryInto;
use std::fmt;

// byteorder only offers LittleEndian and BigEndian as separate types, the byte order here is a runtime property of each PDU.
// so let's have our own enum + some native helpers

/// Byte order used when serializing and deserializing multi-byte integers
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ByteOrder {
    /// little endian byte order, used when the NetworkByteOrder flag is clear
    LittleEndian,
    /// big endian ("network") byte order, used when the NetworkByteOrder flag is set
    BigEndian,
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BigEndian => write!(f, "network byte order"),
            Self::LittleEndian => write!(f, "inverse byte order"),
        }
    }
}

fn underflow(needed: usize, available: usize) -> Error {
    Error::Underflow { needed, available }
}

fn i16_to_bytes(from: i16, bo: ByteOrder) -> [u8; 2] {
    match bo {
        ByteOrder::BigEndian => from.to_be_bytes(),
        ByteOrder::LittleEndian => from.to_le_bytes(),
    }
}

fn bytes_to_i16(from: &[u8], bo: ByteOrder) -> Result<i16> {
    let from = from.get(0..2).ok_or_else(|| underflow(2, from.len()))?;
    let from = from.try_into().map_err(|_| underflow(2, from.len()))?;
    match bo {
        ByteOrder::BigEndian => Ok(i16::from_be_bytes(from)),
        ByteOrder::LittleEndian => Ok(i16::from_le_bytes(from)),
    }
}

fn i32_to_bytes(from: i32, bo: ByteOrder) -> [u8; 4] {
    match bo {
        ByteOrder::BigEndian => from.to_be_bytes(),
        ByteOrder::LittleEndian => from.to_le_bytes(),
    }
}

fn bytes_to_i32(from: &[u8], bo: ByteOrder) -> Result<i32> {
    let from = from.get(0..4).ok_or_else(|| underflow(4, from.len()))?;
    let from = from.try_into().map_err(|_| underflow(4, from.len()))?;
    match bo {
        ByteOrder::BigEndian => Ok(i32::from_be_bytes(from)),
        ByteOrder::LittleEndian => Ok(i32::from_le_bytes(from)),
    }
}

fn u32_to_bytes(from: u32, bo: ByteOrder) -> [u8; 4] {
    match bo {
        ByteOrder::BigEndian => from.to_be_bytes(),
        ByteOrder::LittleEndian => from.to_le_bytes(),
    }
}

fn bytes_to_u32(from: &[u8], bo: ByteOrder) -> Result<u32> {
    let from = from.get(0..4).ok_or_else(|| underflow(4, from.len()))?;
    let from = from.try_into().map_err(|_| underflow(4, from.len()))?;
    match bo {
        ByteOrder::BigEndian => Ok(u32::from_be_bytes(from)),
        ByteOrder::LittleEndian => Ok(u32::from_le_bytes(from)),
    }
}

fn u64_to_bytes(from: u64, bo: ByteOrder) -> [u8; 8] {
    match bo {
        ByteOrder::BigEndian => from.to_be_bytes(),
        ByteOrder::LittleEndian => from.to_le_bytes(),
    }
}

fn bytes_to_u64(from: &[u8], bo: ByteOrder) -> Result<u64> {
    let from = from.get(0..8).ok_or_else(|| underflow(8, from.len()))?;
    let from = from.try_into().map_err(|_| underflow(8, from.len()))?;
    match bo {
        ByteOrder::BigEndian => Ok(u64::from_be_bytes(from)),
        ByteOrder::LittleEndian => Ok(u64::from_le_bytes(from)),
    }
}

impl ByteOrder {
    /// append `val` to `buf`
    pub fn append_i16(self, buf: &mut Vec<u8>, val: i16) {
        buf.extend(i16_to_bytes(val, self));
    }

    /// append `val` to `buf`
    pub fn append_i32(self, buf: &mut Vec<u8>, val: i32) {
        buf.extend(i32_to_bytes(val, self));
    }

    /// append `val` to `buf`
    pub fn append_u32(self, buf: &mut Vec<u8>, val: u32) {
        buf.extend(u32_to_bytes(val, self));
    }

    /// append `val` to `buf`
    pub fn append_u64(self, buf: &mut Vec<u8>, val: u64) {
        buf.extend(u64_to_bytes(val, self));
    }

    /// parse an i16 from the start of `b`, returning the value and the rest of `b`
    pub fn parse_i16(self, b: &[u8]) -> Result<(i16, &[u8])> {
        Ok((bytes_to_i16(b, self)?, &b[2..]))
    }

    /// parse an i32 from the start of `b`, returning the value and the rest of `b`
    pub fn parse_i32(self, b: &[u8]) -> Result<(i32, &[u8])> {
        Ok((bytes_to_i32(b, self)?, &b[4..]))
    }

    /// parse a u32 from the start of `b`, returning the value and the rest of `b`
    pub fn parse_u32(self, b: &[u8]) -> Result<(u32, &[u8])> {
        Ok((bytes_to_u32(b, self)?, &b[4..]))
    }

    /// parse a u64 from the start of `b`, returning the value and the rest of `b`
    pub fn parse_u64(self, b: &[u8]) -> Result<(u64, &[u8])> {
        Ok((bytes_to_u64(b, self)?, &b[8..]))
    }
}

//! Value and Varbind as defined in [Section 5.4](https://datatracker.ietf.org/doc/html/rfc2741#section-5.4)

use std::fmt;
use std::mem::size_of;
use std::net::Ipv4Addr;

use crate::codec::{Reader, Writer};
use crate::encodings::{ipaddress, ObjectId, OctetString, Opaque};
use crate::{ByteOrder, Error, Result};

/// ASN.1 type tag of a Varbind value
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum AsnTag {
    /// 4 byte signed integer
    Integer32,
    /// Octet String
    OctetString,
    /// no value
    Null,
    /// Object Identifier
    ObjectId,
    /// constructed type, never carried by a Varbind
    Sequence,
    /// IPv4 address
    IpAddress,
    /// 4 byte unsigned counter
    Counter32,
    /// 4 byte unsigned gauge
    Gauge32,
    /// hundredths of a second
    TimeTicks,
    /// ASN.1 encoded blob
    Opaque,
    /// 8 byte unsigned counter
    Counter64,
    /// exception: no such object
    NoSuchObject,
    /// exception: no such instance
    NoSuchInstance,
    /// exception: end of MIB view
    EndOfMibView,
}

impl AsnTag {
    /// tag number as sent on the wire
    pub fn to_i16(self) -> i16 {
        match self {
            Self::Integer32 => 2,
            Self::OctetString => 4,
            Self::Null => 5,
            Self::ObjectId => 6,
            Self::Sequence => 48,
            Self::IpAddress => 64,
            Self::Counter32 => 65,
            Self::Gauge32 => 66,
            Self::TimeTicks => 67,
            Self::Opaque => 68,
            Self::Counter64 => 70,
            Self::NoSuchObject => 128,
            Self::NoSuchInstance => 129,
            Self::EndOfMibView => 130,
        }
    }

    /// tag for a wire number, if known
    pub fn from_i16(n: i16) -> Option<Self> {
        let tag = match n {
            2 => Self::Integer32,
            4 => Self::OctetString,
            5 => Self::Null,
            6 => Self::ObjectId,
            48 => Self::Sequence,
            64 => Self::IpAddress,
            65 => Self::Counter32,
            66 => Self::Gauge32,
            67 => Self::TimeTicks,
            68 => Self::Opaque,
            70 => Self::Counter64,
            128 => Self::NoSuchObject,
            129 => Self::NoSuchInstance,
            130 => Self::EndOfMibView,
            _ => return None,
        };
        Some(tag)
    }

    /// true for the tags a Varbind may carry
    pub fn is_value_tag(self) -> bool {
        self != Self::Sequence
    }

    /// tag name
    pub fn name(self) -> &'static str {
        match self {
            Self::Integer32 => "Integer32",
            Self::OctetString => "OctetString",
            Self::Null => "Null",
            Self::ObjectId => "ObjectId",
            Self::Sequence => "Sequence",
            Self::IpAddress => "IpAddress",
            Self::Counter32 => "Counter32",
            Self::Gauge32 => "Gauge32",
            Self::TimeTicks => "TimeTicks",
            Self::Opaque => "Opaque",
            Self::Counter64 => "Counter64",
            Self::NoSuchObject => "NoSuchObject",
            Self::NoSuchInstance => "NoSuchInstance",
            Self::EndOfMibView => "EndOfMibView",
        }
    }
}

impl fmt::Display for AsnTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Value as defined in [Section 5.4](https://datatracker.ietf.org/doc/html/rfc2741#section-5.4)
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub enum Value {
    /// 4 byte (signed) integer type
    Integer32(i32),
    /// OctetString
    OctetString(OctetString),
    /// null type (does not contain encoded value)
    #[default]
    Null,
    /// Object identifier
    ObjectId(ObjectId),
    /// IPv4 address
    IpAddress(Ipv4Addr),
    /// 4 byte (unsigned) integer type
    Counter32(u32),
    /// 4 byte (unsigned) integer type
    Gauge32(u32),
    /// 4 byte (unsigned) integer type
    TimeTicks(u32),
    /// Opaque type
    Opaque(Opaque),
    /// 8 byte (unsigned) integer type
    Counter64(u64),
    /// NoSuchObject (does not contain encoded value)
    NoSuchObject,
    /// NoSuchInstance (does not contain encoded value)
    NoSuchInstance,
    /// EndOfMibView (does not contain encoded value)
    EndOfMibView,
}

impl Value {
    /// tag selecting the value's encoding
    pub fn tag(&self) -> AsnTag {
        match self {
            Self::Integer32(_) => AsnTag::Integer32,
            Self::OctetString(_) => AsnTag::OctetString,
            Self::Null => AsnTag::Null,
            Self::ObjectId(_) => AsnTag::ObjectId,
            Self::IpAddress(_) => AsnTag::IpAddress,
            Self::Counter32(_) => AsnTag::Counter32,
            Self::Gauge32(_) => AsnTag::Gauge32,
            Self::TimeTicks(_) => AsnTag::TimeTicks,
            Self::Opaque(_) => AsnTag::Opaque,
            Self::Counter64(_) => AsnTag::Counter64,
            Self::NoSuchObject => AsnTag::NoSuchObject,
            Self::NoSuchInstance => AsnTag::NoSuchInstance,
            Self::EndOfMibView => AsnTag::EndOfMibView,
        }
    }

    /// number of bytes the encoded value occupies (tag and name excluded)
    pub fn encoding_size(&self) -> usize {
        match self {
            Self::Integer32(_) => size_of::<i32>(),
            Self::OctetString(o) => o.encoding_size(),
            Self::ObjectId(i) => i.encoding_size(),
            Self::IpAddress(_) => ipaddress::ENCODING_SIZE,
            Self::Counter32(_) | Self::Gauge32(_) | Self::TimeTicks(_) => size_of::<u32>(),
            Self::Opaque(o) => o.encoding_size(),
            Self::Counter64(_) => size_of::<u64>(),
            Self::Null | Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView => 0,
        }
    }

    fn encode(&self, w: &mut Writer<'_>) -> Result<()> {
        match self {
            Self::Integer32(i) => w.put_i32(*i),
            Self::OctetString(s) => s.encode(w)?,
            Self::ObjectId(i) => i.encode(w, false)?,
            Self::IpAddress(a) => ipaddress::encode(w, a),
            Self::Counter32(c) | Self::Gauge32(c) | Self::TimeTicks(c) => w.put_u32(*c),
            Self::Opaque(o) => o.encode(w)?,
            Self::Counter64(c) => w.put_u64(*c),
            Self::Null | Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView => {
                w.trace(format_args!("{} has no value to append", self.tag()))
            }
        }
        Ok(())
    }

    fn decode(r: &mut Reader<'_, '_>, tag: AsnTag) -> Result<Self> {
        let value = match tag {
            AsnTag::Integer32 => Self::Integer32(r.get_i32()?),
            AsnTag::OctetString => Self::OctetString(OctetString::decode(r)?),
            AsnTag::Null => Self::Null,
            AsnTag::ObjectId => Self::ObjectId(ObjectId::decode(r)?.0),
            AsnTag::IpAddress => Self::IpAddress(ipaddress::decode(r)?),
            AsnTag::Counter32 => Self::Counter32(r.get_u32()?),
            AsnTag::Gauge32 => Self::Gauge32(r.get_u32()?),
            AsnTag::TimeTicks => Self::TimeTicks(r.get_u32()?),
            AsnTag::Opaque => Self::Opaque(Opaque::decode(r)?),
            AsnTag::Counter64 => Self::Counter64(r.get_u64()?),
            AsnTag::NoSuchObject => Self::NoSuchObject,
            AsnTag::NoSuchInstance => Self::NoSuchInstance,
            AsnTag::EndOfMibView => Self::EndOfMibView,
            AsnTag::Sequence => return Err(Error::InvalidValueTag(tag.to_i16())),
        };
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer32(i) => write!(f, "{}", i),
            Self::OctetString(s) => write!(f, "{}", s),
            Self::ObjectId(i) => write!(f, "{}", i),
            Self::IpAddress(a) => write!(f, "{}", a),
            Self::Counter32(c) | Self::Gauge32(c) | Self::TimeTicks(c) => write!(f, "{}", c),
            Self::Opaque(o) => write!(f, "{}", o),
            Self::Counter64(c) => write!(f, "{}", c),
            Self::Null | Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView => Ok(()),
        }
    }
}

/// Varbind as defined in [Section 5.4](https://datatracker.ietf.org/doc/html/rfc2741#section-5.4)
///
/// # Examples
///
/// ```
/// # use agentx_codec::ByteOrder;
/// # use agentx_codec::encodings::{ObjectId, Value, Varbind};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let vb = Varbind::new(ObjectId::default(), Value::Integer32(123));
/// assert_eq!(vb.to_bytes(ByteOrder::BigEndian)?, vec![0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 123]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Varbind {
    /// OID name of the Varbind
    pub oid: ObjectId,
    /// Value of the Varbind
    pub value: Value,
}

impl Varbind {
    /// create a Varbind from an OID and a value
    pub fn new(oid: ObjectId, value: Value) -> Self {
        Self { oid, value }
    }

    /// tag of the value
    pub fn tag(&self) -> AsnTag {
        self.value.tag()
    }

    /// number of bytes the encoded form occupies
    pub fn encoding_size(&self) -> usize {
        size_of::<u32>() /* tag + reserved */ + self.oid.encoding_size() + self.value.encoding_size()
    }

    /// append the encoded form to `w`
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<()> {
        w.trace(format_args!("appending Varbind: {}", self));
        let start = w.len();

        w.trace(format_args!("appending Varbind.Tag"));
        w.put_i16(self.tag().to_i16());
        w.trace(format_args!("appending 2 reserved bytes"));
        w.put_bytes(&[0, 0]);
        w.trace_tail(2);
        w.trace(format_args!("appending Varbind.Oid"));
        self.oid.encode(w, false)?;
        w.trace(format_args!("appending Varbind.Value"));
        self.value.encode(w)?;

        w.trace_since("Varbind", start);
        Ok(())
    }

    /// consume the encoded form from `r`
    pub fn decode(r: &mut Reader<'_, '_>) -> Result<Self> {
        r.trace(format_args!("parsing Varbind.Tag"));
        let n = r.get_i16()?;
        let tag = AsnTag::from_i16(n)
            .filter(|t| t.is_value_tag())
            .ok_or(Error::InvalidValueTag(n))?;
        r.trace(format_args!("parsed Tag: {}", tag));

        r.trace(format_args!("parsing 2 reserved bytes"));
        if r.chunk(2)? != [0, 0] {
            return Err(Error::ReservedNonZero { what: "Varbind" });
        }

        r.trace(format_args!("parsing Varbind.Oid"));
        let (oid, _) = ObjectId::decode(r)?;
        r.trace(format_args!("parsing Varbind.Value"));
        let value = Value::decode(r, tag)?;

        let vb = Self { oid, value };
        r.trace(format_args!("parsed Varbind: {}", vb));
        Ok(vb)
    }

    /// serialize to bytes
    pub fn to_bytes(&self, bo: ByteOrder) -> Result<Vec<u8>> {
        let mut w = Writer::new(bo, self.encoding_size());
        self.encode(&mut w)?;
        Ok(w.into_bytes())
    }

    /// deserialize from the start of `b`
    pub fn from_bytes(b: &[u8], bo: ByteOrder) -> Result<Self> {
        Self::decode(&mut Reader::new(b, bo))
    }
}

impl fmt::Display for Varbind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {}:{}}}", self.oid, self.tag(), self.value)
    }
}

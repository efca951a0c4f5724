//! SearchRange as defined in [Section 5.2](https://datatracker.ietf.org/doc/html/rfc2741#section-5.2)

use std::fmt;

use crate::codec::{Reader, Writer};
use crate::encodings::ObjectId;
use crate::{ByteOrder, Result};

/// SearchRange as defined in [Section 5.2](https://datatracker.ietf.org/doc/html/rfc2741#section-5.2)
///
/// `start_included` travels as the `include` byte of the starting identifier,
/// the ending identifier always carries 0 there.
///
/// # Examples
///
/// ```
/// # use agentx_codec::encodings::{ObjectId, SearchRange};
/// # use std::str::FromStr;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let start = ObjectId::from_str("1.2.3.4")?;
/// let end = ObjectId::from_str("1.2.3.8")?;
/// let sr = SearchRange::new(start, end).including_start();
/// assert_eq!(sr.to_string(), "{StartOid: 1.2.3.4, EndOid: 1.2.3.8, StartIncluded: 1}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct SearchRange {
    /// starting OID
    pub start: ObjectId,
    /// ending OID, null for "no upper bound"
    pub end: ObjectId,
    /// whether `start` itself is part of the range
    pub start_included: bool,
}

impl SearchRange {
    /// create SearchRange from starting and ending IDs, `start` excluded.
    pub fn new(start: ObjectId, end: ObjectId) -> Self {
        Self {
            start,
            end,
            start_included: false,
        }
    }

    /// same range with `start` included
    pub fn including_start(mut self) -> Self {
        self.start_included = true;
        self
    }

    /// number of bytes the encoded form occupies
    pub fn encoding_size(&self) -> usize {
        self.start.encoding_size() + self.end.encoding_size()
    }

    /// append the encoded form to `w`
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<()> {
        w.trace(format_args!("appending SearchRange: {}", self));
        self.start.encode(w, self.start_included)?;
        self.end.encode(w, false)
    }

    /// consume the encoded form from `r`
    pub fn decode(r: &mut Reader<'_, '_>) -> Result<Self> {
        r.trace(format_args!("parsing SearchRange.StartOid"));
        let (start, start_included) = ObjectId::decode(r)?;
        r.trace(format_args!("parsing SearchRange.EndOid"));
        let (end, _) = ObjectId::decode(r)?;

        let sr = Self {
            start,
            end,
            start_included,
        };
        r.trace(format_args!("parsed SearchRange: {}", sr));
        Ok(sr)
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

impl fmt::Display for SearchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{StartOid: {}, EndOid: {}, StartIncluded: {}}}",
            self.start,
            self.end,
            u8::from(self.start_included)
        )
    }
}

//! Object Identifier as defined in [Section 5.1](https://datatracker.ietf.org/doc/html/rfc2741#section-5.1)
//!
//! Identifiers below `1.3.6.1` ("internet") are sent compressed: the first five
//! sub-identifiers are replaced by the fifth one stored in the `prefix` byte.
//!
//! The standard defines that OIDs are sorted lexicographically, `PartialOrd` and `Ord` are derived accordingly.

use std::convert::TryFrom;
use std::fmt;
use std::mem::size_of;
use std::str::FromStr;

use crate::codec::{Reader, Writer};
use crate::{ByteOrder, Error, Result};

const INTERNET: [u32; 4] = [1, 3, 6, 1];

/// Object Identifier as defined in [Section 5.1](https://datatracker.ietf.org/doc/html/rfc2741#section-5.1)
///
/// The `include` byte of the wire form is not part of the identifier, it is
/// passed to [`ObjectId::encode`] and returned by [`ObjectId::decode`].
///
/// # Examples
///
/// ```
/// # use agentx_codec::ByteOrder;
/// # use agentx_codec::encodings::ObjectId;
/// # use std::str::FromStr;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let expected = ObjectId::from_str("1.3.6.1.4.1.9999")?;
/// let v = expected.to_bytes(ByteOrder::BigEndian)?;
/// assert_eq!(v, vec![2, 4, 0, 0, 0, 0, 0, 1, 0, 0, 0x27, 0x0F]);
/// let got = ObjectId::from_bytes(&v, ByteOrder::BigEndian)?;
/// assert_eq!(expected, got);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct ObjectId(Vec<u32>);

impl ObjectId {
    /// maximum number of sub-identifiers of a constructed identifier
    pub const MAX_SUBIDS: usize = 128;

    /// identifier from a slice of sub-identifiers
    pub fn from_slice(sub_ids: &[u32]) -> Result<Self> {
        Self::try_from(sub_ids.to_vec())
    }

    /// check for "null Object Identifier"
    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// number of sub-identifiers
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// same as [`ObjectId::is_null`]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// sub-identifiers
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// true if `prefix` is a leading part of `self` (or equal to it)
    pub fn starts_with(&self, prefix: &ObjectId) -> bool {
        self.0.starts_with(&prefix.0)
    }

    // prefix byte, if the identifier can be sent compressed
    fn prefix(&self) -> Option<u8> {
        if self.0.len() < 5 || !self.0.starts_with(&INTERNET) {
            return None;
        }
        match u8::try_from(self.0[4]) {
            Ok(0) | Err(_) => None,
            Ok(p) => Some(p),
        }
    }

    fn emitted(&self) -> &[u32] {
        match self.prefix() {
            Some(_) => &self.0[5..],
            None => &self.0,
        }
    }

    /// number of bytes the encoded form occupies
    pub fn encoding_size(&self) -> usize {
        size_of::<u32>() /* header */ + size_of::<u32>() * self.emitted().len()
    }

    /// append the encoded form to `w`
    pub fn encode(&self, w: &mut Writer<'_>, include: bool) -> Result<()> {
        w.trace(format_args!(
            "appending ObjectId: {}, include: {}",
            self,
            u8::from(include)
        ));
        if self.is_null() {
            w.put_bytes(&[0, 0, 0, 0]);
            w.trace(format_args!("appended null ObjectId"));
            w.trace_tail(4);
            return Ok(());
        }

        let start = w.len();
        let prefix = self.prefix().unwrap_or(0);
        let sub_ids = self.emitted();
        let n_subid = u8::try_from(sub_ids.len()).map_err(|_| Error::OidTooLong(self.0.len()))?;

        w.trace(format_args!(
            "appending ObjectId header {{nsubids: {}, prefix: {}, include: {}, reserved byte: 0}}:",
            n_subid,
            prefix,
            u8::from(include)
        ));
        w.put_bytes(&[n_subid, prefix, u8::from(include), 0]);
        w.trace_tail(4);

        for id in sub_ids {
            w.put_u32(*id);
        }
        w.trace_since("ObjectId", start);

        Ok(())
    }

    /// consume the encoded form from `r`, returning the identifier and its `include` flag
    pub fn decode(r: &mut Reader<'_, '_>) -> Result<(Self, bool)> {
        r.trace(format_args!("parsing ObjectId header:"));
        let header = r.chunk(4)?;
        let (n_subid, prefix, include, reserved) = (header[0], header[1], header[2], header[3]);
        r.trace(format_args!(
            "header: {{nsubids: {}, prefix: {}, include: {}, reserved: {}}}",
            n_subid, prefix, include, reserved
        ));
        if reserved != 0 {
            return Err(Error::ReservedNonZero { what: "ObjectId" });
        }
        if n_subid == 0 && prefix == 0 {
            r.trace(format_args!("parsed ObjectId: <null>"));
            return Ok((Self::default(), include != 0));
        }

        let mut sub_ids = Vec::with_capacity(n_subid as usize + 5);
        if prefix != 0 {
            sub_ids.extend_from_slice(&INTERNET);
            sub_ids.push(u32::from(prefix));
        }
        for _ in 0..n_subid {
            sub_ids.push(r.get_u32()?);
        }

        let oid = Self(sub_ids);
        r.trace(format_args!("parsed ObjectId: {}", oid));
        Ok((oid, include != 0))
    }

    /// serialize to bytes, `include` unset
    pub fn to_bytes(&self, bo: ByteOrder) -> Result<Vec<u8>> {
        let mut w = Writer::new(bo, self.encoding_size());
        self.encode(&mut w, false)?;
        Ok(w.into_bytes())
    }

    /// deserialize from the start of `b`, dropping `include`
    pub fn from_bytes(b: &[u8], bo: ByteOrder) -> Result<Self> {
        Ok(Self::decode(&mut Reader::new(b, bo))?.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".{}", id)?;
            } else {
                write!(f, "{}", id)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Ok(Default::default());
        }

        let mut sub_ids = Vec::new();
        for i in input.split('.') {
            let val = i
                .parse::<u32>()
                .map_err(|_| Error::InvalidOid(input.to_string()))?;
            sub_ids.push(val);
        }

        TryFrom::try_from(sub_ids)
    }
}

impl TryFrom<Vec<u32>> for ObjectId {
    type Error = Error;

    fn try_from(value: Vec<u32>) -> Result<Self> {
        if value.len() > Self::MAX_SUBIDS {
            return Err(Error::OidTooLong(value.len()));
        }
        Ok(Self(value))
    }
}

impl From<ObjectId> for Vec<u32> {
    fn from(oid: ObjectId) -> Self {
        oid.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(s: &str) -> ObjectId {
        ObjectId::from_str(s).unwrap()
    }

    #[test]
    fn oid_new() {
        assert_eq!(oid("1.2.3.4").as_slice(), &[1, 2, 3, 4]);
        assert!(oid("").is_null());
        assert_eq!(
            ObjectId::from_str("1.2.x").unwrap_err(),
            Error::InvalidOid("1.2.x".to_string())
        );
        assert!(ObjectId::from_str("1..2").is_err());
    }

    #[test]
    fn oid_max_len() {
        assert!(ObjectId::try_from(vec![1; ObjectId::MAX_SUBIDS]).is_ok());
        assert_eq!(
            ObjectId::try_from(vec![1; ObjectId::MAX_SUBIDS + 1]).unwrap_err(),
            Error::OidTooLong(ObjectId::MAX_SUBIDS + 1)
        );
    }

    #[test]
    fn null_oid() {
        for bo in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            let bytes = oid("").to_bytes(bo).unwrap();
            assert_eq!(bytes, vec![0, 0, 0, 0]);
            assert!(ObjectId::from_bytes(&bytes, bo).unwrap().is_null());
        }
    }

    #[test]
    fn oid_uncompressed() {
        let v = oid("1.3.6.1");
        assert_eq!(
            v.to_bytes(ByteOrder::BigEndian).unwrap(),
            vec![4, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 3, 0, 0, 0, 6, 0, 0, 0, 1]
        );
        assert_eq!(
            v.to_bytes(ByteOrder::LittleEndian).unwrap(),
            vec![4, 0, 0, 0, 1, 0, 0, 0, 3, 0, 0, 0, 6, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn oid_prefix_only() {
        for bo in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            let v = oid("1.3.6.1.4");
            let bytes = v.to_bytes(bo).unwrap();
            assert_eq!(bytes, vec![0, 4, 0, 0]);
            assert_eq!(ObjectId::from_bytes(&bytes, bo).unwrap(), v);
        }
    }

    #[test]
    fn oid_compressed() {
        let v = oid("1.3.6.1.4.1.9999");
        assert_eq!(
            v.to_bytes(ByteOrder::BigEndian).unwrap(),
            vec![0x02, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x27, 0x0F]
        );
        assert_eq!(
            v.to_bytes(ByteOrder::LittleEndian).unwrap(),
            vec![0x02, 0x04, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0F, 0x27, 0x00, 0x00]
        );
    }

    #[test]
    fn oid_include() {
        for bo in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            let v = oid("1.3.6.1.4.1.9999");
            let mut w = Writer::new(bo, 0);
            v.encode(&mut w, true).unwrap();
            let bytes = w.into_bytes();
            assert_eq!(&bytes[..4], &[2, 4, 1, 0]);

            let (got, include) = ObjectId::decode(&mut Reader::new(&bytes, bo)).unwrap();
            assert_eq!(got, v);
            assert!(include);
        }
    }

    #[test]
    fn oid_include_vectors() {
        let cases = [
            (
                "1.3.6.1.4.1.9999",
                ByteOrder::BigEndian,
                vec![0x02, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x27, 0x0F],
            ),
            (
                "1.3.6.1.4.1.9999",
                ByteOrder::LittleEndian,
                vec![0x02, 0x04, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0F, 0x27, 0x00, 0x00],
            ),
            ("1.3.6.1.4", ByteOrder::BigEndian, vec![0x00, 0x04, 0x01, 0x00]),
            ("1.3.6.1.4", ByteOrder::LittleEndian, vec![0x00, 0x04, 0x01, 0x00]),
        ];

        for (s, bo, expected) in cases {
            let v = oid(s);
            let mut w = Writer::new(bo, 0);
            v.encode(&mut w, true).unwrap();
            assert_eq!(w.into_bytes(), expected, "{} {}", s, bo);

            let mut r = Reader::new(&expected, bo);
            assert_eq!(ObjectId::decode(&mut r).unwrap(), (v, true));
            assert!(r.is_empty());
        }
    }

    #[test]
    fn oid_prefix_out_of_byte_range() {
        // fifth sub-id does not fit the prefix byte, sent in full
        let v = oid("1.3.6.1.256.1");
        let bytes = v.to_bytes(ByteOrder::BigEndian).unwrap();
        assert_eq!(&bytes[..4], &[6, 0, 0, 0]);
        assert_eq!(bytes.len(), v.encoding_size());
        assert_eq!(ObjectId::from_bytes(&bytes, ByteOrder::BigEndian).unwrap(), v);

        // a zero prefix would read back as "no prefix"
        let v = oid("1.3.6.1.0.5");
        let bytes = v.to_bytes(ByteOrder::BigEndian).unwrap();
        assert_eq!(&bytes[..4], &[6, 0, 0, 0]);
        assert_eq!(ObjectId::from_bytes(&bytes, ByteOrder::BigEndian).unwrap(), v);
    }

    #[test]
    fn oid_reserved_byte() {
        let bytes = [1, 0, 0, 0xFF, 0, 0, 0, 1];
        assert_eq!(
            ObjectId::from_bytes(&bytes, ByteOrder::BigEndian).unwrap_err(),
            Error::ReservedNonZero { what: "ObjectId" }
        );
    }

    #[test]
    fn oid_underflow() {
        let bytes = [2, 0, 0, 0, 0, 0, 0, 1];
        assert!(ObjectId::from_bytes(&bytes, ByteOrder::BigEndian).is_err());
    }

    #[test]
    fn oid_to_bytes_len() {
        for s in ["", "1", "1.2.3", "1.3.6.1", "1.3.6.1.4", "1.3.6.1.4.1.2.3"] {
            let v = oid(s);
            assert_eq!(
                v.to_bytes(ByteOrder::LittleEndian).unwrap().len(),
                v.encoding_size()
            );
        }
    }

    #[test]
    fn oid_order() {
        assert!(oid("1.2.3") < oid("1.2.3.1"));
        assert!(oid("1.2.3.1") < oid("1.2.4"));
        assert!(oid("1.3.6.1.4.1").starts_with(&oid("1.3.6.1")));
        assert!(!oid("1.3.6").starts_with(&oid("1.3.6.1")));
    }

    #[test]
    fn oid_display() {
        assert_eq!(oid("1.3.6.1.4.1.999").to_string(), "1.3.6.1.4.1.999");
        assert_eq!(format!("{:?}", oid("1.2")), "ObjectId(1.2)");
    }
}

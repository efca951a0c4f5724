//! Octet String as defined in [Section 5.3](https://datatracker.ietf.org/doc/html/rfc2741#section-5.3)
//!
//! The same layout carries the Opaque value type, see [`Opaque`].

use std::convert::TryFrom;
use std::fmt;
use std::mem::size_of;

use crate::codec::{padding, Reader, Writer};
use crate::{ByteOrder, Error, Result};

/// Octet String as defined in [Section 5.3](https://datatracker.ietf.org/doc/html/rfc2741#section-5.3)
///
/// Octets are transported as-is, no character set is assumed.
///
/// # Examples
///
/// ```
/// # use agentx_codec::ByteOrder;
/// # use agentx_codec::encodings::OctetString;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let os = OctetString::from("abcde");
/// let bytes = os.to_bytes(ByteOrder::BigEndian)?;
/// assert_eq!(bytes, vec![0, 0, 0, 5, 0x61, 0x62, 0x63, 0x64, 0x65, 0, 0, 0]);
/// assert_eq!(OctetString::from_bytes(&bytes, ByteOrder::BigEndian)?, os);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct OctetString(pub Vec<u8>);
// length: i32
// octets: Vec(u8)
// padding

/// Opaque value: an ASN.1 encoded blob, laid out like an [`OctetString`]
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Opaque(pub Vec<u8>);

fn octets_size(octets: &[u8]) -> usize {
    size_of::<i32>() /* length */ + octets.len() + padding(octets.len())
}

fn encode_octets(w: &mut Writer<'_>, what: &str, octets: &[u8]) -> Result<()> {
    let len = i32::try_from(octets.len()).map_err(|_| Error::LengthOverflow(octets.len()))?;
    let start = w.len();

    w.trace(format_args!("appending {} size", what));
    w.put_i32(len);
    w.trace(format_args!("appending {} bytes", what));
    w.put_bytes(octets);
    w.trace_tail(octets.len());
    w.put_padding(octets.len());
    w.trace_since(what, start);

    Ok(())
}

fn decode_octets<'a>(r: &mut Reader<'a, '_>, what: &str) -> Result<&'a [u8]> {
    r.trace(format_args!("parsing {} size", what));
    let len = r.get_i32()?;
    if len < 0 {
        return Err(Error::NegativeLength(len));
    }

    // the length is the octet count *without* padding
    r.trace(format_args!("parsing {} bytes:", what));
    let octets = r.chunk(len as usize)?;
    r.get_padding(octets.len())?;

    Ok(octets)
}

impl OctetString {
    /// number of bytes the encoded form occupies, padding included
    pub fn encoding_size(&self) -> usize {
        octets_size(&self.0)
    }

    /// octets
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// true for the zero length string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// append the encoded form to `w`
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<()> {
        w.trace(format_args!("appending OctetString: {}", self));
        encode_octets(w, "OctetString", &self.0)
    }

    /// consume the encoded form from `r`
    pub fn decode(r: &mut Reader<'_, '_>) -> Result<Self> {
        r.trace(format_args!("parsing OctetString data"));
        let os = Self(decode_octets(r, "OctetString")?.to_vec());
        r.trace(format_args!("parsed OctetString: {}", os));
        Ok(os)
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

impl From<&str> for OctetString {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for OctetString {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<Vec<u8>> for OctetString {
    fn from(b: Vec<u8>) -> Self {
        Self(b)
    }
}

impl fmt::Display for OctetString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl Opaque {
    /// number of bytes the encoded form occupies, padding included
    pub fn encoding_size(&self) -> usize {
        octets_size(&self.0)
    }

    /// append the encoded form to `w`
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<()> {
        w.trace(format_args!("appending Opaque: {}", self));
        encode_octets(w, "Opaque", &self.0)
    }

    /// consume the encoded form from `r`
    pub fn decode(r: &mut Reader<'_, '_>) -> Result<Self> {
        r.trace(format_args!("parsing Opaque"));
        let opaque = Self(decode_octets(r, "Opaque")?.to_vec());
        r.trace(format_args!("parsed Opaque: {}", opaque));
        Ok(opaque)
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

impl From<Vec<u8>> for Opaque {
    fn from(b: Vec<u8>) -> Self {
        Self(b)
    }
}

impl fmt::Display for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors(bo: ByteOrder) -> Vec<(&'static str, Vec<u8>)> {
        let len = |n: i32| match bo {
            ByteOrder::BigEndian => n.to_be_bytes(),
            ByteOrder::LittleEndian => n.to_le_bytes(),
        };
        let with = |n: i32, rest: &[u8]| {
            let mut v = len(n).to_vec();
            v.extend_from_slice(rest);
            v
        };
        vec![
            ("", with(0, &[])),
            ("a", with(1, &[0x61, 0, 0, 0])),
            ("ab", with(2, &[0x61, 0x62, 0, 0])),
            ("abc", with(3, &[0x61, 0x62, 0x63, 0])),
            ("abcd", with(4, &[0x61, 0x62, 0x63, 0x64])),
            ("abcde", with(5, &[0x61, 0x62, 0x63, 0x64, 0x65, 0, 0, 0])),
        ]
    }

    #[test]
    fn octet_to_bytes_vectors() {
        for bo in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            for (s, expected) in vectors(bo) {
                let os = OctetString::from(s);
                assert_eq!(os.to_bytes(bo).unwrap(), expected, "{:?} in {}", s, bo);
                assert_eq!(os.encoding_size(), expected.len());
            }
        }
    }

    #[test]
    fn octet_abcde_layout() {
        let os = OctetString::from("abcde");
        assert_eq!(
            os.to_bytes(ByteOrder::BigEndian).unwrap(),
            vec![0x00, 0x00, 0x00, 0x05, 0x61, 0x62, 0x63, 0x64, 0x65, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            os.to_bytes(ByteOrder::LittleEndian).unwrap(),
            vec![0x05, 0x00, 0x00, 0x00, 0x61, 0x62, 0x63, 0x64, 0x65, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn octet_serde() {
        for bo in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            for (s, bytes) in vectors(bo) {
                let got = OctetString::from_bytes(&bytes, bo).unwrap();
                assert_eq!(got, OctetString::from(s));
            }

            // not utf-8, transported as-is
            let expected = OctetString(vec![0xFF, 0xFE, 0x00]);
            let bytes = expected.to_bytes(bo).unwrap();
            assert_eq!(OctetString::from_bytes(&bytes, bo).unwrap(), expected);
        }
    }

    #[test]
    fn octet_bad_padding() {
        let data = [0, 0, 0, 3, 0x61, 0x62, 0x63, 0x01];
        assert_eq!(
            OctetString::from_bytes(&data, ByteOrder::BigEndian).unwrap_err(),
            Error::NonZeroPadding
        );
    }

    #[test]
    fn octet_negative_length() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(
            OctetString::from_bytes(&data, ByteOrder::LittleEndian).unwrap_err(),
            Error::NegativeLength(-1)
        );
    }

    #[test]
    fn octet_underflow() {
        let data = [0, 0, 0, 8, 0x61, 0x62, 0x63, 0x64];
        assert_eq!(
            OctetString::from_bytes(&data, ByteOrder::BigEndian).unwrap_err(),
            Error::Underflow {
                needed: 8,
                available: 4
            }
        );
    }

    #[test]
    fn opaque_serde() {
        for bo in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            for n in 0..=5u8 {
                let expected = Opaque((1..=n).collect());
                let bytes = expected.to_bytes(bo).unwrap();
                assert_eq!(bytes.len(), expected.encoding_size());
                assert_eq!(bytes.len() % 4, 0);
                assert_eq!(Opaque::from_bytes(&bytes, bo).unwrap(), expected);
            }
        }
    }

    #[test]
    fn display() {
        assert_eq!(OctetString::from("public").to_string(), "public");
        assert_eq!(Opaque(vec![0x01, 0xAB]).to_string(), "[01 AB]");
    }
}

//! Error type shared by every encoding and decoding operation.

use crate::pdu::{Flags, PduTag};

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a PDU (or one of its parts) could not be encoded or decoded.
///
/// Every violation of the wire grammar is fatal to the PDU being processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Header carries a protocol version other than 1.
    #[error("invalid agentx version {0}")]
    InvalidVersion(u8),
    /// Header carries a PDU type outside 1..=18.
    #[error("unknown pdu tag {0}")]
    UnknownPduTag(u8),
    /// Header sets flags the PDU type does not allow.
    #[error("flags {flags} are not allowed for {tag} pdu")]
    FlagsNotAllowed {
        /// PDU type
        tag: PduTag,
        /// offending bits only
        flags: Flags,
    },
    /// A reserved byte is non-zero.
    #[error("non-zero reserved byte(s) in {what}")]
    ReservedNonZero {
        /// which structure holds the reserved byte
        what: &'static str,
    },
    /// Declared payload size is negative or not a multiple of 4.
    #[error("invalid payload size {0}")]
    InvalidPayloadSize(i32),
    /// An OctetString or Opaque declares a negative length.
    #[error("negative octet string length {0}")]
    NegativeLength(i32),
    /// An IpAddress declares a length other than 4.
    #[error("invalid ip address length {0}")]
    InvalidIpAddressLength(i32),
    /// A padding byte is non-zero.
    #[error("non-zero padding byte(s)")]
    NonZeroPadding,
    /// The payload params variant does not belong to the PDU type.
    #[error("payload params do not match {tag} pdu")]
    ParamsMismatch {
        /// PDU type
        tag: PduTag,
    },
    /// A Varbind carries an unknown tag or one without a value encoding.
    #[error("invalid varbind value tag {0}")]
    InvalidValueTag(i16),
    /// GetBulk non_repeaters or max_repetitions is negative.
    #[error("negative getbulk {field}: {value}")]
    NegativeGetBulkField {
        /// field name
        field: &'static str,
        /// decoded value
        value: i16,
    },
    /// Payload buffer length differs from the header's payload size.
    #[error("payload data size {actual} != declared payload size {declared}")]
    PayloadSizeMismatch {
        /// payload size from the header
        declared: i32,
        /// length of the buffer handed in
        actual: usize,
    },
    /// Bytes left over after a complete decode.
    #[error("{0} extra byte(s) not decoded")]
    TrailingBytes(usize),
    /// Input ended before the structure was complete.
    #[error("not enough data: required {needed} byte(s), {available} available")]
    Underflow {
        /// bytes required by the next field
        needed: usize,
        /// bytes left in the buffer
        available: usize,
    },
    /// Header buffer is not exactly 20 bytes.
    #[error("header data size {0} != 20")]
    HeaderSize(usize),
    /// An ObjectId has more sub-identifiers than its length byte can hold.
    #[error("object identifier with {0} sub-identifiers can not be encoded")]
    OidTooLong(usize),
    /// A length does not fit the 32 bit wire field.
    #[error("length {0} exceeds wire limits")]
    LengthOverflow(usize),
    /// Text is not a dotted object identifier.
    #[error("invalid object identifier {0:?}")]
    InvalidOid(String),
}

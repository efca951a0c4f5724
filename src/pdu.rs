//! PDU protocol definitions as defined in [Section 6](https://datatracker.ietf.org/doc/html/rfc2741#section-6)
//!
//! A PDU travels as a fixed size header followed by a payload. The receiving side
//! reads [`HEADER_SIZE`] bytes, calls [`decode_header`], reads
//! [`Pdu::payload_size`] more bytes and hands them to [`decode_payload`].
//!
//! Every PDU type has an entry in a static dispatch table (see [`PduTag`]) naming
//! the header flags it accepts, whether it carries search ranges or varbinds, and
//! the shape of its [`PayloadParams`].

use std::convert::TryFrom;
use std::fmt;
use std::mem::size_of;

use bitflags::bitflags;

use crate::codec::{Reader, Writer, DUMP_PREFIX};
use crate::encodings::{ObjectId, OctetString, SearchRange, Varbind};
use crate::hex;
use crate::trace::LogSink;
use crate::{ByteOrder, Error, Result};

/// Size of the PDU header in bytes
pub const HEADER_SIZE: usize = 20;

const VERSION: u8 = 1;

bitflags! {
    /// Header flags as defined in [Section 6.1](https://datatracker.ietf.org/doc/html/rfc2741#section-6.1)
    ///
    /// Bits 5 to 7 are reserved. Decoding keeps them so they can be reported.
    #[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
    pub struct Flags: u8 {
        /// used in Register, Unregister and Response PDUs
        const INSTANCE_REGISTRATION = 1 << 0;
        /// used in IndexAllocate and IndexDeallocate PDUs
        const NEW_INDEX = 1 << 1;
        /// used in IndexAllocate and IndexDeallocate PDUs
        const ANY_INDEX = 1 << 2;
        /// payload starts with a context OctetString
        const NON_DEFAULT_CONTEXT = 1 << 3;
        /// all multi-byte integers, header fields included, are big endian
        const NETWORK_BYTE_ORDER = 1 << 4;
    }
}

const FLAG_NAMES: [&str; 5] = [
    "InstanceRegistration",
    "NewIndex",
    "AnyIndex",
    "NonDefaultContext",
    "NetworkByteOrder",
];

impl Flags {
    /// byte order selected by [`Flags::NETWORK_BYTE_ORDER`]
    pub fn byte_order(self) -> ByteOrder {
        match self.contains(Self::NETWORK_BYTE_ORDER) {
            true => ByteOrder::BigEndian,
            false => ByteOrder::LittleEndian,
        }
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for i in 0..8 {
            let bit = 1u8 << i;
            if self.bits() & bit == 0 {
                continue;
            }
            if !first {
                f.write_str("|")?;
            }
            first = false;
            match FLAG_NAMES.get(i) {
                Some(name) => f.write_str(name)?,
                None => write!(f, "?0x{:02X}", bit)?,
            }
        }
        Ok(())
    }
}

/// PDU types
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum PduTag {
    /// Open
    Open,
    /// Close
    Close,
    /// Register
    Register,
    /// Unregister
    Unregister,
    /// Get
    Get,
    /// GetNext
    GetNext,
    /// GetBulk
    GetBulk,
    /// TestSet
    TestSet,
    /// CommitSet
    CommitSet,
    /// UndoSet
    UndoSet,
    /// CleanupSet
    CleanupSet,
    /// Notify
    Notify,
    /// Ping
    Ping,
    /// IndexAllocate
    IndexAllocate,
    /// IndexDeallocate
    IndexDeallocate,
    /// AddAgentCaps
    AddAgentCaps,
    /// RemoveAgentCaps
    RemoveAgentCaps,
    /// Response
    Response,
}

struct PduEntry {
    tag: PduTag,
    name: &'static str,
    allowed_flags: Flags,
    includes_ranges: bool,
    includes_varbinds: bool,
    params: ParamsKind,
}

const IR: u8 = Flags::INSTANCE_REGISTRATION.bits();
const NI: u8 = Flags::NEW_INDEX.bits();
const AI: u8 = Flags::ANY_INDEX.bits();
const NDC: u8 = Flags::NON_DEFAULT_CONTEXT.bits();

const fn entry(
    tag: PduTag,
    name: &'static str,
    flags: u8,
    includes_ranges: bool,
    includes_varbinds: bool,
    params: ParamsKind,
) -> PduEntry {
    PduEntry {
        tag,
        name,
        // network byte order is allowed everywhere
        allowed_flags: Flags::from_bits_retain(flags | Flags::NETWORK_BYTE_ORDER.bits()),
        includes_ranges,
        includes_varbinds,
        params,
    }
}

// indexed by tag number - 1
static PDU_TABLE: [PduEntry; 18] = [
    entry(PduTag::Open, "Open", 0, false, false, ParamsKind::Open),
    entry(PduTag::Close, "Close", 0, false, false, ParamsKind::Close),
    entry(PduTag::Register, "Register", IR | NDC, false, false, ParamsKind::Register),
    entry(PduTag::Unregister, "Unregister", IR | NDC, false, false, ParamsKind::Unregister),
    entry(PduTag::Get, "Get", NDC, true, false, ParamsKind::NoParams),
    entry(PduTag::GetNext, "GetNext", NDC, true, false, ParamsKind::NoParams),
    entry(PduTag::GetBulk, "GetBulk", NDC, true, false, ParamsKind::GetBulk),
    entry(PduTag::TestSet, "TestSet", NDC, false, true, ParamsKind::NoParams),
    entry(PduTag::CommitSet, "CommitSet", 0, false, false, ParamsKind::NoParams),
    entry(PduTag::UndoSet, "UndoSet", 0, false, false, ParamsKind::NoParams),
    entry(PduTag::CleanupSet, "CleanupSet", 0, false, false, ParamsKind::NoParams),
    entry(PduTag::Notify, "Notify", NDC, false, true, ParamsKind::NoParams),
    entry(PduTag::Ping, "Ping", NDC, false, false, ParamsKind::NoParams),
    entry(PduTag::IndexAllocate, "IndexAllocate", NI | AI | NDC, false, true, ParamsKind::NoParams),
    entry(PduTag::IndexDeallocate, "IndexDeallocate", NI | AI | NDC, false, true, ParamsKind::NoParams),
    entry(PduTag::AddAgentCaps, "AddAgentCaps", NDC, false, false, ParamsKind::AddAgentCaps),
    entry(PduTag::RemoveAgentCaps, "RemoveAgentCaps", NDC, false, false, ParamsKind::RemoveAgentCaps),
    entry(PduTag::Response, "Response", IR | NI | AI | NDC, false, true, ParamsKind::Response),
];

impl PduTag {
    /// serialize to byte
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Open => 1,
            Self::Close => 2,
            Self::Register => 3,
            Self::Unregister => 4,
            Self::Get => 5,
            Self::GetNext => 6,
            Self::GetBulk => 7,
            Self::TestSet => 8,
            Self::CommitSet => 9,
            Self::UndoSet => 10,
            Self::CleanupSet => 11,
            Self::Notify => 12,
            Self::Ping => 13,
            Self::IndexAllocate => 14,
            Self::IndexDeallocate => 15,
            Self::AddAgentCaps => 16,
            Self::RemoveAgentCaps => 17,
            Self::Response => 18,
        }
    }

    /// deserialize from byte
    pub fn from_byte(b: u8) -> Result<Self> {
        let ty = match b {
            1 => Self::Open,
            2 => Self::Close,
            3 => Self::Register,
            4 => Self::Unregister,
            5 => Self::Get,
            6 => Self::GetNext,
            7 => Self::GetBulk,
            8 => Self::TestSet,
            9 => Self::CommitSet,
            10 => Self::UndoSet,
            11 => Self::CleanupSet,
            12 => Self::Notify,
            13 => Self::Ping,
            14 => Self::IndexAllocate,
            15 => Self::IndexDeallocate,
            16 => Self::AddAgentCaps,
            17 => Self::RemoveAgentCaps,
            18 => Self::Response,
            _ => return Err(Error::UnknownPduTag(b)),
        };

        Ok(ty)
    }

    fn entry(self) -> &'static PduEntry {
        let e = &PDU_TABLE[usize::from(self.to_byte()) - 1];
        debug_assert_eq!(e.tag, self);
        e
    }

    /// PDU type name
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// header flags this PDU type accepts, [`Flags::NETWORK_BYTE_ORDER`] included
    pub fn allowed_flags(self) -> Flags {
        self.entry().allowed_flags
    }

    /// the subset of `flags` this PDU type does not accept
    pub fn not_allowed_flags(self, flags: Flags) -> Flags {
        flags.difference(self.allowed_flags())
    }

    /// whether the payload carries search ranges
    pub fn includes_ranges(self) -> bool {
        self.entry().includes_ranges
    }

    /// whether the payload carries varbinds
    pub fn includes_varbinds(self) -> bool {
        self.entry().includes_varbinds
    }

    /// shape of the payload params
    pub fn params_kind(self) -> ParamsKind {
        self.entry().params
    }
}

impl fmt::Display for PduTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reason of a Close PDU as defined in [Section 6.2.2](https://datatracker.ietf.org/doc/html/rfc2741#section-6.2.2)
///
/// [`CloseReason::Unknown`] is reserved for bytes without a named variant, which is
/// what [`CloseReason::from_byte`] produces. An `Unknown` built from a named code is
/// sent as that code and decodes as the named variant.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub enum CloseReason {
    /// none of the following reasons
    #[default]
    Other,
    /// too many AgentX parse errors from peer
    ParseError,
    /// too many AgentX protocol errors from peer
    ProtocolError,
    /// too many timeouts waiting for peer
    Timeouts,
    /// sending entity is shutting down
    Shutdown,
    /// due to Set operation; this reason code can be used only by the master agent, in response to an SNMP management request.
    ByManager,
    /// a value outside 1..=6, see the type level docs
    Unknown(u8),
}

impl CloseReason {
    /// serialize to byte
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Other => 1,
            Self::ParseError => 2,
            Self::ProtocolError => 3,
            Self::Timeouts => 4,
            Self::Shutdown => 5,
            Self::ByManager => 6,
            Self::Unknown(b) => b,
        }
    }

    /// deserialize from byte
    pub fn from_byte(b: u8) -> Self {
        match b {
            1 => Self::Other,
            2 => Self::ParseError,
            3 => Self::ProtocolError,
            4 => Self::Timeouts,
            5 => Self::Shutdown,
            6 => Self::ByManager,
            _ => Self::Unknown(b),
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other => f.write_str("Other"),
            Self::ParseError => f.write_str("ParseError"),
            Self::ProtocolError => f.write_str("ProtocolError"),
            Self::Timeouts => f.write_str("Timeouts"),
            Self::Shutdown => f.write_str("Shutdown"),
            Self::ByManager => f.write_str("ByManager"),
            Self::Unknown(b) => write!(f, "?{}", b),
        }
    }
}

/// Error status of a Response PDU as defined in [Section 6.2.16](https://datatracker.ietf.org/doc/html/rfc2741#section-6.2.16)
///
/// Responses to administrative PDUs use the AgentX specific codes, responses to
/// SNMP request processing PDUs may also carry the SNMPv2 codes.
///
/// [`PduError::Unknown`] is reserved for codes without a named variant, which is
/// what [`PduError::from_u16`] produces. An `Unknown` built from a named code is
/// sent as that code and decodes as the named variant.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub enum PduError {
    /// noError(0)
    #[default]
    NoError,
    /// tooBig(1)
    TooBig,
    /// noSuchName(2)
    NoSuchName,
    /// badValue(3)
    BadValue,
    /// readOnly(4)
    ReadOnly,
    /// genErr(5)
    GenError,
    /// noAccess(6)
    NoAccess,
    /// wrongType(7)
    WrongType,
    /// wrongLength(8)
    WrongLength,
    /// wrongEncoding(9)
    WrongEncoding,
    /// wrongValue(10)
    WrongValue,
    /// noCreation(11)
    NoCreation,
    /// inconsistentValue(12)
    InconsistentValue,
    /// resourceUnavailable(13)
    ResourceUnavailable,
    /// commitFailed(14)
    CommitFailed,
    /// undoFailed(15)
    UndoFailed,
    /// authorizationError(16)
    AuthorizationError,
    /// notWritable(17)
    NotWritable,
    /// inconsistentName(18)
    InconsistentName,
    /// openFailed(256)
    OpenFailed,
    /// notOpen(257)
    NotOpen,
    /// indexWrongType(258)
    IndexWrongType,
    /// indexAlreadyAllocated(259)
    IndexAlreadyAllocated,
    /// indexNoneAvailable(260)
    IndexNoneAvailable,
    /// indexNotAllocated(261)
    IndexNotAllocated,
    /// unsupportedContext(262)
    UnsupportedContext,
    /// duplicateRegistration(263)
    DuplicateRegistration,
    /// unknownRegistration(264)
    UnknownRegistration,
    /// unknownAgentCaps(265)
    UnknownAgentCaps,
    /// parseError(266)
    ParseError,
    /// requestDenied(267)
    RequestDenied,
    /// processingError(268)
    ProcessingError,
    /// a code without a named variant, see the type level docs
    Unknown(u16),
}

const PDU_ERRORS: [(PduError, u16, &str); 32] = [
    (PduError::NoError, 0, "NoError"),
    (PduError::TooBig, 1, "TooBig"),
    (PduError::NoSuchName, 2, "NoSuchName"),
    (PduError::BadValue, 3, "BadValue"),
    (PduError::ReadOnly, 4, "ReadOnly"),
    (PduError::GenError, 5, "GenError"),
    (PduError::NoAccess, 6, "NoAccess"),
    (PduError::WrongType, 7, "WrongType"),
    (PduError::WrongLength, 8, "WrongLength"),
    (PduError::WrongEncoding, 9, "WrongEncoding"),
    (PduError::WrongValue, 10, "WrongValue"),
    (PduError::NoCreation, 11, "NoCreation"),
    (PduError::InconsistentValue, 12, "InconsistentValue"),
    (PduError::ResourceUnavailable, 13, "ResourceUnavailable"),
    (PduError::CommitFailed, 14, "CommitFailed"),
    (PduError::UndoFailed, 15, "UndoFailed"),
    (PduError::AuthorizationError, 16, "AuthorizationError"),
    (PduError::NotWritable, 17, "NotWritable"),
    (PduError::InconsistentName, 18, "InconsistentName"),
    (PduError::OpenFailed, 256, "OpenFailed"),
    (PduError::NotOpen, 257, "NotOpen"),
    (PduError::IndexWrongType, 258, "IndexWrongType"),
    (PduError::IndexAlreadyAllocated, 259, "IndexAlreadyAllocated"),
    (PduError::IndexNoneAvailable, 260, "IndexNoneAvailable"),
    (PduError::IndexNotAllocated, 261, "IndexNotAllocated"),
    (PduError::UnsupportedContext, 262, "UnsupportedContext"),
    (PduError::DuplicateRegistration, 263, "DuplicateRegistration"),
    (PduError::UnknownRegistration, 264, "UnknownRegistration"),
    (PduError::UnknownAgentCaps, 265, "UnknownAgentCaps"),
    (PduError::ParseError, 266, "ParseError"),
    (PduError::RequestDenied, 267, "RequestDenied"),
    (PduError::ProcessingError, 268, "ProcessingError"),
];

impl PduError {
    /// error code
    pub fn to_u16(self) -> u16 {
        if let Self::Unknown(code) = self {
            return code;
        }
        PDU_ERRORS
            .iter()
            .find(|(e, _, _)| *e == self)
            .map_or(0, |(_, code, _)| *code)
    }

    /// error for a code
    pub fn from_u16(code: u16) -> Self {
        PDU_ERRORS
            .iter()
            .find(|(_, c, _)| *c == code)
            .map_or(Self::Unknown(code), |(e, _, _)| *e)
    }
}

impl fmt::Display for PduError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match PDU_ERRORS.iter().find(|(e, _, _)| e == self) {
            Some((_, _, name)) => f.write_str(name),
            None => write!(f, "?{}", self.to_u16()),
        }
    }
}

/// Discriminant of [`PayloadParams`], as listed in the dispatch table
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ParamsKind {
    /// [`PayloadParams::NoParams`]
    NoParams,
    /// [`PayloadParams::Open`]
    Open,
    /// [`PayloadParams::Close`]
    Close,
    /// [`PayloadParams::Register`]
    Register,
    /// [`PayloadParams::Unregister`]
    Unregister,
    /// [`PayloadParams::GetBulk`]
    GetBulk,
    /// [`PayloadParams::AddAgentCaps`]
    AddAgentCaps,
    /// [`PayloadParams::RemoveAgentCaps`]
    RemoveAgentCaps,
    /// [`PayloadParams::Response`]
    Response,
}

/// Open PDU fields as defined in [Section 6.2.1](https://datatracker.ietf.org/doc/html/rfc2741#section-6.2.1)
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct OpenParams {
    /// seconds the master agent should wait for a subagent response, 0 for its default
    pub timeout: u8,
    /// subagent identifier, may be null
    pub oid: ObjectId,
    /// subagent description
    pub description: OctetString,
}

/// Close PDU fields as defined in [Section 6.2.2](https://datatracker.ietf.org/doc/html/rfc2741#section-6.2.2)
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct CloseParams {
    /// why the session is closed
    pub reason: CloseReason,
}

/// Register PDU fields as defined in [Section 6.2.3](https://datatracker.ietf.org/doc/html/rfc2741#section-6.2.3)
///
/// `upper_bound` is only sent if `range_subid` is non-zero, otherwise it is ignored on encode and 0 after decode.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct RegisterParams {
    /// timeout for the registered region, 0 for the session default
    pub timeout: u8,
    /// registration priority, lower is better
    pub priority: u8,
    /// index of the sub-identifier in `subtree` replaced by a range
    pub range_subid: u8,
    /// registered region
    pub subtree: ObjectId,
    /// upper bound of the range sub-identifier
    pub upper_bound: u32,
}

/// Unregister PDU fields as defined in [Section 6.2.4](https://datatracker.ietf.org/doc/html/rfc2741#section-6.2.4)
///
/// `upper_bound` follows the same rule as in [`RegisterParams`].
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct UnregisterParams {
    /// priority used at registration
    pub priority: u8,
    /// index of the sub-identifier in `subtree` replaced by a range
    pub range_subid: u8,
    /// registered region
    pub subtree: ObjectId,
    /// upper bound of the range sub-identifier
    pub upper_bound: u32,
}

/// GetBulk PDU fields as defined in [Section 6.2.7](https://datatracker.ietf.org/doc/html/rfc2741#section-6.2.7)
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct GetBulkParams {
    /// number of leading ranges without repetitions
    pub non_repeaters: i16,
    /// maximum repetitions for the remaining ranges
    pub max_repetitions: i16,
}

/// AddAgentCaps PDU fields as defined in [Section 6.2.14](https://datatracker.ietf.org/doc/html/rfc2741#section-6.2.14)
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct AddAgentCapsParams {
    /// capabilities identifier
    pub oid: ObjectId,
    /// capabilities description
    pub description: OctetString,
}

/// RemoveAgentCaps PDU fields as defined in [Section 6.2.15](https://datatracker.ietf.org/doc/html/rfc2741#section-6.2.15)
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct RemoveAgentCapsParams {
    /// capabilities identifier
    pub oid: ObjectId,
}

/// Response PDU fields as defined in [Section 6.2.16](https://datatracker.ietf.org/doc/html/rfc2741#section-6.2.16)
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ResponseParams {
    /// sysUpTime.0 of the master agent in 100th of seconds, ignored when sent by a subagent
    pub sys_up_time: u32,
    /// error status
    pub error: PduError,
    /// 1-based index of the varbind the error refers to, 0 otherwise
    pub index: i16,
}

/// Fields between the optional context and the ranges or varbinds of a PDU
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum PayloadParams {
    /// Get, GetNext, TestSet, CommitSet, UndoSet, CleanupSet, Notify, Ping, IndexAllocate, IndexDeallocate
    #[default]
    NoParams,
    /// Open
    Open(OpenParams),
    /// Close
    Close(CloseParams),
    /// Register
    Register(RegisterParams),
    /// Unregister
    Unregister(UnregisterParams),
    /// GetBulk
    GetBulk(GetBulkParams),
    /// AddAgentCaps
    AddAgentCaps(AddAgentCapsParams),
    /// RemoveAgentCaps
    RemoveAgentCaps(RemoveAgentCapsParams),
    /// Response
    Response(ResponseParams),
}

fn upper_bound_size(range_subid: u8) -> usize {
    match range_subid {
        0 => 0,
        _ => size_of::<u32>(),
    }
}

fn check_reserved(b: &[u8], what: &'static str) -> Result<()> {
    match b.iter().all(|b| *b == 0) {
        true => Ok(()),
        false => Err(Error::ReservedNonZero { what }),
    }
}

impl PayloadParams {
    /// discriminant
    pub fn kind(&self) -> ParamsKind {
        match self {
            Self::NoParams => ParamsKind::NoParams,
            Self::Open(_) => ParamsKind::Open,
            Self::Close(_) => ParamsKind::Close,
            Self::Register(_) => ParamsKind::Register,
            Self::Unregister(_) => ParamsKind::Unregister,
            Self::GetBulk(_) => ParamsKind::GetBulk,
            Self::AddAgentCaps(_) => ParamsKind::AddAgentCaps,
            Self::RemoveAgentCaps(_) => ParamsKind::RemoveAgentCaps,
            Self::Response(_) => ParamsKind::Response,
        }
    }

    /// number of bytes the encoded form occupies
    pub fn encoding_size(&self) -> usize {
        match self {
            Self::NoParams => 0,
            Self::Open(p) => 4 + p.oid.encoding_size() + p.description.encoding_size(),
            Self::Close(_) => 4,
            Self::Register(p) => {
                4 + p.subtree.encoding_size() + upper_bound_size(p.range_subid)
            }
            Self::Unregister(p) => {
                4 + p.subtree.encoding_size() + upper_bound_size(p.range_subid)
            }
            Self::GetBulk(_) => 2 * size_of::<i16>(),
            Self::AddAgentCaps(p) => p.oid.encoding_size() + p.description.encoding_size(),
            Self::RemoveAgentCaps(p) => p.oid.encoding_size(),
            Self::Response(_) => size_of::<u32>() + 2 * size_of::<i16>(),
        }
    }

    /// append the encoded form to `w`
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<()> {
        match self {
            Self::NoParams => w.trace(format_args!("appending NoParams: nothing to append")),
            Self::Open(p) => {
                w.trace(format_args!("appending OpenParams"));
                w.trace(format_args!(
                    "appending Timeout: {}, and reserved bytes: 0, 0, 0",
                    p.timeout
                ));
                w.put_bytes(&[p.timeout, 0, 0, 0]);
                w.trace_tail(4);
                w.trace(format_args!("appending Oid"));
                p.oid.encode(w, false)?;
                w.trace(format_args!("appending Description"));
                p.description.encode(w)?;
            }
            Self::Close(p) => {
                w.trace(format_args!("appending CloseParams"));
                w.trace(format_args!(
                    "appending Reason: {}, and reserved bytes: 0, 0, 0",
                    p.reason
                ));
                w.put_bytes(&[p.reason.to_byte(), 0, 0, 0]);
                w.trace_tail(4);
            }
            Self::Register(p) => {
                w.trace(format_args!("appending RegisterParams"));
                w.trace(format_args!(
                    "appending Timeout: {}, Priority: {}, RangeSubid: {}, reserved byte: 0",
                    p.timeout, p.priority, p.range_subid
                ));
                w.put_bytes(&[p.timeout, p.priority, p.range_subid, 0]);
                w.trace_tail(4);
                w.trace(format_args!("appending Subtree"));
                p.subtree.encode(w, false)?;
                if p.range_subid != 0 {
                    w.trace(format_args!("appending UpperBound"));
                    w.put_u32(p.upper_bound);
                }
            }
            Self::Unregister(p) => {
                w.trace(format_args!("appending UnregisterParams"));
                w.trace(format_args!(
                    "appending reserved byte: 0, Priority: {}, RangeSubid: {}, reserved byte: 0",
                    p.priority, p.range_subid
                ));
                w.put_bytes(&[0, p.priority, p.range_subid, 0]);
                w.trace_tail(4);
                w.trace(format_args!("appending Subtree"));
                p.subtree.encode(w, false)?;
                if p.range_subid != 0 {
                    w.trace(format_args!("appending UpperBound"));
                    w.put_u32(p.upper_bound);
                }
            }
            Self::GetBulk(p) => {
                w.trace(format_args!("appending GetBulkParams"));
                w.trace(format_args!("appending NonRepeaters"));
                w.put_i16(p.non_repeaters);
                w.trace(format_args!("appending MaxRepetitions"));
                w.put_i16(p.max_repetitions);
            }
            Self::AddAgentCaps(p) => {
                w.trace(format_args!("appending AddAgentCapsParams"));
                w.trace(format_args!("appending Oid"));
                p.oid.encode(w, false)?;
                w.trace(format_args!("appending Description"));
                p.description.encode(w)?;
            }
            Self::RemoveAgentCaps(p) => {
                w.trace(format_args!("appending RemoveAgentCapsParams"));
                w.trace(format_args!("appending Oid"));
                p.oid.encode(w, false)?;
            }
            Self::Response(p) => {
                w.trace(format_args!("appending ResponseParams"));
                w.trace(format_args!("appending SysUpTime"));
                w.put_u32(p.sys_up_time);
                w.trace(format_args!("appending Error {}", p.error));
                // the error code is a 16 bit field, sent as is
                w.put_i16(p.error.to_u16() as i16);
                w.trace(format_args!("appending Index"));
                w.put_i16(p.index);
            }
        }
        Ok(())
    }

    /// consume params of shape `kind` from `r`
    pub fn decode(kind: ParamsKind, r: &mut Reader<'_, '_>) -> Result<Self> {
        let params = match kind {
            ParamsKind::NoParams => {
                r.trace(format_args!("parsing NoParams: nothing to parse"));
                Self::NoParams
            }
            ParamsKind::Open => {
                r.trace(format_args!("parsing OpenParams"));
                r.trace(format_args!("parsing first 4 bytes"));
                let b = r.chunk(4)?;
                check_reserved(&b[1..], "OpenParams")?;
                let timeout = b[0];
                r.trace(format_args!("parsed Timeout: {}", timeout));
                r.trace(format_args!("parsing Oid"));
                let (oid, _) = ObjectId::decode(r)?;
                r.trace(format_args!("parsing Description"));
                let description = OctetString::decode(r)?;
                Self::Open(OpenParams {
                    timeout,
                    oid,
                    description,
                })
            }
            ParamsKind::Close => {
                r.trace(format_args!("parsing CloseParams"));
                r.trace(format_args!("parsing first 4 bytes"));
                let b = r.chunk(4)?;
                check_reserved(&b[1..], "CloseParams")?;
                let reason = CloseReason::from_byte(b[0]);
                r.trace(format_args!("parsed Reason: {}", reason));
                Self::Close(CloseParams { reason })
            }
            ParamsKind::Register => {
                r.trace(format_args!("parsing RegisterParams"));
                r.trace(format_args!("parsing first 4 bytes"));
                let b = r.chunk(4)?;
                check_reserved(&b[3..], "RegisterParams")?;
                let (timeout, priority, range_subid) = (b[0], b[1], b[2]);
                r.trace(format_args!(
                    "parsed Timeout: {}, Priority: {}, RangeSubid: {}",
                    timeout, priority, range_subid
                ));
                r.trace(format_args!("parsing Subtree"));
                let (subtree, _) = ObjectId::decode(r)?;
                let upper_bound = match range_subid {
                    0 => 0,
                    _ => {
                        r.trace(format_args!("parsing UpperBound"));
                        r.get_u32()?
                    }
                };
                Self::Register(RegisterParams {
                    timeout,
                    priority,
                    range_subid,
                    subtree,
                    upper_bound,
                })
            }
            ParamsKind::Unregister => {
                r.trace(format_args!("parsing UnregisterParams"));
                r.trace(format_args!("parsing first 4 bytes"));
                let b = r.chunk(4)?;
                check_reserved(&[b[0], b[3]], "UnregisterParams")?;
                let (priority, range_subid) = (b[1], b[2]);
                r.trace(format_args!(
                    "parsed Priority: {}, RangeSubid: {}",
                    priority, range_subid
                ));
                r.trace(format_args!("parsing Subtree"));
                let (subtree, _) = ObjectId::decode(r)?;
                let upper_bound = match range_subid {
                    0 => 0,
                    _ => {
                        r.trace(format_args!("parsing UpperBound"));
                        r.get_u32()?
                    }
                };
                Self::Unregister(UnregisterParams {
                    priority,
                    range_subid,
                    subtree,
                    upper_bound,
                })
            }
            ParamsKind::GetBulk => {
                r.trace(format_args!("parsing GetBulkParams"));
                r.trace(format_args!("parsing NonRepeaters"));
                let non_repeaters = r.get_i16()?;
                if non_repeaters < 0 {
                    return Err(Error::NegativeGetBulkField {
                        field: "non_repeaters",
                        value: non_repeaters,
                    });
                }
                r.trace(format_args!("parsing MaxRepetitions"));
                let max_repetitions = r.get_i16()?;
                if max_repetitions < 0 {
                    return Err(Error::NegativeGetBulkField {
                        field: "max_repetitions",
                        value: max_repetitions,
                    });
                }
                Self::GetBulk(GetBulkParams {
                    non_repeaters,
                    max_repetitions,
                })
            }
            ParamsKind::AddAgentCaps => {
                r.trace(format_args!("parsing AddAgentCapsParams"));
                r.trace(format_args!("parsing Oid"));
                let (oid, _) = ObjectId::decode(r)?;
                r.trace(format_args!("parsing Description"));
                let description = OctetString::decode(r)?;
                Self::AddAgentCaps(AddAgentCapsParams { oid, description })
            }
            ParamsKind::RemoveAgentCaps => {
                r.trace(format_args!("parsing RemoveAgentCapsParams"));
                r.trace(format_args!("parsing Oid"));
                let (oid, _) = ObjectId::decode(r)?;
                Self::RemoveAgentCaps(RemoveAgentCapsParams { oid })
            }
            ParamsKind::Response => {
                r.trace(format_args!("parsing ResponseParams"));
                r.trace(format_args!("parsing SysUpTime"));
                let sys_up_time = r.get_u32()?;
                r.trace(format_args!("parsing Error"));
                let error = PduError::from_u16(r.get_i16()? as u16);
                r.trace(format_args!("parsed Error: {}", error));
                r.trace(format_args!("parsing Index"));
                let index = r.get_i16()?;
                Self::Response(ResponseParams {
                    sys_up_time,
                    error,
                    index,
                })
            }
        };
        Ok(params)
    }
}

impl fmt::Display for PayloadParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoParams => write!(f, "NoParams"),
            Self::Open(p) => write!(
                f,
                "OpenParams{{Timeout: {}, Oid: {}, Description: {}}}",
                p.timeout, p.oid, p.description
            ),
            Self::Close(p) => write!(f, "CloseParams{{Reason: {}}}", p.reason),
            Self::Register(p) => write!(
                f,
                "RegisterParams{{Timeout: {}, Priority: {}, RangeSubid: {}, Subtree: {}, UpperBound: {}}}",
                p.timeout, p.priority, p.range_subid, p.subtree, p.upper_bound
            ),
            Self::Unregister(p) => write!(
                f,
                "UnregisterParams{{Priority: {}, RangeSubid: {}, Subtree: {}, UpperBound: {}}}",
                p.priority, p.range_subid, p.subtree, p.upper_bound
            ),
            Self::GetBulk(p) => write!(
                f,
                "GetBulkParams{{NonRepeaters: {}, MaxRepetitions: {}}}",
                p.non_repeaters, p.max_repetitions
            ),
            Self::AddAgentCaps(p) => write!(
                f,
                "AddAgentCapsParams{{Oid: {}, Description: {}}}",
                p.oid, p.description
            ),
            Self::RemoveAgentCaps(p) => write!(f, "RemoveAgentCapsParams{{Oid: {}}}", p.oid),
            Self::Response(p) => write!(
                f,
                "ResponseParams{{SysUpTime: {}, Error: {}, Index: {}}}",
                p.sys_up_time, p.error, p.index
            ),
        }
    }
}

/// AgentX PDU: header fields plus payload
///
/// `payload_size` is filled by [`decode_header`]; [`encode`] computes the size
/// itself and ignores the field. `context` is sent if and only if
/// [`Flags::NON_DEFAULT_CONTEXT`] is set, `ranges` and `varbinds` only for the
/// PDU types whose dispatch entry includes them.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Pdu {
    /// PDU type
    pub tag: PduTag,
    /// header flags
    pub flags: Flags,
    /// session ID
    pub session_id: u32,
    /// transaction ID
    pub transaction_id: u32,
    /// packet ID
    pub packet_id: u32,
    /// payload length in bytes excluding the fixed size header. Always 0 or a multiple of 4.
    pub payload_size: i32,
    /// non-default context
    pub context: OctetString,
    /// type specific fields
    pub params: PayloadParams,
    /// search ranges of Get, GetNext and GetBulk
    pub ranges: Vec<SearchRange>,
    /// varbinds of TestSet, Notify, IndexAllocate, IndexDeallocate and Response
    pub varbinds: Vec<Varbind>,
}

impl Pdu {
    /// create a PDU with zeroed header fields and an empty payload
    pub fn new(tag: PduTag, params: PayloadParams) -> Self {
        Self {
            tag,
            flags: Flags::empty(),
            session_id: 0,
            transaction_id: 0,
            packet_id: 0,
            payload_size: 0,
            context: OctetString::default(),
            params,
            ranges: Vec::new(),
            varbinds: Vec::new(),
        }
    }

    /// create a Response PDU for `request`. This copies `session_id`, `transaction_id`, `packet_id` and the byte order of the request.
    ///
    /// # Examples
    ///
    /// ```
    /// # use agentx_codec::pdu::{Flags, Pdu, PayloadParams, PduTag};
    /// let mut get = Pdu::new(PduTag::Get, PayloadParams::NoParams);
    /// get.flags = Flags::NETWORK_BYTE_ORDER | Flags::NON_DEFAULT_CONTEXT;
    /// get.packet_id = 101;
    ///
    /// let response = Pdu::response_to(&get);
    /// assert_eq!(response.tag, PduTag::Response);
    /// assert_eq!(response.packet_id, 101);
    /// assert_eq!(response.flags, Flags::NETWORK_BYTE_ORDER);
    /// ```
    pub fn response_to(request: &Pdu) -> Self {
        let mut response = Self::new(
            PduTag::Response,
            PayloadParams::Response(ResponseParams::default()),
        );
        response.flags = request.flags & Flags::NETWORK_BYTE_ORDER;
        response.session_id = request.session_id;
        response.transaction_id = request.transaction_id;
        response.packet_id = request.packet_id;

        response
    }

    /// byte order of header and payload
    pub fn byte_order(&self) -> ByteOrder {
        self.flags.byte_order()
    }

    /// number of payload bytes [`encode`] produces
    pub fn payload_encoding_size(&self) -> usize {
        let mut size = 0;
        if self.flags.contains(Flags::NON_DEFAULT_CONTEXT) {
            size += self.context.encoding_size();
        }
        size += self.params.encoding_size();
        if self.tag.includes_ranges() {
            size += self.ranges.iter().map(SearchRange::encoding_size).sum::<usize>();
        }
        if self.tag.includes_varbinds() {
            size += self.varbinds.iter().map(Varbind::encoding_size).sum::<usize>();
        }
        size
    }

    /// serialize to bytes, see [`encode`]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// deserialize one complete PDU, header and payload
    pub fn from_bytes(b: &[u8]) -> Result<Self> {
        if b.len() < HEADER_SIZE {
            return Err(Error::Underflow {
                needed: HEADER_SIZE,
                available: b.len(),
            });
        }
        let (header, payload) = b.split_at(HEADER_SIZE);
        let mut pdu = decode_header(header)?;
        decode_payload(&mut pdu, payload)?;
        Ok(pdu)
    }
}

struct DisplayList<'a, T>(&'a [T]);

impl<T: fmt::Display> fmt::Display for DisplayList<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for Pdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    Tag: {}", self.tag)?;
        writeln!(f, "    Flags: {}", self.flags)?;
        writeln!(f, "    SessionId: {}", self.session_id)?;
        writeln!(f, "    TransactionId: {}", self.transaction_id)?;
        writeln!(f, "    PacketId: {}", self.packet_id)?;
        writeln!(f, "    PayloadSize: {}", self.payload_size)?;
        writeln!(f, "    Context: {}", self.context)?;
        writeln!(f, "    Params: {}", self.params)?;
        writeln!(f, "    Ranges: {}", DisplayList(&self.ranges))?;
        write!(f, "    Varbinds: {}", DisplayList(&self.varbinds))
    }
}

fn write_pdu(pdu: &Pdu, w: &mut Writer<'_>) -> Result<()> {
    let tag = pdu.tag;
    if pdu.params.kind() != tag.params_kind() {
        return Err(Error::ParamsMismatch { tag });
    }

    let payload_size = pdu.payload_encoding_size();
    let declared =
        i32::try_from(payload_size).map_err(|_| Error::LengthOverflow(payload_size))?;
    w.trace(format_args!("counted payload size: {}", payload_size));
    w.reserve(HEADER_SIZE + payload_size);
    let bo = w.byte_order();
    w.trace(format_args!("using {}", bo));

    w.trace(format_args!(
        "appending Version: {}, Tag: {}, Flags: {}, reserved byte: 0",
        VERSION, tag, pdu.flags
    ));
    w.put_bytes(&[VERSION, tag.to_byte(), pdu.flags.bits(), 0]);
    w.trace_tail(4);

    w.trace(format_args!("appending SessionId"));
    w.put_u32(pdu.session_id);
    w.trace(format_args!("appending TransactionId"));
    w.put_u32(pdu.transaction_id);
    w.trace(format_args!("appending PacketId"));
    w.put_u32(pdu.packet_id);
    w.trace(format_args!("appending PayloadSize"));
    w.put_i32(declared);

    if pdu.flags.contains(Flags::NON_DEFAULT_CONTEXT) {
        w.trace(format_args!("appending Context"));
        pdu.context.encode(w)?;
    }

    pdu.params.encode(w)?;

    if tag.includes_ranges() {
        for r in &pdu.ranges {
            r.encode(w)?;
        }
    }
    if tag.includes_varbinds() {
        for vb in &pdu.varbinds {
            vb.encode(w)?;
        }
    }

    Ok(())
}

fn encode_with(pdu: &Pdu, mut w: Writer<'_>) -> Result<Vec<u8>> {
    match write_pdu(pdu, &mut w) {
        Ok(()) => {
            w.trace_dump("encoded pdu data");
            Ok(w.into_bytes())
        }
        Err(e) => {
            w.trace(format_args!("!!! Error. {}", e));
            w.trace(format_args!("!!! Failed to encode pdu."));
            tracing::debug!(
                target: "agentx_codec",
                tag = %pdu.tag,
                error = %e,
                "pdu encoding failed"
            );
            Err(e)
        }
    }
}

/// Encode `pdu`, header and payload. The returned bytes are ready to be sent.
///
/// Fails if the params do not match the PDU type or if a value can not be
/// represented on the wire. Call [`encode_traced`] for a detailed account.
pub fn encode(pdu: &Pdu) -> Result<Vec<u8>> {
    encode_with(pdu, Writer::new(pdu.byte_order(), 0))
}

/// Same as [`encode`], narrating every step to `log`.
pub fn encode_traced(pdu: &Pdu, log: &mut dyn LogSink) -> Result<Vec<u8>> {
    log.writef(format_args!("encoding pdu\n{}", pdu));
    encode_with(pdu, Writer::traced(pdu.byte_order(), 0, log))
}

fn read_header(r: &mut Reader<'_, '_>) -> Result<Pdu> {
    if r.remaining() != HEADER_SIZE {
        return Err(Error::HeaderSize(r.remaining()));
    }

    r.trace(format_args!("parsing first 4 bytes"));
    let b = r.chunk(4)?;
    let (version, raw_tag, flags, reserved) = (b[0], b[1], Flags::from_bits_retain(b[2]), b[3]);
    r.trace(format_args!(
        "parsed agentx version: {}, pdu.Tag: {}, pdu.Flags: {}",
        version, raw_tag, flags
    ));
    if version != VERSION {
        return Err(Error::InvalidVersion(version));
    }
    let tag = PduTag::from_byte(raw_tag)?;
    let not_allowed = tag.not_allowed_flags(flags);
    if !not_allowed.is_empty() {
        return Err(Error::FlagsNotAllowed {
            tag,
            flags: not_allowed,
        });
    }
    if reserved != 0 {
        return Err(Error::ReservedNonZero { what: "pdu header" });
    }

    let bo = flags.byte_order();
    r.set_byte_order(bo);
    r.trace(format_args!("using {}", bo));

    r.trace(format_args!("parsing pdu.SessionId"));
    let session_id = r.get_u32()?;
    r.trace(format_args!("parsing pdu.TransactionId"));
    let transaction_id = r.get_u32()?;
    r.trace(format_args!("parsing pdu.PacketId"));
    let packet_id = r.get_u32()?;
    r.trace(format_args!("parsing pdu.PayloadSize"));
    let payload_size = r.get_i32()?;
    if payload_size < 0 || payload_size % 4 != 0 {
        return Err(Error::InvalidPayloadSize(payload_size));
    }
    r.finish()?;

    let mut pdu = Pdu::new(tag, PayloadParams::NoParams);
    pdu.flags = flags;
    pdu.session_id = session_id;
    pdu.transaction_id = transaction_id;
    pdu.packet_id = packet_id;
    pdu.payload_size = payload_size;
    Ok(pdu)
}

fn decode_header_with(data: &[u8], mut r: Reader<'_, '_>) -> Result<Pdu> {
    r.trace(format_args!(
        "decoding pdu header data:\n{}",
        hex::Dump::new(DUMP_PREFIX, data)
    ));
    read_header(&mut r).map_err(|e| {
        r.trace(format_args!("!!! Error. {}", e));
        r.trace(format_args!("!!! Failed to decode pdu header."));
        tracing::debug!(target: "agentx_codec", error = %e, "pdu header rejected");
        e
    })
}

/// Decode the [`HEADER_SIZE`] bytes of a PDU header.
///
/// The returned PDU carries the header fields; its payload is empty and
/// `params` is [`PayloadParams::NoParams`] until [`decode_payload`] fills them.
pub fn decode_header(data: &[u8]) -> Result<Pdu> {
    decode_header_with(data, Reader::new(data, ByteOrder::LittleEndian))
}

/// Same as [`decode_header`], narrating every step to `log`.
pub fn decode_header_traced(data: &[u8], log: &mut dyn LogSink) -> Result<Pdu> {
    decode_header_with(data, Reader::traced(data, ByteOrder::LittleEndian, log))
}

struct Payload {
    context: OctetString,
    params: PayloadParams,
    ranges: Vec<SearchRange>,
    varbinds: Vec<Varbind>,
}

fn read_payload(pdu: &Pdu, r: &mut Reader<'_, '_>) -> Result<Payload> {
    let actual = r.remaining();
    if usize::try_from(pdu.payload_size).ok() != Some(actual) {
        return Err(Error::PayloadSizeMismatch {
            declared: pdu.payload_size,
            actual,
        });
    }
    let bo = r.byte_order();
    r.trace(format_args!("using {}", bo));

    let mut payload = Payload {
        context: OctetString::default(),
        params: PayloadParams::NoParams,
        ranges: Vec::new(),
        varbinds: Vec::new(),
    };

    if pdu.flags.contains(Flags::NON_DEFAULT_CONTEXT) {
        r.trace(format_args!("parsing Context"));
        payload.context = OctetString::decode(r)?;
    }

    payload.params = PayloadParams::decode(pdu.tag.params_kind(), r)?;

    if pdu.tag.includes_ranges() {
        while !r.is_empty() {
            payload.ranges.push(SearchRange::decode(r)?);
        }
    }
    if pdu.tag.includes_varbinds() {
        while !r.is_empty() {
            payload.varbinds.push(Varbind::decode(r)?);
        }
    }

    r.finish()?;
    Ok(payload)
}

fn decode_payload_with(pdu: &mut Pdu, data: &[u8], mut r: Reader<'_, '_>) -> Result<()> {
    r.trace(format_args!(
        "decoding pdu payload data:\n{}",
        hex::Dump::new(DUMP_PREFIX, data)
    ));
    match read_payload(pdu, &mut r) {
        Ok(payload) => {
            pdu.context = payload.context;
            pdu.params = payload.params;
            pdu.ranges = payload.ranges;
            pdu.varbinds = payload.varbinds;
            Ok(())
        }
        Err(e) => {
            r.trace(format_args!("!!! Error. {}", e));
            r.trace(format_args!("!!! Failed to decode pdu payload."));
            tracing::debug!(
                target: "agentx_codec",
                tag = %pdu.tag,
                error = %e,
                "pdu payload rejected"
            );
            Err(e)
        }
    }
}

/// Decode the payload of `pdu`, whose header came from [`decode_header`].
///
/// `data` must hold exactly `pdu.payload_size` bytes. On failure `pdu` is left unchanged.
pub fn decode_payload(pdu: &mut Pdu, data: &[u8]) -> Result<()> {
    let r = Reader::new(data, pdu.byte_order());
    decode_payload_with(pdu, data, r)
}

/// Same as [`decode_payload`], narrating every step to `log`.
pub fn decode_payload_traced(pdu: &mut Pdu, data: &[u8], log: &mut dyn LogSink) -> Result<()> {
    let r = Reader::traced(data, pdu.byte_order(), log);
    decode_payload_with(pdu, data, r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encodings::Value;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn oid(s: &str) -> ObjectId {
        ObjectId::from_str(s).unwrap()
    }

    fn get_request() -> Pdu {
        let mut pdu = Pdu::new(PduTag::Get, PayloadParams::NoParams);
        pdu.flags = Flags::NETWORK_BYTE_ORDER;
        pdu.session_id = 7;
        pdu.packet_id = 101;
        pdu.ranges
            .push(SearchRange::new(oid("1.3.6.1.4.1.999.1.0"), ObjectId::default()));
        pdu
    }

    // encode, decode both parts, compare with the input
    fn roundtrip(pdu: &Pdu) {
        let bytes = encode(pdu).unwrap();
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(bytes.len(), HEADER_SIZE + pdu.payload_encoding_size());

        let mut got = decode_header(&bytes[..HEADER_SIZE]).unwrap();
        assert_eq!(got.payload_size as usize, bytes.len() - HEADER_SIZE);
        decode_payload(&mut got, &bytes[HEADER_SIZE..]).unwrap();

        let mut expected = pdu.clone();
        expected.payload_size = got.payload_size;
        assert_eq!(got, expected);
    }

    fn header(tag: u8, flags: u8, payload_size: i32) -> Vec<u8> {
        let mut b = vec![1, tag, flags, 0];
        b.extend([0; 12]);
        b.extend(payload_size.to_le_bytes());
        b
    }

    #[test]
    fn get_request_layout() {
        let expected = vec![
            /* header */
            1, 5, 0x10, 0, /* version, tag, flags, reserved */
            0, 0, 0, 7, /* session */
            0, 0, 0, 0, /* transaction */
            0, 0, 0, 101, /* packet */
            0, 0, 0, 24, /* payload size */
            /* payload */
            4, 4, 0, 0, /* start oid, prefix 4 */
            0, 0, 0, 1, /* 1 */
            0, 0, 0x03, 0xE7, /* 999 */
            0, 0, 0, 1, /* 1 */
            0, 0, 0, 0, /* 0 */
            0, 0, 0, 0, /* null end oid */
        ];
        let got = encode(&get_request()).unwrap();
        assert_eq!(got, expected, "\n{}", hex::dump_diff(&got, &expected));
    }

    #[test]
    fn get_request_roundtrip() {
        roundtrip(&get_request());

        let mut le = get_request();
        le.flags = Flags::empty();
        roundtrip(&le);
    }

    #[test]
    fn header_reserved_byte() {
        let mut bytes = encode(&get_request()).unwrap();
        bytes[3] = 0xFF;
        assert_eq!(
            decode_header(&bytes[..HEADER_SIZE]).unwrap_err(),
            Error::ReservedNonZero { what: "pdu header" }
        );
    }

    #[test]
    fn damaged_payload_leaves_pdu_untouched() {
        let mut bytes = encode(&get_request()).unwrap();
        // reserved byte of the starting ObjectId
        bytes[23] = 0xFF;

        let mut pdu = decode_header(&bytes[..HEADER_SIZE]).unwrap();
        let before = pdu.clone();
        assert_eq!(
            decode_payload(&mut pdu, &bytes[HEADER_SIZE..]).unwrap_err(),
            Error::ReservedNonZero { what: "ObjectId" }
        );
        assert_eq!(pdu, before);
    }

    #[test]
    fn header_checks() {
        assert_eq!(
            decode_header(&header(1, 0x08, 0)).unwrap_err(),
            Error::FlagsNotAllowed {
                tag: PduTag::Open,
                flags: Flags::NON_DEFAULT_CONTEXT
            }
        );
        assert_eq!(
            decode_header(&header(5, 0x20, 0)).unwrap_err(),
            Error::FlagsNotAllowed {
                tag: PduTag::Get,
                flags: Flags::from_bits_retain(0x20)
            }
        );
        assert_eq!(
            decode_header(&header(0, 0, 0)).unwrap_err(),
            Error::UnknownPduTag(0)
        );
        assert_eq!(
            decode_header(&header(19, 0, 0)).unwrap_err(),
            Error::UnknownPduTag(19)
        );
        assert_eq!(
            decode_header(&header(5, 0, 6)).unwrap_err(),
            Error::InvalidPayloadSize(6)
        );
        assert_eq!(
            decode_header(&header(5, 0, -4)).unwrap_err(),
            Error::InvalidPayloadSize(-4)
        );

        let mut b = header(5, 0, 0);
        b[0] = 2;
        assert_eq!(decode_header(&b).unwrap_err(), Error::InvalidVersion(2));

        assert_eq!(
            decode_header(&b[..19]).unwrap_err(),
            Error::HeaderSize(19)
        );
        assert_eq!(
            decode_header(&[0; 24]).unwrap_err(),
            Error::HeaderSize(24)
        );
    }

    #[test]
    fn header_fields_little_endian() {
        let mut b = vec![1, 18, 0x01, 0];
        b.extend(1u32.to_le_bytes());
        b.extend(2u32.to_le_bytes());
        b.extend(3u32.to_le_bytes());
        b.extend(8i32.to_le_bytes());

        let pdu = decode_header(&b).unwrap();
        assert_eq!(pdu.tag, PduTag::Response);
        assert_eq!(pdu.flags, Flags::INSTANCE_REGISTRATION);
        assert_eq!(
            (pdu.session_id, pdu.transaction_id, pdu.packet_id, pdu.payload_size),
            (1, 2, 3, 8)
        );
    }

    #[test]
    fn params_mismatch() {
        let pdu = Pdu::new(PduTag::Close, PayloadParams::Open(OpenParams::default()));
        assert_eq!(
            encode(&pdu).unwrap_err(),
            Error::ParamsMismatch {
                tag: PduTag::Close
            }
        );

        let pdu = Pdu::new(PduTag::Get, PayloadParams::Close(CloseParams::default()));
        assert!(encode(&pdu).is_err());
    }

    #[test]
    fn payload_size_mismatch() {
        let bytes = encode(&get_request()).unwrap();
        let mut pdu = decode_header(&bytes[..HEADER_SIZE]).unwrap();
        assert_eq!(
            decode_payload(&mut pdu, &bytes[HEADER_SIZE..bytes.len() - 4]).unwrap_err(),
            Error::PayloadSizeMismatch {
                declared: 24,
                actual: 20
            }
        );
    }

    #[test]
    fn payload_trailing_bytes() {
        // Close declares 8 bytes but its params take only 4
        let mut bytes = header(2, 0, 8);
        bytes.extend([5, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            Pdu::from_bytes(&bytes).unwrap_err(),
            Error::TrailingBytes(4)
        );
    }

    #[test]
    fn params_roundtrip() {
        let all = vec![
            (
                PduTag::Open,
                PayloadParams::Open(OpenParams {
                    timeout: 5,
                    oid: oid("1.3.6.1.4.1.8072"),
                    description: OctetString::from("subagent"),
                }),
            ),
            (
                PduTag::Close,
                PayloadParams::Close(CloseParams {
                    reason: CloseReason::Shutdown,
                }),
            ),
            (
                PduTag::Register,
                PayloadParams::Register(RegisterParams {
                    timeout: 0,
                    priority: 127,
                    range_subid: 0,
                    subtree: oid("1.3.6.1.2.1.2.2.1.1"),
                    upper_bound: 0,
                }),
            ),
            (
                PduTag::Register,
                PayloadParams::Register(RegisterParams {
                    timeout: 3,
                    priority: 1,
                    range_subid: 10,
                    subtree: oid("1.3.6.1.2.1.2.2.1.1.1"),
                    upper_bound: 42,
                }),
            ),
            (
                PduTag::Unregister,
                PayloadParams::Unregister(UnregisterParams {
                    priority: 127,
                    range_subid: 1,
                    subtree: oid("1.3.6.1.2.1.1"),
                    upper_bound: 9,
                }),
            ),
            (
                PduTag::GetBulk,
                PayloadParams::GetBulk(GetBulkParams {
                    non_repeaters: 1,
                    max_repetitions: 10,
                }),
            ),
            (
                PduTag::AddAgentCaps,
                PayloadParams::AddAgentCaps(AddAgentCapsParams {
                    oid: oid("1.3.6.1.4.1.8072.3.2.10"),
                    description: OctetString::from("caps"),
                }),
            ),
            (
                PduTag::RemoveAgentCaps,
                PayloadParams::RemoveAgentCaps(RemoveAgentCapsParams {
                    oid: oid("1.3.6.1.4.1.8072.3.2.10"),
                }),
            ),
            (
                PduTag::Response,
                PayloadParams::Response(ResponseParams {
                    sys_up_time: 123456,
                    error: PduError::ProcessingError,
                    index: 2,
                }),
            ),
            (PduTag::Ping, PayloadParams::NoParams),
            (PduTag::CommitSet, PayloadParams::NoParams),
        ];

        for flags in [Flags::empty(), Flags::NETWORK_BYTE_ORDER] {
            for (tag, params) in &all {
                let mut w = Writer::new(flags.byte_order(), 0);
                params.encode(&mut w).unwrap();
                assert_eq!(w.len(), params.encoding_size(), "{}", params);

                let mut pdu = Pdu::new(*tag, params.clone());
                pdu.flags = flags;
                pdu.transaction_id = 0xDEADBEEF;
                roundtrip(&pdu);
            }
        }
    }

    #[test]
    fn register_layout() {
        let params = PayloadParams::Register(RegisterParams {
            timeout: 3,
            priority: 127,
            range_subid: 7,
            subtree: oid("1.3.6.1.2.1.2.2.1.1.1"),
            upper_bound: 24,
        });
        let mut w = Writer::new(ByteOrder::BigEndian, 0);
        params.encode(&mut w).unwrap();
        assert_eq!(
            w.into_bytes(),
            vec![
                3, 127, 7, 0, /* timeout, priority, range_subid, reserved */
                6, 2, 0, 0, /* subtree, prefix 2 */
                0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1,
                0, 0, 0, 24, /* upper bound */
            ]
        );
    }

    #[test]
    fn params_reserved_bytes() {
        let mut r = Reader::new(&[5, 0, 1, 0], ByteOrder::BigEndian);
        assert_eq!(
            PayloadParams::decode(ParamsKind::Close, &mut r).unwrap_err(),
            Error::ReservedNonZero {
                what: "CloseParams"
            }
        );

        let mut r = Reader::new(&[1, 127, 0, 0, 0, 0, 0, 0], ByteOrder::BigEndian);
        assert_eq!(
            PayloadParams::decode(ParamsKind::Unregister, &mut r).unwrap_err(),
            Error::ReservedNonZero {
                what: "UnregisterParams"
            }
        );

        let mut r = Reader::new(&[0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0], ByteOrder::BigEndian);
        assert_eq!(
            PayloadParams::decode(ParamsKind::Open, &mut r).unwrap_err(),
            Error::ReservedNonZero { what: "OpenParams" }
        );
    }

    #[test]
    fn getbulk_negative() {
        let mut r = Reader::new(&[0xFF, 0xFF, 0, 1], ByteOrder::BigEndian);
        assert_eq!(
            PayloadParams::decode(ParamsKind::GetBulk, &mut r).unwrap_err(),
            Error::NegativeGetBulkField {
                field: "non_repeaters",
                value: -1
            }
        );

        let mut r = Reader::new(&[0, 1, 0x80, 0], ByteOrder::BigEndian);
        assert_eq!(
            PayloadParams::decode(ParamsKind::GetBulk, &mut r).unwrap_err(),
            Error::NegativeGetBulkField {
                field: "max_repetitions",
                value: i16::MIN
            }
        );
    }

    #[test]
    fn context_roundtrip() {
        for bo_flag in [Flags::empty(), Flags::NETWORK_BYTE_ORDER] {
            let mut pdu = get_request();
            pdu.flags = bo_flag | Flags::NON_DEFAULT_CONTEXT;
            pdu.context = OctetString::from("ctx");
            roundtrip(&pdu);

            // empty context is still sent when the flag is set
            pdu.context = OctetString::default();
            let bytes = encode(&pdu).unwrap();
            assert_eq!(bytes.len(), HEADER_SIZE + 4 + 24);
            roundtrip(&pdu);
        }
    }

    #[test]
    fn context_ignored_without_flag() {
        let mut pdu = get_request();
        pdu.context = OctetString::from("ctx");
        let got = Pdu::from_bytes(&encode(&pdu).unwrap()).unwrap();
        assert!(got.context.is_empty());
    }

    #[test]
    fn response_with_varbinds() {
        let mut response = Pdu::response_to(&get_request());
        response.varbinds = vec![
            Varbind::new(oid("1.3.6.1.4.1.999.1.0"), Value::Integer32(-5)),
            Varbind::new(
                oid("1.3.6.1.4.1.999.2.0"),
                Value::IpAddress(Ipv4Addr::new(127, 0, 0, 1)),
            ),
            Varbind::new(oid("1.3.6.1.4.1.999.3.0"), Value::EndOfMibView),
        ];
        assert_eq!(response.session_id, 7);
        assert_eq!(response.packet_id, 101);
        roundtrip(&response);
    }

    #[test]
    fn index_allocate_flags() {
        let mut pdu = Pdu::new(PduTag::IndexAllocate, PayloadParams::NoParams);
        pdu.flags = Flags::ANY_INDEX | Flags::NON_DEFAULT_CONTEXT;
        pdu.context = OctetString::from("c");
        pdu.varbinds
            .push(Varbind::new(oid("1.3.6.1.2.1.4.20.1.1"), Value::Null));
        roundtrip(&pdu);
    }

    #[test]
    fn ranges_and_varbinds_follow_the_table() {
        // a Ping carries neither
        let mut pdu = Pdu::new(PduTag::Ping, PayloadParams::NoParams);
        pdu.ranges.push(SearchRange::default());
        pdu.varbinds.push(Varbind::default());
        assert_eq!(encode(&pdu).unwrap().len(), HEADER_SIZE);
    }

    #[test]
    fn dispatch_table() {
        for b in 1..=18u8 {
            let tag = PduTag::from_byte(b).unwrap();
            assert_eq!(tag.to_byte(), b);
            assert_eq!(tag.entry().tag, tag);
            assert!(tag.allowed_flags().contains(Flags::NETWORK_BYTE_ORDER));
            assert!(!(tag.includes_ranges() && tag.includes_varbinds()));
        }
        assert_eq!(PduTag::Response.allowed_flags(), Flags::all());
        assert_eq!(PduTag::Open.allowed_flags(), Flags::NETWORK_BYTE_ORDER);
        assert_eq!(
            PduTag::Register.not_allowed_flags(Flags::NEW_INDEX | Flags::INSTANCE_REGISTRATION),
            Flags::NEW_INDEX
        );
        assert_eq!(PduTag::GetBulk.params_kind(), ParamsKind::GetBulk);
        assert!(PduTag::GetNext.includes_ranges());
        assert!(PduTag::Notify.includes_varbinds());
    }

    #[test]
    fn flags_display() {
        assert_eq!(Flags::empty().to_string(), "");
        assert_eq!(
            (Flags::NON_DEFAULT_CONTEXT | Flags::NETWORK_BYTE_ORDER).to_string(),
            "NonDefaultContext|NetworkByteOrder"
        );
        assert_eq!(
            Flags::from_bits_retain(0x21).to_string(),
            "InstanceRegistration|?0x20"
        );
    }

    #[test]
    fn enum_codes() {
        for b in 0..=255u8 {
            assert_eq!(CloseReason::from_byte(b).to_byte(), b);
        }
        assert_eq!(CloseReason::from_byte(9).to_string(), "?9");
        assert_eq!(CloseReason::ByManager.to_string(), "ByManager");

        for (e, code, _) in PDU_ERRORS.iter() {
            assert_eq!(PduError::from_u16(*code), *e);
            assert_eq!(e.to_u16(), *code);
        }
        assert_eq!(PduError::from_u16(100), PduError::Unknown(100));
        assert_eq!(PduError::from_u16(100).to_string(), "?100");
        assert_eq!(PduError::NotOpen.to_string(), "NotOpen");
    }

    #[test]
    fn unknown_codes_decode_as_named() {
        assert_eq!(CloseReason::Unknown(3).to_byte(), CloseReason::ProtocolError.to_byte());
        assert_eq!(PduError::Unknown(5).to_u16(), PduError::GenError.to_u16());

        let mut close = Pdu::new(
            PduTag::Close,
            PayloadParams::Close(CloseParams {
                reason: CloseReason::Unknown(3),
            }),
        );
        let got = Pdu::from_bytes(&encode(&close).unwrap()).unwrap();
        assert_eq!(
            got.params,
            PayloadParams::Close(CloseParams {
                reason: CloseReason::ProtocolError
            })
        );

        // codes without a name keep their Unknown form
        close.params = PayloadParams::Close(CloseParams {
            reason: CloseReason::from_byte(77),
        });
        let got = Pdu::from_bytes(&encode(&close).unwrap()).unwrap();
        assert_eq!(got.params, close.params);

        let mut response = Pdu::response_to(&close);
        response.params = PayloadParams::Response(ResponseParams {
            sys_up_time: 0,
            error: PduError::Unknown(5),
            index: 1,
        });
        let got = Pdu::from_bytes(&encode(&response).unwrap()).unwrap();
        assert_eq!(
            got.params,
            PayloadParams::Response(ResponseParams {
                sys_up_time: 0,
                error: PduError::GenError,
                index: 1,
            })
        );
    }

    #[test]
    fn pdu_display() {
        let text = get_request().to_string();
        assert!(text.contains("    Tag: Get\n"));
        assert!(text.contains("    Flags: NetworkByteOrder\n"));
        assert!(text.contains(
            "    Ranges: [{StartOid: 1.3.6.1.4.1.999.1.0, EndOid: , StartIncluded: 0}]"
        ));
    }
}

//! encodings as defined in [Section 5](https://datatracker.ietf.org/doc/html/rfc2741#section-5)
//!
//! Every structure is 4 byte aligned: variable length parts are followed by zero
//! padding, which decoding rejects if non-zero.

pub mod ipaddress;
pub mod octetstring;
pub mod oid;
pub mod searchrange;
pub mod value;

#[doc(inline)]
pub use octetstring::{OctetString, Opaque};
#[doc(inline)]
pub use oid::ObjectId;
#[doc(inline)]
pub use searchrange::SearchRange;
#[doc(inline)]
pub use value::{AsnTag, Value, Varbind};

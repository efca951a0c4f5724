//! Cursors over the wire representation.
//!
//! [`Writer`] and [`Reader`] carry the byte order of the PDU being processed and,
//! for the traced entry points, a [`LogSink`] receiving a narration of every
//! primitive operation. Narration arguments are only formatted when a sink is
//! attached, so the untraced path pays for a branch and nothing else.

use std::fmt;

use crate::hex;
use crate::trace::LogSink;
use crate::{ByteOrder, Error, Result};

pub(crate) const DUMP_PREFIX: &str = "    ";

/// Number of zero bytes following `n` content bytes to reach 4 byte alignment.
pub fn padding(n: usize) -> usize {
    (4 - n % 4) % 4
}

/// Growing output buffer.
pub struct Writer<'l> {
    buf: Vec<u8>,
    bo: ByteOrder,
    log: Option<&'l mut dyn LogSink>,
}

impl<'l> Writer<'l> {
    /// create a silent writer
    pub fn new(bo: ByteOrder, capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            bo,
            log: None,
        }
    }

    /// create a writer narrating to `log`
    pub fn traced(bo: ByteOrder, capacity: usize, log: &'l mut dyn LogSink) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            bo,
            log: Some(log),
        }
    }

    /// byte order of multi-byte integers
    pub fn byte_order(&self) -> ByteOrder {
        self.bo
    }

    /// number of bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// true if nothing was written yet
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// true if a sink is attached
    pub fn is_traced(&self) -> bool {
        self.log.is_some()
    }

    /// narrate one message
    pub fn trace(&mut self, args: fmt::Arguments<'_>) {
        if let Some(log) = self.log.as_deref_mut() {
            log.writef(args);
        }
    }

    /// narrate a dump of the last `n` bytes written
    pub fn trace_tail(&mut self, n: usize) {
        if let Some(log) = self.log.as_deref_mut() {
            log.write(&hex::dump_tail(DUMP_PREFIX, &self.buf, n));
        }
    }

    /// narrate `what` followed by a dump of everything written since `start`
    pub fn trace_since(&mut self, what: &str, start: usize) {
        if let Some(log) = self.log.as_deref_mut() {
            log.writef(format_args!(
                "appended {} data:\n{}",
                what,
                hex::dump_sub(DUMP_PREFIX, &self.buf, start, self.buf.len())
            ));
        }
    }

    /// narrate `label` followed by a dump of the whole buffer
    pub fn trace_dump(&mut self, label: &str) {
        if let Some(log) = self.log.as_deref_mut() {
            log.writef(format_args!(
                "{}:\n{}",
                label,
                hex::Dump::new(DUMP_PREFIX, &self.buf)
            ));
        }
    }

    /// make room for `additional` more bytes
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    /// append raw bytes (single byte fields, octets) without narration
    pub fn put_bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    /// append an i16
    pub fn put_i16(&mut self, val: i16) {
        self.trace(format_args!("appending int16: {} 0x{:04X}", val, val));
        self.bo.append_i16(&mut self.buf, val);
        self.trace_tail(2);
    }

    /// append an i32
    pub fn put_i32(&mut self, val: i32) {
        self.trace(format_args!("appending int32: {} 0x{:08X}", val, val));
        self.bo.append_i32(&mut self.buf, val);
        self.trace_tail(4);
    }

    /// append a u32
    pub fn put_u32(&mut self, val: u32) {
        self.trace(format_args!("appending uint32: {} 0x{:08X}", val, val));
        self.bo.append_u32(&mut self.buf, val);
        self.trace_tail(4);
    }

    /// append a u64
    pub fn put_u64(&mut self, val: u64) {
        self.trace(format_args!("appending uint64: {} 0x{:016X}", val, val));
        self.bo.append_u64(&mut self.buf, val);
        self.trace_tail(8);
    }

    /// append the zero bytes aligning `content_len` bytes to 4
    pub fn put_padding(&mut self, content_len: usize) {
        let n = padding(content_len);
        if n > 0 {
            self.trace(format_args!("appending {} padding byte(s)", n));
            self.buf.extend(std::iter::repeat(0).take(n));
            self.trace_tail(n);
        }
    }

    /// the bytes written
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// consume the writer, returning its buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an input buffer.
pub struct Reader<'a, 'l> {
    data: &'a [u8],
    pos: usize,
    bo: ByteOrder,
    log: Option<&'l mut dyn LogSink>,
}

impl<'a, 'l> Reader<'a, 'l> {
    /// create a silent reader
    pub fn new(data: &'a [u8], bo: ByteOrder) -> Self {
        Self {
            data,
            pos: 0,
            bo,
            log: None,
        }
    }

    /// create a reader narrating to `log`
    pub fn traced(data: &'a [u8], bo: ByteOrder, log: &'l mut dyn LogSink) -> Self {
        Self {
            data,
            pos: 0,
            bo,
            log: Some(log),
        }
    }

    /// byte order of multi-byte integers
    pub fn byte_order(&self) -> ByteOrder {
        self.bo
    }

    /// switch byte order (the header decides it after its first 4 bytes)
    pub fn set_byte_order(&mut self, bo: ByteOrder) {
        self.bo = bo;
    }

    /// offset of the next byte to read
    pub fn position(&self) -> usize {
        self.pos
    }

    /// bytes left
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// true if every byte was consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// narrate one message
    pub fn trace(&mut self, args: fmt::Arguments<'_>) {
        if let Some(log) = self.log.as_deref_mut() {
            log.writef(args);
        }
    }

    /// consume the next `n` bytes
    ///
    /// When traced, whatever is available of the chunk is dumped before the
    /// length check, so an underflow shows the bytes that were there.
    pub fn chunk(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if let Some(log) = self.log.as_deref_mut() {
            log.write(&hex::dump_sub(
                DUMP_PREFIX,
                self.data,
                self.pos,
                self.pos + n.min(available),
            ));
        }
        if n > available {
            return Err(Error::Underflow {
                needed: n,
                available,
            });
        }
        let data: &'a [u8] = self.data;
        let chunk = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(chunk)
    }

    /// consume an i16
    pub fn get_i16(&mut self) -> Result<i16> {
        self.trace(format_args!("parsing int16 data:"));
        let (val, _) = self.bo.parse_i16(self.chunk(2)?)?;
        self.trace(format_args!("parsed int16: {}", val));
        Ok(val)
    }

    /// consume an i32
    pub fn get_i32(&mut self) -> Result<i32> {
        self.trace(format_args!("parsing int32 data:"));
        let (val, _) = self.bo.parse_i32(self.chunk(4)?)?;
        self.trace(format_args!("parsed int32: {}", val));
        Ok(val)
    }

    /// consume a u32
    pub fn get_u32(&mut self) -> Result<u32> {
        self.trace(format_args!("parsing uint32 data:"));
        let (val, _) = self.bo.parse_u32(self.chunk(4)?)?;
        self.trace(format_args!("parsed uint32: {}", val));
        Ok(val)
    }

    /// consume a u64
    pub fn get_u64(&mut self) -> Result<u64> {
        self.trace(format_args!("parsing uint64 data:"));
        let (val, _) = self.bo.parse_u64(self.chunk(8)?)?;
        self.trace(format_args!("parsed uint64: {}", val));
        Ok(val)
    }

    /// consume the padding following `content_len` bytes, all of which must be zero
    pub fn get_padding(&mut self, content_len: usize) -> Result<()> {
        let n = padding(content_len);
        if n == 0 {
            return Ok(());
        }
        self.trace(format_args!("parsing {} padding byte(s):", n));
        if self.chunk(n)?.iter().any(|b| *b != 0) {
            return Err(Error::NonZeroPadding);
        }
        Ok(())
    }

    /// require that every byte was consumed
    pub fn finish(&mut self) -> Result<()> {
        let extra = self.remaining();
        if extra == 0 {
            return Ok(());
        }
        if let Some(log) = self.log.as_deref_mut() {
            log.writef(format_args!(
                "not decoded extra bytes:\n{}",
                hex::dump_sub(DUMP_PREFIX, self.data, self.pos, self.data.len())
            ));
        }
        Err(Error::TrailingBytes(extra))
    }
}

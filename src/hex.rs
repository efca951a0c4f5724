//! Hex dumps used by the trace narration and by tests to show byte discrepancies.
//!
//! Each line holds up to four bytes behind an 8 digit offset:
//!
//! ```text
//!     00000004  04 05 06 07
//!     00000008  08 09 0A 0B
//! ```

use std::fmt;

const DIFF_FIRST: char = '\u{250C}';
const DIFF_SECOND: char = '\u{2514}';

fn push_bytes(out: &mut String, offset: usize, chunk: &[u8]) {
    out.push_str(&format!("{:08X} ", offset));
    for b in chunk {
        out.push_str(&format!(" {:02X}", b));
    }
}

/// Dump of `data[from..to]`, offsets relative to the start of `data`.
///
/// An empty range yields only the offset. A range outside `data` yields a
/// description of the bad range instead of the dump.
pub fn dump_sub(prefix: &str, data: &[u8], from: usize, to: usize) -> String {
    if from > to || to > data.len() {
        return format!(
            "{}out of range: from = {}, to = {}, len = {}",
            prefix,
            from,
            to,
            data.len()
        );
    }

    if from == to {
        return format!("{}{:08X}", prefix, from);
    }

    let mut out = String::with_capacity((1 + (to - from - 1) / 4) * (prefix.len() + 23));
    let mut offset = from;
    for chunk in data[from..to].chunks(4) {
        if offset != from {
            out.push('\n');
        }
        out.push_str(prefix);
        push_bytes(&mut out, offset, chunk);
        offset += chunk.len();
    }

    out
}

/// Dump of the last `n` bytes of `data`.
pub fn dump_tail(prefix: &str, data: &[u8], n: usize) -> String {
    match data.len().checked_sub(n) {
        Some(from) => dump_sub(prefix, data, from, data.len()),
        None => format!("{}out of range: tail {} of len {}", prefix, n, data.len()),
    }
}

/// Dump of all of `data`.
pub fn dump(prefix: &str, data: &[u8]) -> String {
    dump_sub(prefix, data, 0, data.len())
}

/// [`dump`] rendered on demand, for format arguments that are usually never formatted.
#[derive(Clone, Copy, Debug)]
pub struct Dump<'a> {
    prefix: &'a str,
    data: &'a [u8],
}

impl<'a> Dump<'a> {
    /// dump of all of `data`, every line starting with `prefix`
    pub fn new(prefix: &'a str, data: &'a [u8]) -> Self {
        Self { prefix, data }
    }
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&dump(self.prefix, self.data))
    }
}

/// Compare two byte sequences chunk by chunk.
///
/// Returns an empty string if both are equal. Otherwise every 4 byte chunk is
/// listed; chunks that differ are shown twice, the first input marked with
/// `┌`, the second with `└`:
///
/// ```text
/// ┌00000000  00 01 02 03
/// └00000000  00 63 02 03
///  00000004  04 05 06 07
/// ┌00000008  08 09
/// └00000008
/// ```
pub fn dump_diff(first: &[u8], second: &[u8]) -> String {
    if first == second {
        return String::new();
    }

    let max = first.len().max(second.len());
    let mut lines = Vec::with_capacity(1 + max / 4);
    let chunk = |data: &[u8], i: usize| -> Vec<u8> {
        data[i.min(data.len())..(i + 4).min(data.len())].to_vec()
    };

    for i in (0..max).step_by(4) {
        let (a, b) = (chunk(first, i), chunk(second, i));
        let mut line = String::new();
        if a == b {
            line.push(' ');
            push_bytes(&mut line, i, &a);
        } else {
            line.push(DIFF_FIRST);
            push_bytes(&mut line, i, &a);
            line.push('\n');
            line.push(DIFF_SECOND);
            push_bytes(&mut line, i, &b);
        }
        lines.push(line);
    }

    lines.join("\n")
}

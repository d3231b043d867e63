//! Record reader for the BIFF8 stream inside legacy `.xls` workbooks.
//!
//! A record is a 16-bit type, a 16-bit length and its payload. Payloads longer than
//! 8224 bytes continue in `CONTINUE` records; the reader presents a record and its
//! continuations as a single sequence of chunks.

use crate::error::RustyDishError;
use crate::helpers::bytes::to_f64;
use crate::helpers::bytes::to_u16;
use crate::helpers::bytes::to_u32;
use crate::helpers::bytes::to_u64;
use crate::helpers::bytes::to_usize;
use encoding_rs::Encoding;
use thiserror::Error;

const CONTINUE: u16 = 60;

#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Fewer than {0} bytes remaining in record")]
    NoEnoughDataError(usize),
}

pub(crate) struct Biff8Reader {
    /// Decoder of two-byte strings, set from the workbook's code page
    pub(crate) encoding: &'static Encoding,
    buffer: Vec<u8>,
    /// Start of the next record header
    pointer: usize,
    /// Payload chunks of the current record as (start, end)
    chunks: Vec<(usize, usize)>,
    index: usize,
    offset: usize,
}

impl Biff8Reader {
    pub(crate) fn new(data: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            encoding: encoding_rs::UTF_16LE,
            buffer: data,
            pointer: 0,
            chunks: Vec::new(),
            index: 0,
            offset: 0,
        }
    }

    /// Moves to the next record and returns its type, `None` at the end of the stream.
    pub(crate) fn next(&mut self) -> Result<Option<u16>, RustyDishError> {
        if self.pointer + 4 > self.buffer.len() {
            return Ok(None);
        }
        self.index = 0;
        self.offset = 0;
        self.chunks.clear();

        let kind = self.get_u16_at(self.pointer)?;
        self.push_chunk()?;
        while self.pointer + 4 <= self.buffer.len() && self.get_u16_at(self.pointer)? == CONTINUE {
            self.push_chunk()?;
        }
        Ok(Some(kind))
    }

    fn push_chunk(&mut self) -> Result<(), RustyDishError> {
        let size = self.get_u16_at(self.pointer + 2)? as usize;
        let lower = self.pointer + 4;
        let upper = (lower + size).min(self.buffer.len());
        self.pointer = upper;
        self.chunks.push((lower, upper));
        Ok(())
    }

    /// Positions the reader at an absolute stream offset, such as a sheet's BOF.
    pub(crate) fn goto(&mut self, pointer: usize) {
        self.pointer = pointer;
    }

    fn read_exact(&mut self, length: usize) -> Result<&[u8], RustyDishError> {
        let (data, size) = self.read(length);
        if size == length {
            Ok(data)
        } else {
            Err(Biff8Error::NoEnoughDataError(length))?
        }
    }

    /// Reads up to `length` bytes without crossing into the next chunk.
    fn read(&mut self, length: usize) -> (&[u8], usize) {
        if let Some((lower, upper)) = self.chunks.get(self.index).copied() {
            let source = upper.min(lower + self.offset);
            let target = upper.min(source + length);
            if source < upper {
                if target == upper {
                    self.index += 1;
                    self.offset = 0;
                } else {
                    self.offset += target - source;
                }
                return (&self.buffer[source..target], target - source);
            }
        }
        (&[], 0)
    }

    pub(crate) fn skip(&mut self, length: usize) -> Result<(), RustyDishError> {
        self.read_exact(length).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, RustyDishError> {
        self.read_exact(1).map(|data| data[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, RustyDishError> {
        self.read_exact(2).map(to_u16)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, RustyDishError> {
        self.read_exact(4).map(to_u32)
    }

    pub(crate) fn read_usize(&mut self) -> Result<usize, RustyDishError> {
        self.read_exact(4).map(to_usize)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, RustyDishError> {
        self.read_exact(8).map(to_u64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, RustyDishError> {
        self.read_exact(8).map(to_f64)
    }

    /// 16-bit value ending `offset` bytes before the end of the current record.
    pub(crate) fn get_u16_back(&self, offset: usize) -> Result<u16, RustyDishError> {
        let mut offset = offset;
        for (lower, upper) in self.chunks.iter().rev() {
            if offset <= upper - lower {
                return self.get_u16_at(upper - offset);
            }
            offset -= upper - lower;
        }
        Err(Biff8Error::NoEnoughDataError(2))?
    }

    fn get_u16_at(&self, index: usize) -> Result<u16, RustyDishError> {
        match self.buffer.get(index..index + 2) {
            Some(bytes) => Ok(to_u16(bytes)),
            None => Err(Biff8Error::NoEnoughDataError(2))?,
        }
    }

    /// Decodes an RK value: a 30-bit integer or the high bits of a double,
    /// optionally multiplied by 100.
    pub(crate) fn read_rk_number(&mut self) -> Result<String, RustyDishError> {
        let value = self.read_u32()?;
        let is_percentage = (value & 0x01) != 0;
        let is_integer = (value & 0x02) != 0;
        let mut number = if is_integer {
            ((value as i32) >> 2) as f64
        } else {
            f64::from_bits(((value >> 2) as u64) << 34)
        };
        if is_percentage {
            number /= 100.0;
        }
        Ok(number.to_string())
    }

    /// String with an 8-bit character count (sheet names).
    pub(crate) fn read_short_xl_unicode_string(&mut self) -> Result<String, RustyDishError> {
        let mut string = String::new();
        let chars = self.read_u8()? as usize;
        self.read_string_into(chars, false, &mut string)?;
        Ok(string)
    }

    /// String with a 16-bit character count (labels, formats, formula results).
    pub(crate) fn read_xl_unicode_string(&mut self) -> Result<String, RustyDishError> {
        let mut string = String::new();
        let chars = self.read_u16()? as usize;
        self.read_string_into(chars, false, &mut string)?;
        Ok(string)
    }

    /// Shared string table entry. When the characters run into a `CONTINUE`
    /// record, the rest starts with a fresh option byte.
    pub(crate) fn read_xl_unicode_rich_extended_string(&mut self) -> Result<String, RustyDishError> {
        let mut string = String::new();
        let mut expected = self.read_u16()? as usize;
        let mut actual = self.read_string_into(expected, true, &mut string)?;
        while actual < expected {
            expected -= actual;
            actual = self.read_string_into(expected, false, &mut string)?;
            if actual == 0 {
                Err(Biff8Error::NoEnoughDataError(expected))?;
            }
        }
        Ok(string)
    }

    /// Appends up to `chars` characters and returns how many were read.
    fn read_string_into(&mut self, chars: usize, is_extended: bool, content: &mut String) -> Result<usize, RustyDishError> {
        let encoding = self.encoding;
        let flag = self.read_u8()?;
        let is_high_byte = (flag & 0x1) > 0;
        let rich_runs = if is_extended && (flag & 0x8) > 0 {
            self.read_u16()? as usize
        } else {
            0
        };
        let phonetic_size = if is_extended && (flag & 0x4) > 0 {
            self.read_usize()?
        } else {
            0
        };
        let expected = if is_high_byte { chars << 1 } else { chars };
        let (bytes, actual) = self.read(expected);
        if is_high_byte {
            let (string, _, _) = encoding.decode(bytes);
            content.push_str(&string);
        } else {
            // Compressed strings hold the low byte of each UTF-16 unit
            content.extend(bytes.iter().map(|byte| *byte as char));
        }
        if rich_runs > 0 || phonetic_size > 0 {
            self.skip(4 * rich_runs + phonetic_size)?;
        }
        Ok(if is_high_byte { actual >> 1 } else { actual })
    }
}

/// Loops over the records of a [`Biff8Reader`]; unmatched record types are skipped.
#[macro_export]
macro_rules! match_biff8_record {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(kind) = $reader.next()? {
            match kind {
                $($arms)*
                _ => (),
            }
        }
    };
}

use crate::error::RustyDishError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

/// Byte source of a spreadsheet: either a file on disk or an upload held in memory
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// Uploaded bytes
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a local file
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<UnifiedReader, RustyDishError> {
        let file = File::open(path)?;
        Ok(UnifiedReader::Local(BufReader::new(file)))
    }

    /// Wraps bytes already read by the caller (e.g. an uploaded file)
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }

    /// Returns true if the content starts with the compound file signature.
    /// Encrypted OOXML packages and legacy `.xls` files are compound files, not zip archives.
    pub(crate) fn is_compound_file(&mut self) -> Result<bool, RustyDishError> {
        const SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        let mut buffer = [0u8; 8];
        let position = self.stream_position()?;
        let matched = match self.read_exact(&mut buffer) {
            Ok(()) => buffer == SIGNATURE,
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => false,
            Err(error) => Err(error)?,
        };
        self.seek(std::io::SeekFrom::Start(position))?;
        Ok(matched)
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}

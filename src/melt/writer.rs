use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

/// Statements held back until an enclosing matched element has written its
/// own statement.
///
/// Bytes stay in memory up to `limit`; past that the buffer moves to an
/// anonymous temporary file and keeps appending there.
pub struct SpillBuffer {
    memory: Vec<u8>,
    file: Option<BufWriter<File>>,
    limit: usize,
    statements: u64,
}

impl SpillBuffer {
    pub fn new(limit: usize) -> Self {
        SpillBuffer {
            memory: Vec::new(),
            file: None,
            limit,
            statements: 0,
        }
    }

    /// Number of statements held
    pub fn statements(&self) -> u64 {
        self.statements
    }

    pub fn is_spilled(&self) -> bool {
        self.file.is_some()
    }

    pub fn push_statement(&mut self, statement: &str) -> io::Result<()> {
        self.write_all(statement.as_bytes())?;
        self.statements += 1;
        Ok(())
    }

    /// Append everything `other` holds, after what is already here
    pub fn absorb(&mut self, other: SpillBuffer) -> io::Result<()> {
        let statements = other.drain_into(self)?;
        self.statements += statements;
        Ok(())
    }

    /// Copy the held statements to `out` in the order they were pushed
    pub fn drain_into<W: Write>(self, out: &mut W) -> io::Result<u64> {
        match self.file {
            Some(file) => {
                let mut file = file.into_inner().map_err(|e| e.into_error())?;
                file.seek(SeekFrom::Start(0))?;
                io::copy(&mut file, out)?;
            }
            None => out.write_all(&self.memory)?,
        }
        Ok(self.statements)
    }

    fn spill(&mut self) -> io::Result<()> {
        let mut file = BufWriter::new(tempfile::tempfile()?);
        file.write_all(&self.memory)?;
        self.memory = Vec::new();
        self.file = Some(file);
        Ok(())
    }
}

impl Write for SpillBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.file.is_none() && self.memory.len() + buf.len() > self.limit {
            self.spill()?;
        }
        match &mut self.file {
            Some(file) => file.write(buf),
            None => {
                self.memory.extend_from_slice(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.file {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Streams insert statements to a single output and counts them
pub struct InsertWriter<W: Write> {
    writer: W,
    statements: u64,
}

impl<W: Write> InsertWriter<W> {
    pub fn new(writer: W) -> Self {
        InsertWriter {
            writer,
            statements: 0,
        }
    }

    pub fn write_statement(&mut self, statement: &str) -> io::Result<()> {
        self.writer.write_all(statement.as_bytes())?;
        self.statements += 1;
        Ok(())
    }

    /// Write out a held-back buffer in full
    pub fn write_spill(&mut self, spill: SpillBuffer) -> io::Result<()> {
        self.statements += spill.drain_into(&mut self.writer)?;
        Ok(())
    }

    /// Flush and return the number of statements written
    pub fn finish(mut self) -> io::Result<u64> {
        self.writer.flush()?;
        Ok(self.statements)
    }
}

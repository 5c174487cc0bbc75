//! Persisted bytecode images (`.lmx`).
//!
//! Layout, all little-endian: the 5-byte magic `LIME!`, `code_size: u64`,
//! `data_size: u64`, then the code bytes and the data bytes. The sizes are
//! fixed-width so images are portable across hosts.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::buffer::Buffer;
use crate::consts::IMAGE_MAGIC;
use crate::error::ImageError;
use crate::interpreter::Vm;

impl Vm {
    /// Serialize the code and data buffers into `out`.
    pub fn save_image<W: Write>(&mut self, out: &mut W) -> Result<(), ImageError> {
        self.code.shrink_to_fit();
        self.data.shrink_to_fit();

        out.write_all(IMAGE_MAGIC)?;
        out.write_all(&(self.code.len() as u64).to_le_bytes())?;
        out.write_all(&(self.data.len() as u64).to_le_bytes())?;
        out.write_all(self.code.as_slice())?;
        out.write_all(self.data.as_slice())?;

        Ok(())
    }

    /// Write a `.lmx` image file.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ImageError> {
        let mut out = BufWriter::new(File::create(path)?);
        self.save_image(&mut out)?;
        out.flush()?;

        debug!(
            code = self.code.len(),
            data = self.data.len(),
            "image saved"
        );

        Ok(())
    }

    /// Replace the buffers from a serialized image and reset the frame
    /// registers, leaving the machine ready to run from address zero.
    ///
    /// Rejects a wrong magic, a short header, and size fields that do not
    /// match the file tail exactly.
    pub fn load_image<R: Read>(&mut self, input: &mut R) -> Result<(), ImageError> {
        let mut magic = [0u8; 5];
        read_exact_or(input, &mut magic, ImageError::TruncatedHeader)?;
        if &magic != IMAGE_MAGIC {
            return Err(ImageError::BadMagic);
        }

        let mut word = [0u8; 8];
        read_exact_or(input, &mut word, ImageError::TruncatedHeader)?;
        let code_size = u64::from_le_bytes(word) as usize;
        read_exact_or(input, &mut word, ImageError::TruncatedHeader)?;
        let data_size = u64::from_le_bytes(word) as usize;

        let mut code = vec![0u8; code_size];
        read_exact_or(input, &mut code, ImageError::SizeMismatch)?;
        let mut data = vec![0u8; data_size];
        read_exact_or(input, &mut data, ImageError::SizeMismatch)?;

        // The declared sizes must account for the whole tail.
        if input.read(&mut [0u8; 1])? != 0 {
            return Err(ImageError::SizeMismatch);
        }

        self.code = Buffer::from_bytes(code);
        self.data = Buffer::from_bytes(data);
        self.reset();

        debug!(code = code_size, data = data_size, "image loaded");

        Ok(())
    }

    /// Load a `.lmx` image file.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ImageError> {
        let mut input = BufReader::new(File::open(path)?);
        self.load_image(&mut input)
    }
}

fn read_exact_or<R: Read>(input: &mut R, buf: &mut [u8], short: ImageError) -> Result<(), ImageError> {
    match input.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(short),
        Err(e) => Err(e.into()),
    }
}

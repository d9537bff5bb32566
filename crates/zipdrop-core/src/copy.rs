//! Buffered copy and compare helpers shared by the builder and distributor.

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::io::{self};
use std::path::Path;

/// Buffer size for file I/O (64KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Reusable buffer for streaming file contents.
///
/// One buffer is held per build (or per copy worker) and reused across every
/// file, so copying does not allocate per entry.
///
/// # Examples
///
/// ```no_run
/// use zipdrop_core::copy::CopyBuffer;
/// use zipdrop_core::copy::copy_with_buffer;
///
/// let mut buffer = CopyBuffer::new();
/// let mut input = std::fs::File::open("input.bin")?;
/// let mut output = std::fs::File::create("output.bin")?;
/// let copied = copy_with_buffer(&mut input, &mut output, &mut buffer, |_| {})?;
/// println!("copied {copied} bytes");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct CopyBuffer {
    #[allow(clippy::large_stack_arrays)]
    buf: [u8; COPY_BUFFER_SIZE],
}

impl CopyBuffer {
    /// Creates a new zeroed copy buffer.
    #[inline]
    #[must_use]
    #[allow(clippy::large_stack_arrays)]
    pub fn new() -> Self {
        Self {
            buf: [0u8; COPY_BUFFER_SIZE],
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        COPY_BUFFER_SIZE
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `reader` into `writer` through `buffer`, calling `on_chunk` with
/// the size of every chunk written. Returns the total number of bytes.
///
/// Interrupted reads are retried.
///
/// # Errors
///
/// Returns the first read or write error.
#[inline]
pub fn copy_with_buffer<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
    mut on_chunk: F,
) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    F: FnMut(u64),
{
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        writer.write_all(&buffer.buf[..bytes_read])?;
        total = total.saturating_add(bytes_read as u64);
        on_chunk(bytes_read as u64);
    }

    Ok(total)
}

/// Returns `true` if both files exist and hold identical bytes.
///
/// Sizes are compared first, so unequal files are usually rejected without
/// reading either one.
///
/// # Errors
///
/// Returns an error if either file cannot be opened or read.
pub fn same_contents(a: &Path, b: &Path) -> io::Result<bool> {
    let mut left = File::open(a)?;
    let mut right = File::open(b)?;

    if left.metadata()?.len() != right.metadata()?.len() {
        return Ok(false);
    }

    let mut left_buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut right_buf = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let n = read_full(&mut left, &mut left_buf)?;
        let m = read_full(&mut right, &mut right_buf)?;
        if n != m || left_buf[..n] != right_buf[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

/// Reads until `buf` is full or EOF, returning the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

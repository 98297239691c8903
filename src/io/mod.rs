// gcsr converts binary edge lists into compressed sparse row graphs
// Copyright (C) 2022 Jacob Konrad
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Blocking transfers between files and fixed-width record buffers.
//!
//! Large buffers are moved in chunks of at most `chunk_bytes` so no single
//! system call has to cover the whole file.

use std::{
    cmp,
    fs::{self, File, OpenOptions},
    io::{self, Read, Write},
    path::Path,
};

use bytemuck::Pod;

use crate::{error::Result, Edge, Error, DEFAULT_CHUNK_BYTES};

mod dir;

pub use dir::list_files;

#[derive(Clone, Copy, Debug)]
pub struct ChunkedIo
{
    chunk_bytes: usize,
}

impl Default for ChunkedIo
{
    fn default() -> Self
    {
        Self::new(DEFAULT_CHUNK_BYTES)
    }
}

impl ChunkedIo
{
    pub fn new(chunk_bytes: usize) -> Self
    {
        Self {
            chunk_bytes: cmp::max(chunk_bytes, 1),
        }
    }

    pub fn chunk_bytes(&self) -> usize
    {
        self.chunk_bytes
    }

    /// Load a whole edge-list file.
    ///
    /// Fails with [`Error::Malformed`] when the file size is not a multiple
    /// of the edge record width.
    pub fn load_edges<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Edge>>
    {
        self.load(path.as_ref())
    }

    /// Load a whole file of native endian `u32`s.
    pub fn load_u32s<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u32>>
    {
        self.load(path.as_ref())
    }

    /// Create or truncate `path` and write `data` to it.
    ///
    /// Returns only once the contents have reached the disk.
    pub fn save<T: Pod, P: AsRef<Path>>(&self, path: P, data: &[T]) -> Result<()>
    {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .map_err(Error::io(path))?;
        self.write_all(&mut file, bytemuck::cast_slice(data))
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_all())
            .map_err(Error::io(path))
    }

    fn load<T: Pod>(&self, path: &Path) -> Result<Vec<T>>
    {
        let record = std::mem::size_of::<T>();
        let mut file = File::open(path).map_err(Error::io(path))?;
        let len = file.metadata().map_err(Error::io(path))?.len();

        if len % record as u64 != 0 {
            return Err(Error::Malformed {
                path: path.to_path_buf(),
                len,
            });
        }

        let mut data = vec![T::zeroed(); (len / record as u64) as usize];
        self.read_exact(&mut file, bytemuck::cast_slice_mut(&mut data[..]))
            .map_err(Error::io(path))?;
        Ok(data)
    }

    fn read_exact<R: Read>(&self, reader: &mut R, buf: &mut [u8]) -> io::Result<()>
    {
        let mut pos = 0;
        while pos < buf.len() {
            let end = pos + cmp::min(self.chunk_bytes, buf.len() - pos);
            match reader.read(&mut buf[pos..end]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("file ended after {} of {} bytes", pos, buf.len()),
                    ))
                }
                Ok(n) => pos += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn write_all<W: Write>(&self, writer: &mut W, buf: &[u8]) -> io::Result<()>
    {
        let mut pos = 0;
        while pos < buf.len() {
            let end = pos + cmp::min(self.chunk_bytes, buf.len() - pos);
            match writer.write(&buf[pos..end]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("wrote {} of {} bytes", pos, buf.len()),
                    ))
                }
                Ok(n) => pos += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Remove a file that has been fully converted.
pub fn remove<P: AsRef<Path>>(path: P) -> Result<()>
{
    let path = path.as_ref();
    fs::remove_file(path).map_err(Error::io(path))
}

/// Move `from` to `to`, replacing `to`.
pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()>
{
    let from = from.as_ref();
    fs::rename(from, to.as_ref()).map_err(Error::io(from))
}

/// Persist the entries of `dir`, so renames and removals inside it survive
/// a crash.
#[cfg(unix)]
pub fn sync_dir<P: AsRef<Path>>(dir: P) -> Result<()>
{
    let dir = dir.as_ref();
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(Error::io(dir))
}

/// Directory handles cannot be synced here; renames are left to the OS.
#[cfg(not(unix))]
pub fn sync_dir<P: AsRef<Path>>(_dir: P) -> Result<()>
{
    Ok(())
}

//! Write channel into this process's own address space.
//!
//! `/proc/self/mem` accepts `pwrite` at any mapped address, including
//! read-only text pages. Going through the pseudo-file avoids flipping
//! page permissions with `mprotect`, which would race with concurrent
//! instruction fetches and disturb the mapping layout.

use std::io;

/// An open read/write descriptor to `/proc/self/mem`.
pub struct MemChannel {
    fd: libc::c_int,
}

impl MemChannel {
    /// Opens the channel. Fails if the kernel refuses the pseudo-file.
    pub fn open() -> io::Result<Self> {
        let fd = unsafe { libc::open(c"/proc/self/mem".as_ptr(), libc::O_RDWR) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        log::trace!("[mem] opened /proc/self/mem (fd {fd})");
        Ok(Self { fd })
    }

    /// Writes `bytes` at the absolute address `addr`.
    ///
    /// A short write leaves the target in an unspecified state, so it is
    /// reported as an error rather than retried.
    pub fn write_at(&self, addr: u64, bytes: &[u8]) -> io::Result<()> {
        let written = loop {
            let n = unsafe {
                libc::pwrite(
                    self.fd,
                    bytes.as_ptr().cast(),
                    bytes.len(),
                    addr as libc::off_t,
                )
            };
            if n >= 0 {
                break n as usize;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        };

        if written != bytes.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!(
                    "short write at {addr:#x}: {written} of {} bytes",
                    bytes.len()
                ),
            ));
        }
        Ok(())
    }
}

impl Drop for MemChannel {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

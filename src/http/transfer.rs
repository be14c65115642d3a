//! File-to-socket transfer.
//!
//! On Linux the kernel moves file pages straight to the socket with
//! `sendfile(2)`; elsewhere this falls back to a buffered copy.

use std::fs::File;
use std::io;
use std::net::TcpStream;

/// Send `len` bytes of `file` from offset 0. Returns bytes sent, which is
/// less than `len` only if the file shrank underneath us.
#[cfg(target_os = "linux")]
pub fn send_file(file: &File, len: u64, out: &TcpStream) -> io::Result<u64> {
    use std::os::unix::io::AsRawFd;

    let mut offset: libc::off_t = 0;
    let mut sent: u64 = 0;
    while sent < len {
        let chunk = (len - sent).min(isize::MAX as u64) as usize;
        // SAFETY: both descriptors are open for the duration of the call and
        // `offset` is a valid, exclusively borrowed off_t.
        let n = unsafe { libc::sendfile(out.as_raw_fd(), file.as_raw_fd(), &mut offset, chunk) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if n == 0 {
            break;
        }
        sent += n as u64;
    }
    Ok(sent)
}

#[cfg(not(target_os = "linux"))]
pub fn send_file(file: &File, len: u64, out: &TcpStream) -> io::Result<u64> {
    use std::io::Read;

    let mut out = out;
    io::copy(&mut file.take(len), &mut out)
}

use std::io;
use std::os::fd::AsRawFd;
use std::time::Duration;

use canutils_frame::FilterTable;

use crate::error::Result;

/// Datagram I/O underneath an [`Endpoint`](crate::Endpoint).
///
/// One call to `send` writes one whole frame and one call to `recv`
/// yields one whole frame; the endpoint never splits records.
pub trait Channel: AsRawFd {
    /// Associate the channel with a named interface and return its index.
    fn attach(&mut self, interface: &str) -> Result<u32>;

    /// Replace the kernel-side acceptance filters in one call.
    fn set_filters(&self, filters: &FilterTable) -> io::Result<()>;

    fn send(&self, buf: &[u8]) -> io::Result<usize>;

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Wait until the channel can accept a write.
    ///
    /// Returns `Ok(false)` when the timeout elapses or a signal interrupts
    /// the wait.
    fn wait_writable(&self, timeout: Duration) -> io::Result<bool> {
        poll_writable(self.as_raw_fd(), timeout)
    }
}

pub(crate) fn poll_writable(fd: std::os::fd::RawFd, timeout: Duration) -> io::Result<bool> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

    // SAFETY: `fds` is a valid, writable pollfd for the duration of the call
    // and the count matches the single element passed.
    let rc = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0 && fds.revents & libc::POLLOUT != 0)
}

//! # Pipe endpoint pair for one pipeline generation.
//!
//! [`PipeEnds`] owns both ends of an anonymous pipe. Both ends are created
//! close-on-exec, so an exec'd program only ever receives the end that was
//! explicitly duplicated onto its standard stream.
//!
//! ## Ownership
//! ```text
//! Supervisor: PipeEnds::new()          ── original pair, closed after both launches
//!     ├─► try_clone() ─► producer watcher ─► into_bound(Producer) ─► write end → stdout
//!     └─► try_clone() ─► consumer watcher ─► into_bound(Consumer) ─► read end  → stdin
//! ```
//!
//! `O_NONBLOCK` lives on the open file description, so setting it through any
//! clone affects every descriptor referring to that end.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::fcntl::{FcntlArg, OFlag, fcntl};

use super::role::Role;

/// Both ends of an anonymous pipe.
#[derive(Debug)]
pub struct PipeEnds {
    read: OwnedFd,
    write: OwnedFd,
}

impl PipeEnds {
    /// Creates a fresh pipe with both ends marked close-on-exec.
    pub fn new() -> io::Result<Self> {
        let (read, write) = pipe_cloexec()?;
        Ok(Self { read, write })
    }

    /// Duplicates both ends (the duplicates are close-on-exec as well).
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self {
            read: self.read.try_clone()?,
            write: self.write.try_clone()?,
        })
    }

    /// Splits the pair into `(bound, unused)` for `role`.
    ///
    /// The producer binds the write end, the consumer the read end.
    pub fn into_bound(self, role: Role) -> (OwnedFd, OwnedFd) {
        match role {
            Role::Producer => (self.write, self.read),
            Role::Consumer => (self.read, self.write),
        }
    }

    /// Raw descriptor numbers `(read, write)`, for logging.
    pub fn raw(&self) -> (RawFd, RawFd) {
        (self.read.as_raw_fd(), self.write.as_raw_fd())
    }
}

/// Adds `O_NONBLOCK` to the file status flags of `fd`.
pub fn set_nonblocking(fd: &OwnedFd) -> nix::Result<()> {
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn pipe_cloexec() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(OFlag::O_CLOEXEC)
}

#[cfg(target_os = "macos")]
fn pipe_cloexec() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::FdFlag;

    let (read, write) = nix::unistd::pipe()?;
    for fd in [&read, &write] {
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read, write))
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::{Read, Write};

    use nix::fcntl::FdFlag;

    use super::*;

    fn is_cloexec(fd: &OwnedFd) -> bool {
        let flags = fcntl(fd, FcntlArg::F_GETFD).unwrap();
        FdFlag::from_bits_truncate(flags).contains(FdFlag::FD_CLOEXEC)
    }

    #[test]
    fn test_new_pipe_is_cloexec() {
        let pipe = PipeEnds::new().unwrap();
        let (read, write) = pipe.raw();
        assert_ne!(read, write);

        let clone = pipe.try_clone().unwrap();
        let (bound, unused) = clone.into_bound(Role::Producer);
        assert!(is_cloexec(&bound));
        assert!(is_cloexec(&unused));
    }

    #[test]
    fn test_producer_end_feeds_consumer_end() {
        let pipe = PipeEnds::new().unwrap();
        let (write, _) = pipe.try_clone().unwrap().into_bound(Role::Producer);
        let (read, _) = pipe.into_bound(Role::Consumer);

        let mut writer = File::from(write);
        writer.write_all(b"1\n2\n3\n").unwrap();
        drop(writer);

        let mut out = Vec::new();
        File::from(read).read_to_end(&mut out).unwrap();
        assert_eq!(out, b"1\n2\n3\n");
    }

    #[test]
    fn test_nonblocking_read_on_empty_pipe() {
        let pipe = PipeEnds::new().unwrap();
        let (read, _write_kept_open) = pipe.into_bound(Role::Consumer);
        set_nonblocking(&read).unwrap();

        let mut buf = [0u8; 8];
        let err = File::from(read).read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_nonblocking_is_shared_by_clones() {
        let pipe = PipeEnds::new().unwrap();
        let (bound, _) = pipe.try_clone().unwrap().into_bound(Role::Consumer);
        set_nonblocking(&bound).unwrap();

        let (original, _) = pipe.into_bound(Role::Consumer);
        let flags = OFlag::from_bits_truncate(fcntl(&original, FcntlArg::F_GETFL).unwrap());
        assert!(flags.contains(OFlag::O_NONBLOCK));
    }
}

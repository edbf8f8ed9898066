//! Raw ICMP listening endpoints.
//!
//! The listener only needs four things from the OS network stack: open an
//! endpoint for a family, read the next message, learn who sent it, close.
//! [`EndpointOpener`] and [`IcmpEndpoint`] express exactly that, so the
//! listener and orchestrator can be driven by synthetic endpoints in tests.
//! [`RawSocketOpener`] is the real implementation over `libc` raw sockets and
//! needs root (or `CAP_NET_RAW`).

use std::io;
#[cfg(unix)]
use std::mem;
use std::net::IpAddr;
#[cfg(unix)]
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::family::ProtocolFamily;

/// Textual representation of a message sender, valid for one derivation.
pub type PeerAddress = String;

/// An open endpoint receiving control messages for one protocol family.
pub trait IcmpEndpoint: Send {
    /// Block for the next inbound message, discard it, and return its sender.
    fn recv_peer(&mut self) -> io::Result<PeerAddress>;

    /// Release the endpoint. Errors here are unrecoverable for the process.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Opens listening endpoints.
pub trait EndpointOpener: Send + Sync {
    fn open(&self, family: ProtocolFamily, bind: IpAddr) -> io::Result<Box<dyn IcmpEndpoint>>;
}

// ---------------------------------------------------------------------------
// libc raw sockets
// ---------------------------------------------------------------------------

/// Opens `SOCK_RAW` sockets for ICMP / ICMPv6.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSocketOpener;

#[cfg(unix)]
impl EndpointOpener for RawSocketOpener {
    fn open(&self, family: ProtocolFamily, bind: IpAddr) -> io::Result<Box<dyn IcmpEndpoint>> {
        Ok(Box::new(RawIcmpSocket::open(family, bind)?))
    }
}

#[cfg(not(unix))]
impl EndpointOpener for RawSocketOpener {
    fn open(&self, family: ProtocolFamily, _: IpAddr) -> io::Result<Box<dyn IcmpEndpoint>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("raw {family} sockets are not available on this platform"),
        ))
    }
}

/// A raw socket bound to one ICMP protocol.
#[cfg(unix)]
#[derive(Debug)]
pub struct RawIcmpSocket {
    fd: libc::c_int,
    family: ProtocolFamily,
}

#[cfg(unix)]
impl RawIcmpSocket {
    /// Open and bind a raw socket for `family` on `bind`.
    pub fn open(family: ProtocolFamily, bind: IpAddr) -> io::Result<Self> {
        if !family.matches(&bind) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("bind address {bind} is not an {family} address"),
            ));
        }

        let domain = match family {
            ProtocolFamily::V4 => libc::AF_INET,
            ProtocolFamily::V6 => libc::AF_INET6,
        };
        // SAFETY: socket() takes plain integer arguments and returns -1 on error.
        let fd = unsafe { libc::socket(domain, libc::SOCK_RAW, family.protocol_number()) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        // From here on Drop closes fd if bind fails.
        let socket = Self { fd, family };

        let (storage, len) = sockaddr_for(bind);
        // SAFETY: storage is a zero-initialised sockaddr_storage holding a
        // sockaddr_in/sockaddr_in6 of `len` bytes; fd is a valid socket.
        let ret = unsafe {
            libc::bind(
                socket.fd,
                &storage as *const libc::sockaddr_storage as *const libc::sockaddr,
                len,
            )
        };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(socket)
    }

    pub fn family(&self) -> ProtocolFamily {
        self.family
    }
}

#[cfg(unix)]
impl IcmpEndpoint for RawIcmpSocket {
    fn recv_peer(&mut self) -> io::Result<PeerAddress> {
        loop {
            // SAFETY: all-zero is a valid sockaddr_storage.
            let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
            let mut len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
            // Zero-length buffer: the datagram is consumed and truncated, only
            // the source address is kept.
            let mut payload = [0u8; 0];
            // SAFETY: payload is a valid (empty) buffer, storage/len describe
            // a writable sockaddr_storage.
            let n = unsafe {
                libc::recvfrom(
                    self.fd,
                    payload.as_mut_ptr() as *mut libc::c_void,
                    0,
                    0,
                    &mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr,
                    &mut len,
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            return peer_text(&storage);
        }
    }

    fn close(mut self: Box<Self>) -> io::Result<()> {
        let fd = mem::replace(&mut self.fd, -1);
        // SAFETY: fd was returned by socket() and has not been closed yet.
        if unsafe { libc::close(fd) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for RawIcmpSocket {
    fn drop(&mut self) {
        if self.fd >= 0 {
            // SAFETY: fd is still owned by this socket.
            unsafe { libc::close(self.fd) };
        }
    }
}

/// Build a socket address for `ip` with port 0.
#[cfg(unix)]
fn sockaddr_for(ip: IpAddr) -> (libc::sockaddr_storage, libc::socklen_t) {
    // SAFETY: all-zero is a valid sockaddr_storage.
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    match ip {
        IpAddr::V4(v4) => {
            // SAFETY: sockaddr_storage is large and aligned enough for sockaddr_in.
            let sin = unsafe {
                &mut *(&mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr_in)
            };
            sin.sin_family = libc::AF_INET as libc::sa_family_t;
            sin.sin_addr.s_addr = u32::from_ne_bytes(v4.octets());
            #[cfg(target_os = "macos")]
            {
                sin.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
            }
            (storage, mem::size_of::<libc::sockaddr_in>() as libc::socklen_t)
        }
        IpAddr::V6(v6) => {
            // SAFETY: sockaddr_storage is large and aligned enough for sockaddr_in6.
            let sin6 = unsafe {
                &mut *(&mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr_in6)
            };
            sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sin6.sin6_addr.s6_addr = v6.octets();
            #[cfg(target_os = "macos")]
            {
                sin6.sin6_len = mem::size_of::<libc::sockaddr_in6>() as u8;
            }
            (storage, mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t)
        }
    }
}

/// Name of the interface with index `scope_id`, or the index itself when the
/// lookup fails.
#[cfg(unix)]
fn zone_name(scope_id: u32) -> String {
    let mut buf = [0 as libc::c_char; libc::IF_NAMESIZE];
    // SAFETY: buf holds IF_NAMESIZE bytes as if_indextoname requires; it
    // returns NULL on failure or a pointer to the NUL-terminated name in buf.
    let name = unsafe { libc::if_indextoname(scope_id, buf.as_mut_ptr()) };
    if name.is_null() {
        return scope_id.to_string();
    }
    // SAFETY: on success buf contains a NUL-terminated C string.
    unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Render the sender stored in `storage` as text. IPv6 senders with a
/// non-zero scope id get a `%<zone>` suffix naming the interface.
#[cfg(unix)]
fn peer_text(storage: &libc::sockaddr_storage) -> io::Result<PeerAddress> {
    match storage.ss_family as libc::c_int {
        libc::AF_INET => {
            // SAFETY: ss_family says this is a sockaddr_in.
            let sin = unsafe {
                &*(storage as *const libc::sockaddr_storage as *const libc::sockaddr_in)
            };
            let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr));
            Ok(ip.to_string())
        }
        libc::AF_INET6 => {
            // SAFETY: ss_family says this is a sockaddr_in6.
            let sin6 = unsafe {
                &*(storage as *const libc::sockaddr_storage as *const libc::sockaddr_in6)
            };
            let ip = Ipv6Addr::from(sin6.sin6_addr.s6_addr);
            if sin6.sin6_scope_id != 0 {
                Ok(format!("{ip}%{}", zone_name(sin6.sin6_scope_id)))
            } else {
                Ok(ip.to_string())
            }
        }
        other => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unexpected sender address family {other}"),
        )),
    }
}

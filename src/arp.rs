//! Proxy-ARP bridge: installs and removes entries in the host's ARP table
//! so addresses this server hands out are reachable on the local link.
//!
//! Abstracted behind [`ArpTable`] so the dispatcher can be exercised in
//! tests with [`NoopArpTable`] instead of touching the kernel.

use std::ffi::CString;
use std::io;
use std::mem;
use std::os::unix::io::RawFd;

/// The contract the dispatcher relies on: add a completed entry, or
/// remove one if and only if it still matches.
pub trait ArpTable {
    /// Add or replace a proxy-ARP entry mapping `mac` to `ip` on the
    /// serving device. Failure is logged by the caller, never fatal.
    fn add(&self, mac: [u8; 6], ip: u32) -> io::Result<()>;

    /// Remove the ARP entry for `ip` if it still resolves to `mac` (or
    /// unconditionally when `ip == 0`). "No such entry" is not an error.
    fn delete(&self, mac: [u8; 6], ip: u32) -> io::Result<()>;
}

/// Talks to the Linux kernel's ARP table via `SIOCSARP`/`SIOCGARP`/
/// `SIOCDARP` ioctls on a caller-provided socket, mirroring the original
/// server's `add_arp_entry`/`delete_arp_entry`.
pub struct LinuxArpTable {
    fd: RawFd,
    device: CString,
}

impl LinuxArpTable {
    /// `fd` must be an open `AF_INET`/`SOCK_DGRAM` socket; the dispatcher's
    /// own UDP socket is reused for this, as the source does.
    pub fn new(fd: RawFd, device: &str) -> io::Result<Self> {
        let device = CString::new(device)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "device name contains NUL"))?;
        Ok(Self { fd, device })
    }

    fn request(&self, ip: u32) -> libc::arpreq {
        let mut req: libc::arpreq = unsafe { mem::zeroed() };

        let sock = &mut req.arp_pa as *mut libc::sockaddr as *mut libc::sockaddr_in;
        unsafe {
            (*sock).sin_family = libc::AF_INET as libc::sa_family_t;
            (*sock).sin_addr.s_addr = ip.to_be();
        }

        let dev_bytes = self.device.as_bytes();
        let len = dev_bytes.len().min(req.arp_dev.len() - 1);
        for (slot, byte) in req.arp_dev.iter_mut().zip(dev_bytes[..len].iter()) {
            *slot = *byte as libc::c_char;
        }

        req
    }
}

impl ArpTable for LinuxArpTable {
    fn add(&self, mac: [u8; 6], ip: u32) -> io::Result<()> {
        let mut req = self.request(ip);
        for (slot, byte) in req.arp_ha.sa_data.iter_mut().zip(mac.iter()) {
            *slot = *byte as libc::c_char;
        }
        req.arp_flags = libc::ATF_COM as i32;

        let rc = unsafe { libc::ioctl(self.fd, libc::SIOCSARP as _, &req as *const _) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn delete(&self, mac: [u8; 6], ip: u32) -> io::Result<()> {
        let mut req = self.request(ip);

        let rc = unsafe { libc::ioctl(self.fd, libc::SIOCGARP as _, &mut req as *mut _) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ENXIO) {
                return Err(err);
            }
        }

        let existing: [u8; 6] = req.arp_ha.sa_data[..6]
            .iter()
            .map(|&b| b as u8)
            .collect::<Vec<_>>()
            .try_into()
            .unwrap();

        if ip == 0 || existing == mac {
            let rc = unsafe { libc::ioctl(self.fd, libc::SIOCDARP as _, &req as *const _) };
            if rc < 0 {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(())
    }
}

/// Records calls instead of touching the kernel; used by dispatcher tests.
#[derive(Default)]
pub struct NoopArpTable;

impl ArpTable for NoopArpTable {
    fn add(&self, _mac: [u8; 6], _ip: u32) -> io::Result<()> {
        Ok(())
    }

    fn delete(&self, _mac: [u8; 6], _ip: u32) -> io::Result<()> {
        Ok(())
    }
}

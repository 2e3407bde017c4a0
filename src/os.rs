//! Default per-kind destructors that hand tracked resources back to the kernel.
//!
//! Failures are expected here: the fuzzed calls themselves close descriptors, unmap
//! ranges and remove segments behind the registry's back. They are logged and ignored.
#![allow(unsafe_code)]

use std::ffi::c_void;
use std::ptr::NonNull;

use nix::errno::Errno;
use nix::sys::mman::munmap;

use crate::primitives::{Mapping, Object, SysvShm};
use crate::registry::Destructor;
use crate::types::ObjectKind;

/// Releases the OS resource behind `obj`. Futexes own nothing and are left alone.
pub fn release(obj: &Object) {
    match obj {
        Object::MmapAnon(m) | Object::MmapFile(m) | Object::MmapTestfile(m) => unmap(m),
        Object::SysvShm(shm) => detach_shm(shm),
        Object::Futex(_) => {}
        other => {
            if let Some(fd) = other.fd() {
                if let Err(err) = nix::unistd::close(fd) {
                    tracing::trace!(kind = %other.kind(), fd, %err, "close failed");
                }
            }
        }
    }
}

fn unmap(m: &Mapping) {
    let Some(addr) = NonNull::new(m.ptr as *mut c_void) else {
        return;
    };
    if m.size == 0 {
        return;
    }
    // SAFETY: the range was mapped by the fuzzer and is owned by this Object; nothing
    // in the registry dereferences it.
    if let Err(err) = unsafe { munmap(addr, m.size) } {
        tracing::trace!(ptr = m.ptr, size = m.size, %err, "munmap failed");
    }
}

fn detach_shm(shm: &SysvShm) {
    if shm.ptr != 0 {
        // SAFETY: the attach address came from shmat for this segment.
        let ret = unsafe { libc::shmdt(shm.ptr as *const libc::c_void) };
        if ret != 0 {
            tracing::trace!(id = shm.id, err = %Errno::last(), "shmdt failed");
        }
    }
    // SAFETY: IPC_RMID takes no buffer.
    let ret = unsafe { libc::shmctl(shm.id, libc::IPC_RMID, std::ptr::null_mut()) };
    if ret != 0 {
        tracing::trace!(id = shm.id, err = %Errno::last(), "shmctl(IPC_RMID) failed");
    }
}

/// The destructor installed for `kind` when OS destructors are enabled.
pub fn default_destructor(kind: ObjectKind) -> Option<Destructor> {
    match kind {
        ObjectKind::Futex => None,
        _ => Some(Destructor::new(release)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::mman::{mmap_anonymous, MapFlags, ProtFlags};
    use std::num::NonZeroUsize;
    use std::os::fd::IntoRawFd;

    fn is_open(fd: i32) -> bool {
        nix::fcntl::fcntl(fd, nix::fcntl::FcntlArg::F_GETFD).is_ok()
    }

    #[test]
    fn test_release_closes_pipe() {
        let (rd, wr) = nix::unistd::pipe().unwrap();
        let (rd, wr) = (rd.into_raw_fd(), wr.into_raw_fd());
        release(&Object::Pipe(rd));
        release(&Object::Pipe(wr));
        assert!(!is_open(rd));
        assert!(!is_open(wr));
    }

    #[test]
    fn test_release_unmaps_anonymous_mapping() {
        let size = NonZeroUsize::new(4096).unwrap();
        let prot = ProtFlags::PROT_READ | ProtFlags::PROT_WRITE;
        let flags = MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS;
        // SAFETY: plain anonymous private mapping, never dereferenced.
        let ptr = unsafe { mmap_anonymous(None, size, prot, flags) }.unwrap();
        release(&Object::MmapAnon(Mapping {
            ptr: ptr.as_ptr() as usize,
            size: size.get(),
            prot: prot.bits(),
            flags: flags.bits(),
            name: "anon".into(),
        }));
    }

    #[test]
    fn test_release_tolerates_unaligned_mapping() {
        // munmap rejects an unaligned start with EINVAL; the failure is only logged.
        release(&Object::MmapFile(Mapping { ptr: 0x1001, size: 4096, ..Default::default() }));
    }

    #[test]
    fn test_release_skips_empty_payloads() {
        release(&Object::zeroed(ObjectKind::MmapFile));
        release(&Object::Futex(Default::default()));
    }

    #[test]
    fn test_release_tolerates_bad_fd() {
        release(&Object::File(-1));
        release(&Object::Socket(crate::primitives::SocketInfo { triplet: Default::default(), fd: -1 }));
    }

    #[test]
    fn test_futex_has_no_default_destructor() {
        assert!(default_destructor(ObjectKind::Futex).is_none());
        for kind in ObjectKind::ALL.iter().filter(|k| **k != ObjectKind::Futex) {
            assert!(default_destructor(*kind).is_some(), "{kind} should have a destructor");
        }
    }
}

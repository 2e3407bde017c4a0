use std::os::fd::RawFd;

use crate::types::ObjectKind;

// --- Payloads ----------------------------------------------------------------

/// A memory mapping created by a fuzzed call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    /// Start address of the mapping.
    pub ptr: usize,
    pub size: usize,
    pub prot: i32,
    pub flags: i32,
    /// Human readable origin, e.g. the backing file's path.
    pub name: String,
}

/// A futex word and the process that holds it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FutexLock {
    /// Address of the futex word.
    pub futex: usize,
    pub owner_pid: i32,
}

/// A System-V shared memory segment, possibly attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SysvShm {
    pub id: i32,
    pub size: usize,
    pub flags: i32,
    /// Attach address, or 0 when the segment is not attached.
    pub ptr: usize,
}

/// The (family, type, protocol) arguments a socket was created with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SocketTriplet {
    pub family: i32,
    pub ty: i32,
    pub protocol: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketInfo {
    pub triplet: SocketTriplet,
    pub fd: RawFd,
}

// --- Handles -----------------------------------------------------------------

/// The OS handle an Object owns. No two live Objects in a store may share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    /// Descriptor number. Every descriptor kind, sockets included, shares one table.
    Fd(RawFd),
    /// Start address of a mapping.
    Mapping(usize),
    /// Address of a futex word.
    Futex(usize),
    /// System-V segment id.
    Shm(i32),
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handle::Fd(fd) => write!(f, "fd {}", fd),
            Handle::Mapping(ptr) => write!(f, "mapping {:#x}", ptr),
            Handle::Futex(addr) => write!(f, "futex {:#x}", addr),
            Handle::Shm(id) => write!(f, "shm id {}", id),
        }
    }
}

// --- Object ------------------------------------------------------------------

/// One live OS-level resource tracked by the registry.
///
/// Exactly one variant is valid per instance, and its payload can only be reached
/// through that variant. `Object` is deliberately not `Clone`: every tracked handle
/// has a single owner, which is what lets destruction run exactly once.
#[derive(Debug, PartialEq, Eq)]
pub enum Object {
    MmapAnon(Mapping),
    MmapFile(Mapping),
    MmapTestfile(Mapping),
    Pipe(RawFd),
    File(RawFd),
    Perf(RawFd),
    Epoll(RawFd),
    Eventfd(RawFd),
    Timerfd(RawFd),
    Testfile(RawFd),
    Memfd(RawFd),
    Drm(RawFd),
    Inotify(RawFd),
    Userfaultfd(RawFd),
    Fanotify(RawFd),
    BpfMap(RawFd),
    BpfProg(RawFd),
    Futex(FutexLock),
    SysvShm(SysvShm),
    Socket(SocketInfo),
}

impl Object {
    /// A detached, zero-initialised Object of `kind`, ready to be filled in and inserted.
    pub fn zeroed(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::MmapAnon => Object::MmapAnon(Mapping::default()),
            ObjectKind::MmapFile => Object::MmapFile(Mapping::default()),
            ObjectKind::MmapTestfile => Object::MmapTestfile(Mapping::default()),
            ObjectKind::FdPipe => Object::Pipe(0),
            ObjectKind::FdFile => Object::File(0),
            ObjectKind::FdPerf => Object::Perf(0),
            ObjectKind::FdEpoll => Object::Epoll(0),
            ObjectKind::FdEventfd => Object::Eventfd(0),
            ObjectKind::FdTimerfd => Object::Timerfd(0),
            ObjectKind::FdTestfile => Object::Testfile(0),
            ObjectKind::FdMemfd => Object::Memfd(0),
            ObjectKind::FdDrm => Object::Drm(0),
            ObjectKind::FdInotify => Object::Inotify(0),
            ObjectKind::FdUserfaultfd => Object::Userfaultfd(0),
            ObjectKind::FdFanotify => Object::Fanotify(0),
            ObjectKind::FdBpfMap => Object::BpfMap(0),
            ObjectKind::FdBpfProg => Object::BpfProg(0),
            ObjectKind::Futex => Object::Futex(FutexLock::default()),
            ObjectKind::SysvShm => Object::SysvShm(SysvShm::default()),
            ObjectKind::FdSocket => Object::Socket(SocketInfo::default()),
        }
    }

    /// Builds a descriptor-backed Object of `kind`.
    /// Returns `None` for kinds whose payload is not a bare descriptor.
    pub fn from_fd(kind: ObjectKind, fd: RawFd) -> Option<Self> {
        let obj = match kind {
            ObjectKind::FdPipe => Object::Pipe(fd),
            ObjectKind::FdFile => Object::File(fd),
            ObjectKind::FdPerf => Object::Perf(fd),
            ObjectKind::FdEpoll => Object::Epoll(fd),
            ObjectKind::FdEventfd => Object::Eventfd(fd),
            ObjectKind::FdTimerfd => Object::Timerfd(fd),
            ObjectKind::FdTestfile => Object::Testfile(fd),
            ObjectKind::FdMemfd => Object::Memfd(fd),
            ObjectKind::FdDrm => Object::Drm(fd),
            ObjectKind::FdInotify => Object::Inotify(fd),
            ObjectKind::FdUserfaultfd => Object::Userfaultfd(fd),
            ObjectKind::FdFanotify => Object::Fanotify(fd),
            ObjectKind::FdBpfMap => Object::BpfMap(fd),
            ObjectKind::FdBpfProg => Object::BpfProg(fd),
            _ => return None,
        };
        Some(obj)
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::MmapAnon(_) => ObjectKind::MmapAnon,
            Object::MmapFile(_) => ObjectKind::MmapFile,
            Object::MmapTestfile(_) => ObjectKind::MmapTestfile,
            Object::Pipe(_) => ObjectKind::FdPipe,
            Object::File(_) => ObjectKind::FdFile,
            Object::Perf(_) => ObjectKind::FdPerf,
            Object::Epoll(_) => ObjectKind::FdEpoll,
            Object::Eventfd(_) => ObjectKind::FdEventfd,
            Object::Timerfd(_) => ObjectKind::FdTimerfd,
            Object::Testfile(_) => ObjectKind::FdTestfile,
            Object::Memfd(_) => ObjectKind::FdMemfd,
            Object::Drm(_) => ObjectKind::FdDrm,
            Object::Inotify(_) => ObjectKind::FdInotify,
            Object::Userfaultfd(_) => ObjectKind::FdUserfaultfd,
            Object::Fanotify(_) => ObjectKind::FdFanotify,
            Object::BpfMap(_) => ObjectKind::FdBpfMap,
            Object::BpfProg(_) => ObjectKind::FdBpfProg,
            Object::Futex(_) => ObjectKind::Futex,
            Object::SysvShm(_) => ObjectKind::SysvShm,
            Object::Socket(_) => ObjectKind::FdSocket,
        }
    }

    /// The descriptor behind this Object, for every descriptor-backed kind (sockets included).
    pub fn fd(&self) -> Option<RawFd> {
        match self {
            Object::Pipe(fd)
            | Object::File(fd)
            | Object::Perf(fd)
            | Object::Epoll(fd)
            | Object::Eventfd(fd)
            | Object::Timerfd(fd)
            | Object::Testfile(fd)
            | Object::Memfd(fd)
            | Object::Drm(fd)
            | Object::Inotify(fd)
            | Object::Userfaultfd(fd)
            | Object::Fanotify(fd)
            | Object::BpfMap(fd)
            | Object::BpfProg(fd) => Some(*fd),
            Object::Socket(info) => Some(info.fd),
            _ => None,
        }
    }

    /// The handle this Object owns, or `None` while its payload is still unset
    /// (negative descriptor or segment id, null address).
    pub fn handle(&self) -> Option<Handle> {
        match self {
            Object::MmapAnon(m) | Object::MmapFile(m) | Object::MmapTestfile(m) => {
                (m.ptr != 0).then_some(Handle::Mapping(m.ptr))
            }
            Object::Futex(lock) => (lock.futex != 0).then_some(Handle::Futex(lock.futex)),
            Object::SysvShm(shm) => (shm.id >= 0).then_some(Handle::Shm(shm.id)),
            other => other.fd().filter(|fd| *fd >= 0).map(Handle::Fd),
        }
    }

    /// The mapping payload, for the three mapping kinds.
    pub fn mapping(&self) -> Option<&Mapping> {
        match self {
            Object::MmapAnon(m) | Object::MmapFile(m) | Object::MmapTestfile(m) => Some(m),
            _ => None,
        }
    }

    /// One human readable line describing the payload, used by object dumps.
    pub fn describe(&self) -> String {
        match self {
            Object::MmapAnon(m) | Object::MmapFile(m) | Object::MmapTestfile(m) => format!(
                " start: {:#x} size:{}  name: {}",
                m.ptr,
                size_unit(m.size as u64),
                m.name
            ),
            Object::Pipe(fd) => format!("pipefd:{}", fd),
            Object::File(fd) => format!("filefd:{}", fd),
            Object::Perf(fd) => format!("perffd:{}", fd),
            Object::Epoll(fd) => format!("epollfd:{}", fd),
            Object::Eventfd(fd) => format!("eventfd:{}", fd),
            Object::Timerfd(fd) => format!("timerfd:{}", fd),
            Object::Testfile(fd) => format!("testfilefd:{}", fd),
            Object::Memfd(fd) => format!("memfd:{}", fd),
            Object::Drm(fd) => format!("drmfd:{}", fd),
            Object::Inotify(fd) => format!("inotifyfd:{}", fd),
            Object::Userfaultfd(fd) => format!("userfaultfd:{}", fd),
            Object::Fanotify(fd) => format!("fanotify:{}", fd),
            Object::BpfMap(fd) => format!("bpf map fd:{}", fd),
            Object::BpfProg(fd) => format!("bpf prog fd:{}", fd),
            Object::Futex(lock) => format!("futex: {:x} owner:{}", lock.futex, lock.owner_pid),
            Object::SysvShm(shm) => format!(
                "sysv_shm: id:{} size:{} flags:{:x} ptr:{:#x}",
                shm.id, shm.size, shm.flags, shm.ptr
            ),
            Object::Socket(info) => format!(
                "socket (fam:{} type:{} protocol:{}) fd:{}",
                info.triplet.family, info.triplet.ty, info.triplet.protocol, info.fd
            ),
        }
    }
}

/// Renders a byte count with a binary unit suffix, e.g. `4096` -> `4KB`.
/// Sizes that are not a whole number of the next unit stay in the smaller one.
pub fn size_unit(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes;
    let mut unit = 0;
    while value != 0 && value % 1024 == 0 && unit < UNITS.len() - 1 {
        value /= 1024;
        unit += 1;
    }
    format!("{}{}", value, UNITS[unit])
}

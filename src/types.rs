// Shared identifiers used by every registry module: the object kind tag,
// the scope flag and per-store object handles.

use crate::error::RegistryError;

/// Number of distinct object kinds. Every store carries exactly this many heads.
pub const MAX_OBJECT_TYPES: usize = 20;

/// The category of OS resource an Object represents.
/// The discriminant doubles as the index of the kind's head inside a store.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Anonymous memory mapping.
    MmapAnon = 0,
    /// Mapping backed by an arbitrary file.
    MmapFile = 1,
    /// Mapping backed by one of the fuzzer's test files.
    MmapTestfile = 2,
    FdPipe = 3,
    FdFile = 4,
    /// perf_event_open descriptor.
    FdPerf = 5,
    FdEpoll = 6,
    FdEventfd = 7,
    FdTimerfd = 8,
    FdTestfile = 9,
    FdMemfd = 10,
    FdDrm = 11,
    FdInotify = 12,
    FdUserfaultfd = 13,
    FdFanotify = 14,
    FdBpfMap = 15,
    FdBpfProg = 16,
    /// Futex word plus the pid that owns it.
    Futex = 17,
    /// System-V shared memory segment.
    SysvShm = 18,
    FdSocket = 19,
}

impl ObjectKind {
    /// All kinds, in discriminant order. Pruning visits kinds in this order.
    pub const ALL: [ObjectKind; MAX_OBJECT_TYPES] = [
        ObjectKind::MmapAnon,
        ObjectKind::MmapFile,
        ObjectKind::MmapTestfile,
        ObjectKind::FdPipe,
        ObjectKind::FdFile,
        ObjectKind::FdPerf,
        ObjectKind::FdEpoll,
        ObjectKind::FdEventfd,
        ObjectKind::FdTimerfd,
        ObjectKind::FdTestfile,
        ObjectKind::FdMemfd,
        ObjectKind::FdDrm,
        ObjectKind::FdInotify,
        ObjectKind::FdUserfaultfd,
        ObjectKind::FdFanotify,
        ObjectKind::FdBpfMap,
        ObjectKind::FdBpfProg,
        ObjectKind::Futex,
        ObjectKind::SysvShm,
        ObjectKind::FdSocket,
    ];

    /// Index of this kind's head within a store.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable label, identical to the serde representation.
    pub const fn name(self) -> &'static str {
        match self {
            ObjectKind::MmapAnon => "mmap_anon",
            ObjectKind::MmapFile => "mmap_file",
            ObjectKind::MmapTestfile => "mmap_testfile",
            ObjectKind::FdPipe => "fd_pipe",
            ObjectKind::FdFile => "fd_file",
            ObjectKind::FdPerf => "fd_perf",
            ObjectKind::FdEpoll => "fd_epoll",
            ObjectKind::FdEventfd => "fd_eventfd",
            ObjectKind::FdTimerfd => "fd_timerfd",
            ObjectKind::FdTestfile => "fd_testfile",
            ObjectKind::FdMemfd => "fd_memfd",
            ObjectKind::FdDrm => "fd_drm",
            ObjectKind::FdInotify => "fd_inotify",
            ObjectKind::FdUserfaultfd => "fd_userfaultfd",
            ObjectKind::FdFanotify => "fd_fanotify",
            ObjectKind::FdBpfMap => "fd_bpf_map",
            ObjectKind::FdBpfProg => "fd_bpf_prog",
            ObjectKind::Futex => "futex",
            ObjectKind::SysvShm => "sysv_shm",
            ObjectKind::FdSocket => "fd_socket",
        }
    }
}

impl TryFrom<u8> for ObjectKind {
    type Error = RegistryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ObjectKind::ALL.get(value as usize).copied().ok_or(RegistryError::InvalidKind(value))
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which store a head lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The single campaign-wide store, shared by the supervisor and every worker.
    Global,
    /// The calling worker's private store.
    Local,
}

/// Handle of a live Object inside one store. Ids are never reused by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

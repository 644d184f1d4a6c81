//! Resource usage of the instrumented process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageFaults {
    pub minor: u64,
    pub major: u64,
}

impl PageFaults {
    /// Cumulative page faults of the whole process, as reported by the operating system
    #[cfg(unix)]
    #[allow(unsafe_code, clippy::cast_sign_loss)]
    pub fn snapshot() -> Self {
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        let res = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
        if res != 0 {
            log::debug!("getrusage failed: {}", std::io::Error::last_os_error());
            return Self::default();
        }
        Self {
            minor: usage.ru_minflt.max(0) as u64,
            major: usage.ru_majflt.max(0) as u64,
        }
    }

    #[cfg(not(unix))]
    pub fn snapshot() -> Self {
        Self::default()
    }

    /// Faults that happened between `earlier` and `self`
    pub fn since(&self, earlier: &PageFaults) -> PageFaults {
        PageFaults {
            minor: self.minor.saturating_sub(earlier.minor),
            major: self.major.saturating_sub(earlier.major),
        }
    }
}

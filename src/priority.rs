//! Best-effort thread-priority elevation for the single-winner phase of
//! cooperative resize.
//!
//! This is advisory only: failures to read or raise priority are ignored,
//! since a thread that cannot elevate still makes progress, just without
//! the scheduling nudge. Non-Unix targets get a no-op implementation.

#[cfg(unix)]
mod imp {
  /// Raises the calling thread's scheduling priority by one nice level for
  /// the lifetime of the guard, restoring the original value on drop.
  pub(crate) struct PriorityBoost {
    tid: libc::pid_t,
    original: libc::c_int,
  }

  impl PriorityBoost {
    pub(crate) fn acquire() -> Self {
      let tid = current_tid();

      // SAFETY: `getpriority` reads process scheduling state; `tid` is a
      // valid id for the calling thread. A -1 return is ambiguous with a
      // genuine nice value of -1, but this is advisory only, so a spurious
      // skip of the boost is harmless.
      let original = unsafe { libc::getpriority(libc::PRIO_PROCESS, tid as libc::id_t) };

      // SAFETY: same `tid`, no wider effect than adjusting its nice value.
      // A failure here (commonly EACCES without CAP_SYS_NICE) is ignored.
      unsafe {
        libc::setpriority(libc::PRIO_PROCESS, tid as libc::id_t, original.saturating_sub(1));
      }

      Self { tid, original }
    }
  }

  impl Drop for PriorityBoost {
    fn drop(&mut self) {
      // SAFETY: restores the value this same thread observed in `acquire`.
      unsafe {
        libc::setpriority(libc::PRIO_PROCESS, self.tid as libc::id_t, self.original);
      }
    }
  }

  #[cfg(target_os = "linux")]
  fn current_tid() -> libc::pid_t {
    // SAFETY: `SYS_gettid` takes no arguments and cannot fail.
    unsafe { libc::syscall(libc::SYS_gettid) as libc::pid_t }
  }

  #[cfg(not(target_os = "linux"))]
  fn current_tid() -> libc::pid_t {
    // SAFETY: `getpid` takes no arguments and cannot fail. Other BSDs treat
    // `PRIO_PROCESS` against the calling process rather than a specific
    // thread; this crate only ships a Linux `gettid` path.
    unsafe { libc::getpid() }
  }
}

#[cfg(not(unix))]
mod imp {
  pub(crate) struct PriorityBoost;

  impl PriorityBoost {
    pub(crate) fn acquire() -> Self {
      Self
    }
  }
}

pub(crate) use self::imp::PriorityBoost;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process resource caps and environment scrubbing.
//!
//! Limits are applied between fork and exec and are best-effort: a
//! platform that rejects a particular rlimit still runs the child under
//! the remaining caps.

use std::process::Command;

/// Minimal PATH the child sees.
pub const CHILD_PATH: &str = "/usr/bin:/bin";

/// Kernel resource caps applied to the child.
#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    pub address_space_bytes: u64,
    pub cpu_seconds: u64,
    pub open_files: u64,
    pub processes: u64,
    pub stack_bytes: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            address_space_bytes: 512 * 1024 * 1024,
            cpu_seconds: 3,
            open_files: 64,
            processes: 64,
            stack_bytes: 8 * 1024 * 1024,
        }
    }
}

impl ResourceLimits {
    pub fn with_address_space_mb(mut self, mb: u64) -> Self {
        self.address_space_bytes = mb * 1024 * 1024;
        self
    }
}

/// Replace the child environment with the minimal allowlist plus
/// caller-supplied extras (test-only knobs).
pub fn scrub_env(cmd: &mut Command, extra: &[(String, String)]) {
    cmd.env_clear();
    cmd.env("PATH", CHILD_PATH);
    cmd.env("PYTHONUNBUFFERED", "1");
    for (key, value) in extra {
        cmd.env(key, value);
    }
}

/// Install the rlimit hook on `cmd`.
#[cfg(unix)]
pub fn apply(cmd: &mut Command, limits: ResourceLimits) {
    use std::os::unix::process::CommandExt;

    // SAFETY: the pre_exec closure runs in the forked child before exec and
    // only calls setrlimit, which is async-signal-safe. No allocation, no
    // locks, no other libc state is touched.
    unsafe {
        cmd.pre_exec(move || {
            set_rlimit(libc::RLIMIT_AS, limits.address_space_bytes);
            set_rlimit(libc::RLIMIT_CPU, limits.cpu_seconds);
            set_rlimit(libc::RLIMIT_NOFILE, limits.open_files);
            set_rlimit(libc::RLIMIT_NPROC, limits.processes);
            set_rlimit(libc::RLIMIT_STACK, limits.stack_bytes);
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn apply(_cmd: &mut Command, _limits: ResourceLimits) {}

// glibc types the rlimit resource as its own enum; other libcs use c_int.
#[cfg(all(unix, target_env = "gnu"))]
type RlimitResource = libc::__rlimit_resource_t;
#[cfg(all(unix, not(target_env = "gnu")))]
type RlimitResource = libc::c_int;

/// Best-effort setrlimit; a refused cap leaves the previous one in place.
#[cfg(unix)]
fn set_rlimit(resource: RlimitResource, value: u64) {
    let limit = libc::rlimit {
        rlim_cur: value as libc::rlim_t,
        rlim_max: value as libc::rlim_t,
    };
    // SAFETY: `limit` is a valid rlimit struct for the duration of the call.
    unsafe {
        let _ = libc::setrlimit(resource, &limit);
    }
}

#[cfg(test)]
#[path = "limits_tests.rs"]
mod tests;

//! Host environment detection
//!
//! Collects the facts that catalog `system_requirements` are checked against:
//! installed memory, Windows build number, and whether the process is elevated.
//!
//! # Design
//!
//! - **Never fails**: Each fact is optional. Detection problems are logged and
//!   the fact is left unknown; requirement checks skip unknown facts
//! - **One probe**: A single PowerShell invocation prints all three values,
//!   one per line, so the parser can be tested without Windows

use std::fmt;
use std::process::{Command, Stdio};

/// PowerShell snippet printing memory bytes, OS build, and admin flag.
const PROBE_SCRIPT: &str = "(Get-CimInstance Win32_ComputerSystem).TotalPhysicalMemory; \
[System.Environment]::OSVersion.Version.Build; \
([Security.Principal.WindowsPrincipal][Security.Principal.WindowsIdentity]::GetCurrent()).IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)";

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Detected host facts. `None` means "could not be determined".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostInfo {
    pub total_memory_gb: Option<f64>,
    pub os_build: Option<u32>,
    pub is_elevated: Option<bool>,
}

impl HostInfo {
    /// Probe the current machine.
    ///
    /// On non-Windows hosts every fact is unknown.
    pub fn detect() -> Self {
        if !cfg!(windows) {
            tracing::debug!("Not running on Windows, host facts unknown");
            return Self::default();
        }

        let output = Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", PROBE_SCRIPT])
            .stdin(Stdio::null())
            .output();

        let info = match output {
            Ok(out) if out.status.success() => Self::parse_probe(&String::from_utf8_lossy(&out.stdout)),
            Ok(out) => {
                tracing::warn!(exit_code = ?out.status.code(), "Host probe failed");
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to launch PowerShell for host probe: {}", e);
                Self::default()
            }
        };

        tracing::info!(host = %info, "Host detection finished");
        info
    }

    /// Parse the three-line probe output. Unparsable lines become `None`.
    pub fn parse_probe(output: &str) -> Self {
        let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());

        let total_memory_gb = lines
            .next()
            .and_then(|l| l.parse::<u64>().ok())
            .map(|bytes| bytes as f64 / BYTES_PER_GB);
        let os_build = lines.next().and_then(|l| l.parse::<u32>().ok());
        let is_elevated = lines.next().and_then(|l| match l.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        });

        Self {
            total_memory_gb,
            os_build,
            is_elevated,
        }
    }
}

impl fmt::Display for HostInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total_memory_gb {
            Some(gb) => write!(f, "memory={:.1}GB", gb)?,
            None => write!(f, "memory=unknown")?,
        }
        match self.os_build {
            Some(build) => write!(f, ", build={}", build)?,
            None => write!(f, ", build=unknown")?,
        }
        match self.is_elevated {
            Some(elevated) => write!(f, ", elevated={}", elevated),
            None => write!(f, ", elevated=unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_full() {
        let info = HostInfo::parse_probe("17179869184\r\n22631\r\nTrue\r\n");
        assert_eq!(info.total_memory_gb, Some(16.0));
        assert_eq!(info.os_build, Some(22631));
        assert_eq!(info.is_elevated, Some(true));
    }

    #[test]
    fn test_parse_probe_garbage() {
        let info = HostInfo::parse_probe("Get-CimInstance : Access denied\nnot-a-number\nmaybe\n");
        assert_eq!(info, HostInfo::default());
    }

    #[test]
    fn test_parse_probe_truncated() {
        let info = HostInfo::parse_probe("8589934592\n");
        assert_eq!(info.total_memory_gb, Some(8.0));
        assert_eq!(info.os_build, None);
        assert_eq!(info.is_elevated, None);
    }

    #[test]
    fn test_display_unknown() {
        assert_eq!(
            HostInfo::default().to_string(),
            "memory=unknown, build=unknown, elevated=unknown"
        );
    }
}

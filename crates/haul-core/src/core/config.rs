use std::path::PathBuf;

use which::which;

use crate::core::error::{Error, Result};

/// An external tool the pipeline shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Tar,
    Unzip,
    SevenZip,
    Gzip,
    Xz,
}

impl Tool {
    /// Environment variable that forces a specific binary for this tool.
    #[must_use]
    pub fn env_override(self) -> &'static str {
        match self {
            Tool::Tar => "HAUL_TAR",
            Tool::Unzip => "HAUL_UNZIP",
            Tool::SevenZip => "HAUL_SEVENZIP",
            Tool::Gzip => "HAUL_GZIP",
            Tool::Xz => "HAUL_XZ",
        }
    }

    /// Binary names probed on PATH, in order.
    fn candidates(self) -> &'static [&'static str] {
        match self {
            Tool::Tar => &["tar"],
            Tool::Unzip => &["unzip"],
            Tool::SevenZip => &["7z", "7za", "7zr"],
            Tool::Gzip => &["gzip"],
            Tool::Xz => &["xz"],
        }
    }

    /// Locate the binary. The env override wins and is taken as-is, so a bad
    /// value surfaces at spawn time with the configured path in the message.
    pub fn locate(self) -> Result<PathBuf> {
        if let Some(explicit) = std::env::var_os(self.env_override()) {
            return Ok(PathBuf::from(explicit));
        }
        for candidate in self.candidates() {
            if let Ok(path) = which(candidate) {
                return Ok(path);
            }
        }
        Err(Error::config(format!(
            "none of {:?} found on PATH; set {} to the binary to use",
            self.candidates(),
            self.env_override()
        )))
    }
}

//! Binary-to-text encoding of the shell-archive payload.
//!
//! The compressed tarball is appended to a shell script, so it must travel
//! as text. OpenSSL's base64 filter is preferred; `uuencode -m` is the
//! fallback on hosts without OpenSSL. The decoder embedded in the extract
//! script is always the complement of the encoder that produced the payload.

use crate::error::{ArchiveError, Result};
use crate::executor::{CommandExecutor, Invocation, run_checked};
use crate::fsutil::require_file;
use camino::Utf8Path;
use log::debug;
use std::fmt;

/// A payload encoding and its matching decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// `openssl enc -base64`.
    OpenSsl,
    /// `uuencode -m`, base64 wrapped in uuencode framing.
    Uuencode,
}

impl Encoding {
    /// Pick the preferred encoding whose tool `is_available` reports.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NoEncoder`] when neither tool is available.
    pub fn select(is_available: impl Fn(&str) -> bool) -> Result<Self> {
        [Self::OpenSsl, Self::Uuencode]
            .into_iter()
            .find(|encoding| is_available(encoding.program()))
            .ok_or(ArchiveError::NoEncoder)
    }

    /// Pick an encoding by probing `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NoEncoder`] when neither tool is installed.
    pub fn detect() -> Result<Self> {
        let encoding = Self::select(|program| which::which(program).is_ok())?;
        debug!("payload encoding: {encoding}");
        Ok(encoding)
    }

    /// The program that performs the encoding.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::OpenSsl => "openssl",
            Self::Uuencode => "uuencode",
        }
    }

    /// Shell command the extract script pipes the payload through.
    #[must_use]
    pub const fn decoder_command(self) -> &'static str {
        match self {
            Self::OpenSsl => "openssl enc -base64 -d",
            Self::Uuencode => "uudecode -p",
        }
    }

    /// Encode `input` into `output`.
    ///
    /// # Errors
    ///
    /// Returns the tool's failure, [`ArchiveError::Io`] if the output cannot
    /// be written, or [`ArchiveError::MissingIntermediate`] if the encoder
    /// left no output behind.
    pub fn encode(
        self,
        executor: &dyn CommandExecutor,
        input: &Utf8Path,
        output: &Utf8Path,
    ) -> Result<()> {
        match self {
            Self::OpenSsl => {
                run_checked(
                    executor,
                    &Invocation::new(self.program())
                        .args(["enc", "-base64", "-in", input.as_str(), "-out", output.as_str()]),
                )?;
            }
            Self::Uuencode => {
                let name = input.file_name().unwrap_or(input.as_str());
                let result = run_checked(
                    executor,
                    &Invocation::new(self.program()).args(["-m", input.as_str(), name]),
                )?;
                std::fs::write(output, result.stdout)?;
            }
        }
        require_file(output)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

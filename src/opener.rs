/**
 * Opening files with the platform's default viewer or player
 */

use log::debug;
use std::path::PathBuf;
use std::process::Command;

use crate::error::{RenameError, Result};

pub trait Opener {
    fn open(&self, paths: &[PathBuf]) -> Result<()>;
}

fn launch(command: &mut Command, paths: &[PathBuf]) -> Result<()> {
    debug!("Launching {:?}", command);

    let status = command.status().map_err(|e| RenameError::OpenFailed {
        paths: paths.to_vec(),
        reason: e.to_string(),
    })?;

    if !status.success() {
        return Err(RenameError::OpenFailed {
            paths: paths.to_vec(),
            reason: format!("opener exited with {}", status),
        });
    }
    Ok(())
}

/// macOS `open`, which accepts every path in one call
#[derive(Debug, Clone, Default)]
pub struct MacOpener;

impl Opener for MacOpener {
    fn open(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        launch(Command::new("open").args(paths), paths)
    }
}

/// freedesktop `xdg-open`, one path per invocation
#[derive(Debug, Clone)]
pub struct XdgOpener {
    program: String,
}

impl Default for XdgOpener {
    fn default() -> Self {
        Self::new("xdg-open")
    }
}

impl XdgOpener {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Opener for XdgOpener {
    fn open(&self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            launch(Command::new(&self.program).arg(path), std::slice::from_ref(path))?;
        }
        Ok(())
    }
}

/// Windows shell association through `cmd /C start`
#[derive(Debug, Clone, Default)]
pub struct WindowsOpener;

impl Opener for WindowsOpener {
    fn open(&self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            // empty title argument, otherwise `start` treats a quoted path as the window title
            launch(
                Command::new("cmd").args(["/C", "start", ""]).arg(path),
                std::slice::from_ref(path),
            )?;
        }
        Ok(())
    }
}

/// Opener for the platform this binary was built for
pub fn platform_opener() -> Box<dyn Opener> {
    if cfg!(target_os = "macos") {
        Box::new(MacOpener)
    } else if cfg!(target_os = "windows") {
        Box::new(WindowsOpener)
    } else {
        Box::new(XdgOpener::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_reports_open_failed() {
        let opener = XdgOpener::new("definitely-not-an-opener");
        let paths = vec![PathBuf::from("/tmp/a.jpg")];
        match opener.open(&paths) {
            Err(RenameError::OpenFailed { paths: failed, .. }) => assert_eq!(failed, paths),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_nothing_to_open() {
        assert!(XdgOpener::new("definitely-not-an-opener").open(&[]).is_ok());
        assert!(MacOpener.open(&[]).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_exit_status() {
        let opener = XdgOpener::new("false");
        let err = opener.open(&[PathBuf::from("a.jpg")]).unwrap_err();
        assert!(err.to_string().starts_with("Failed to open 1 file(s)"));
    }
}

//! Options for opening sessions

use std::fmt;
use std::path::Path;

use dcf_sheets_core::Workbook;

use crate::error::{Error, Result};
use crate::io::{absolute, new_workbook_for, FileFormat, WorkbookExt};
use crate::mode::Mode;
use crate::session::Session;

/// What to do when a write-mode session targets a file that does not exist
///
/// Read and modify sessions never create files.
#[derive(Default)]
pub enum CreatePolicy {
    /// Fail with a not-found I/O error
    #[default]
    Never,
    /// Create an empty workbook
    Always,
    /// Create only if the callback confirms for this path
    Ask(Box<dyn Fn(&Path) -> bool>),
}

impl CreatePolicy {
    pub fn ask<F>(confirm: F) -> Self
    where
        F: Fn(&Path) -> bool + 'static,
    {
        CreatePolicy::Ask(Box::new(confirm))
    }
}

impl fmt::Debug for CreatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreatePolicy::Never => f.write_str("Never"),
            CreatePolicy::Always => f.write_str("Always"),
            CreatePolicy::Ask(_) => f.write_str("Ask(..)"),
        }
    }
}

/// Builder for opening a [`Session`]
///
/// ```no_run
/// use dcf_sheets::{CreatePolicy, Mode, OpenOptions};
///
/// let session = OpenOptions::new()
///     .create(CreatePolicy::Always)
///     .open("valuation.xlsx", Mode::Persistent)?;
/// # Ok::<(), dcf_sheets::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct OpenOptions {
    create: CreatePolicy,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy for missing files in write mode
    pub fn create(mut self, policy: CreatePolicy) -> Self {
        self.create = policy;
        self
    }

    /// Open `path` in `mode`
    pub fn open<P: AsRef<Path>>(&self, path: P, mode: Mode) -> Result<Session> {
        let path = absolute(path.as_ref());
        FileFormat::from_path(&path)?;

        let workbook = if path.exists() {
            Workbook::open(&path)?
        } else {
            self.create_missing(&path, mode)?
        };

        log::debug!("opened {} in {} mode", path.display(), mode);
        Ok(Session::from_parts(Some(path), mode, workbook))
    }

    /// Open `path`, run `body`, then close
    ///
    /// A write session is saved only when `body` returns `Ok`; on `Err` the
    /// edits are discarded and the error is returned.
    pub fn scope<P, T, F>(&self, path: P, mode: Mode, body: F) -> Result<T>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let mut session = self.open(path, mode)?;
        let outcome = body(&mut session);
        session.finish(outcome)
    }

    fn create_missing(&self, path: &Path, mode: Mode) -> Result<Workbook> {
        let not_found = || {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ))
        };

        if !mode.can_persist() {
            return Err(not_found());
        }
        let confirmed = match &self.create {
            CreatePolicy::Never => return Err(not_found()),
            CreatePolicy::Always => true,
            CreatePolicy::Ask(confirm) => confirm(path),
        };
        if !confirmed {
            return Err(Error::Declined(path.to_path_buf()));
        }

        let workbook = new_workbook_for(path)?;
        workbook.save(path)?;
        log::info!("created new workbook at {}", path.display());
        Ok(workbook)
    }
}

#[cfg(all(test, feature = "xlsx"))]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_missing_file_read_modes_never_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        let options = OpenOptions::new().create(CreatePolicy::Always);

        for mode in [Mode::ReadOnly, Mode::Mutable] {
            let err = options.open(&path, mode).unwrap_err();
            assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_write_mode_policies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xlsx");

        assert!(matches!(
            OpenOptions::new().open(&path, Mode::Persistent),
            Err(Error::Io(_))
        ));

        let asked = Rc::new(Cell::new(0));
        let counter = Rc::clone(&asked);
        let declined = OpenOptions::new().create(CreatePolicy::ask(move |_| {
            counter.set(counter.get() + 1);
            false
        }));
        assert!(matches!(
            declined.open(&path, Mode::Persistent),
            Err(Error::Declined(p)) if p.ends_with("model.xlsx")
        ));
        assert_eq!(asked.get(), 1);
        assert!(!path.exists());

        let session = OpenOptions::new()
            .create(CreatePolicy::ask(|_| true))
            .open(&path, Mode::Persistent)
            .unwrap();
        assert!(path.exists());
        assert_eq!(session.sheets(), vec!["Sheet1"]);
        session.close().unwrap();
    }

    #[test]
    fn test_unsupported_extension_checked_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ods");
        let err = OpenOptions::new()
            .create(CreatePolicy::Always)
            .open(&path, Mode::Persistent)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(!path.exists());
    }
}

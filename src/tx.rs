//! Functionality for working with transactions.

use crate::{internal::thread::SwTx, mem::TxMemory};
use core::fmt::{self, Debug, Formatter};
use hynorec_htm::HardwareTx;

#[derive(PartialEq, Eq)]
enum ErrorKind {
    Conflict,
    Retry,
}

/// Error type indicating that the current transaction attempt has failed.
///
/// Route it back to [`TxExecutor::run`] with `?`; the dispatcher clears the
/// transaction's state and retries. Aborts are control flow here, not
/// something to report.
///
/// [`TxExecutor::run`]: crate::TxExecutor::run
#[derive(PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    _private: (),
}

impl Debug for Error {
    #[cold]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.pad(match self.kind {
            ErrorKind::Conflict => "Error::CONFLICT",
            ErrorKind::Retry => "Error::RETRY",
        })
    }
}

impl Error {
    /// Error value requesting a retry of the current transaction.
    ///
    /// Returning `RETRY` from a transaction body restarts the whole
    /// attempt, hardware budget included. A body that returns it
    /// unconditionally will spin forever.
    pub const RETRY: Self = Error {
        kind: ErrorKind::Retry,
        _private: (),
    };

    pub(crate) const CONFLICT: Self = Error {
        kind: ErrorKind::Conflict,
        _private: (),
    };
}

/// A live transaction handle, passed to the body given to
/// [`TxExecutor::run`].
///
/// The same body runs on either path: on the hardware path reads and
/// writes go straight to shared memory under the bracket's tracking, on
/// the software path they go through the read and write sets.
///
/// Addresses index the runtime's shared memory; an out-of-range address
/// panics.
///
/// [`TxExecutor::run`]: crate::TxExecutor::run
#[derive(Debug)]
pub struct Tx<'tx> {
    mode: Mode<'tx>,
}

#[derive(Debug)]
enum Mode<'tx> {
    Hardware {
        mem: &'tx TxMemory,
        htx: &'tx HardwareTx,
    },
    Software(SwTx<'tx>),
}

impl<'tx> Tx<'tx> {
    #[inline]
    pub(crate) fn hardware(mem: &'tx TxMemory, htx: &'tx HardwareTx) -> Self {
        Tx {
            mode: Mode::Hardware { mem, htx },
        }
    }

    #[inline]
    pub(crate) fn software(sw: SwTx<'tx>) -> Self {
        Tx {
            mode: Mode::Software(sw),
        }
    }

    #[inline]
    pub(crate) fn into_software(self) -> SwTx<'tx> {
        match self.mode {
            Mode::Software(sw) => sw,
            Mode::Hardware { .. } => {
                unreachable!("hardware transactions commit inside the bracket")
            }
        }
    }

    /// Reads the word at `addr` within this transaction.
    #[inline]
    pub fn read(&mut self, addr: usize) -> Result<usize, Error> {
        match &mut self.mode {
            Mode::Hardware { mem, htx } => Ok(mem.read_htm(addr, htx)),
            Mode::Software(sw) => sw.read(addr),
        }
    }

    /// Writes `value` to the word at `addr` within this transaction.
    ///
    /// On the software path the write is buffered until commit; later
    /// reads of `addr` in this transaction see `value`.
    #[inline]
    pub fn write(&mut self, addr: usize, value: usize) -> Result<(), Error> {
        match &mut self.mode {
            Mode::Hardware { mem, htx } => {
                mem.write_htm(addr, value, htx);
                Ok(())
            }
            Mode::Software(sw) => sw.write(addr, value),
        }
    }
}

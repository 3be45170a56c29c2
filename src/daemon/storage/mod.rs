//!  Storage is organized through [ledger::DayLedgerStore].
//!  The basic idea is:
//!   - There is a directory with all the records, the application data directory.
//!   - Each local calendar day gets its own `<YYYY-MM-DD>.json` file mapping applications to
//!     seconds.
//!   - Files are always replaced as a whole, never appended to.

pub mod entities;
pub mod ledger;
pub mod rules;

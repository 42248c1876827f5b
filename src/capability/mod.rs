/*!
 * Capability Table
 * Read-only enumeration of the signals this platform actually has
 *
 * The table is sourced from the OS signal set; the rest of the crate never
 * fabricates a signal id.
 */

use crate::core::types::{SigId, SignalError, SignalResult};
use nix::sys::signal::Signal as OsSignal;

/// Lookup query accepted by name or number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigQuery<'a> {
    Name(&'a str),
    Number(i32),
}

impl<'a> From<&'a str> for SigQuery<'a> {
    fn from(name: &'a str) -> Self {
        SigQuery::Name(name)
    }
}

impl From<i32> for SigQuery<'_> {
    fn from(number: i32) -> Self {
        SigQuery::Number(number)
    }
}

impl From<SigId> for SigQuery<'_> {
    fn from(id: SigId) -> Self {
        SigQuery::Number(id.number())
    }
}

// Classification sets; filtered against the platform table at lookup time.
const TERMINATING_BY_DEFAULT: &[&str] = &[
    "SIGHUP", "SIGINT", "SIGQUIT", "SIGILL", "SIGABRT", "SIGFPE", "SIGSEGV", "SIGPIPE", "SIGALRM",
    "SIGTERM", "SIGXCPU", "SIGXFSZ", "SIGVTALRM", "SIGPROF", "SIGUSR1", "SIGUSR2",
];
const SUSPENDING_BY_DEFAULT: &[&str] = &["SIGSTOP", "SIGTSTP", "SIGTTIN", "SIGTTOU"];
const TERMINAL_RELATED: &[&str] = &["SIGHUP", "SIGINT", "SIGTSTP", "SIGTTIN", "SIGTTOU", "SIGWINCH"];

/// Every signal id the platform knows about
pub fn all() -> impl Iterator<Item = SigId> {
    OsSignal::iterator().map(|s| SigId::from_raw(s as i32))
}

/// Check if a signal exists on this system by name or number
pub fn exists<'a, Q: Into<SigQuery<'a>>>(query: Q) -> bool {
    resolve(query).is_ok()
}

/// Resolve a name or number to a signal id
pub fn resolve<'a, Q: Into<SigQuery<'a>>>(query: Q) -> SignalResult<SigId> {
    match query.into() {
        SigQuery::Name(name) => OsSignal::iterator()
            .find(|s| s.as_str() == name)
            .map(|s| SigId::from_raw(s as i32))
            .ok_or_else(|| SignalError::UnknownSignal(name.to_string())),
        SigQuery::Number(number) => OsSignal::try_from(number)
            .map(|s| SigId::from_raw(s as i32))
            .map_err(|_| SignalError::UnknownSignal(number.to_string())),
    }
}

/// Canonical name for an id, if the platform has it
pub fn name_of(id: SigId) -> Option<&'static str> {
    OsSignal::try_from(id.number()).ok().map(|s| s.as_str())
}

/// Check if the platform allows intercepting or blocking this signal
pub fn can_catch(id: SigId) -> bool {
    match OsSignal::try_from(id.number()) {
        Ok(OsSignal::SIGKILL) | Ok(OsSignal::SIGSTOP) => false,
        Ok(_) => true,
        Err(_) => false,
    }
}

/// Fail with `UnknownSignal` unless the id is in the table
pub(crate) fn ensure_known(id: SigId) -> SignalResult<()> {
    if OsSignal::try_from(id.number()).is_ok() {
        Ok(())
    } else {
        Err(SignalError::UnknownSignal(id.number().to_string()))
    }
}

/// Signals whose default action terminates the process
pub fn terminating_by_default() -> Vec<SigId> {
    lookup_set(TERMINATING_BY_DEFAULT)
}

/// Signals whose default action suspends the process
pub fn suspending_by_default() -> Vec<SigId> {
    lookup_set(SUSPENDING_BY_DEFAULT)
}

/// Signals tied to the controlling terminal
pub fn terminal_related() -> Vec<SigId> {
    lookup_set(TERMINAL_RELATED)
}

fn lookup_set(names: &[&str]) -> Vec<SigId> {
    names.iter().filter_map(|name| resolve(*name).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_name_and_number() {
        let by_name = resolve("SIGTERM").unwrap();
        let by_number = resolve(by_name.number()).unwrap();
        assert_eq!(by_name, by_number);
        assert_eq!(by_name.name(), "SIGTERM");
    }

    #[test]
    fn test_unknown_signal() {
        assert!(matches!(
            resolve("SIGBOGUS"),
            Err(SignalError::UnknownSignal(_))
        ));
        assert!(matches!(resolve(0), Err(SignalError::UnknownSignal(_))));
        assert!(!exists("SIGBOGUS"));
        assert!(exists("SIGINT"));
    }

    #[test]
    fn test_catchability() {
        assert!(!can_catch(resolve("SIGKILL").unwrap()));
        assert!(!can_catch(resolve("SIGSTOP").unwrap()));
        assert!(can_catch(resolve("SIGTERM").unwrap()));
        assert!(can_catch(resolve("SIGUSR1").unwrap()));
    }

    #[test]
    fn test_classification_sets() {
        let terminating = terminating_by_default();
        assert!(terminating.contains(&resolve("SIGTERM").unwrap()));
        assert!(!terminating.contains(&resolve("SIGCHLD").unwrap()));

        let suspending = suspending_by_default();
        assert!(suspending.contains(&resolve("SIGTSTP").unwrap()));

        let terminal = terminal_related();
        assert!(terminal.contains(&resolve("SIGINT").unwrap()));
    }

    #[test]
    fn test_table_is_nonempty_and_consistent() {
        for id in all() {
            assert!(exists(id.number()));
            assert!(name_of(id).is_some());
        }
    }
}

use std::fmt;

/// Severity attached to every [`LogRec`](crate::LogRec).
///
/// Targets filter on levels by identity, not by ordering: the audit levels sit
/// outside the usual `trace..panic` scale and are only delivered to targets
/// that list them explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Level {
    pub id: i32,
    pub name: &'static str,
}

impl Level {
    pub const PANIC: Level = Level { id: 0, name: "panic" };
    pub const FATAL: Level = Level { id: 1, name: "fatal" };
    pub const ERROR: Level = Level { id: 2, name: "error" };
    pub const WARN: Level = Level { id: 3, name: "warn" };
    pub const INFO: Level = Level { id: 4, name: "info" };
    pub const DEBUG: Level = Level { id: 5, name: "debug" };
    pub const TRACE: Level = Level { id: 6, name: "trace" };

    /// API calls (who called which endpoint, with what result).
    pub const AUDIT_API: Level = Level { id: 100, name: "audit-api" };
    /// Content changes (create / update / delete of user data).
    pub const AUDIT_CONTENT: Level = Level { id: 101, name: "audit-content" };
    /// Permission and role changes.
    pub const AUDIT_PERMS: Level = Level { id: 102, name: "audit-perms" };
    /// Administrative command-line actions.
    pub const AUDIT_CLI: Level = Level { id: 103, name: "audit-cli" };

    /// Every level known to the engine, in id order.
    pub const ALL: [Level; 11] = [
        Level::PANIC,
        Level::FATAL,
        Level::ERROR,
        Level::WARN,
        Level::INFO,
        Level::DEBUG,
        Level::TRACE,
        Level::AUDIT_API,
        Level::AUDIT_CONTENT,
        Level::AUDIT_PERMS,
        Level::AUDIT_CLI,
    ];

    /// The four audit levels.
    pub const AUDIT: [Level; 4] = [
        Level::AUDIT_API,
        Level::AUDIT_CONTENT,
        Level::AUDIT_PERMS,
        Level::AUDIT_CLI,
    ];

    /// Look up a known level by name, ignoring ASCII case and surrounding
    /// whitespace.
    pub fn from_name(name: &str) -> Option<Level> {
        let name = name.trim();
        Self::ALL
            .iter()
            .find(|lvl| lvl.name.eq_ignore_ascii_case(name))
            .copied()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

//! Solver-safe identifiers for domain attribute names.
//!
//! Attribute names such as `[AMPA]` or `AMPA.O-ML` contain characters that are
//! not legal in formula identifiers. [`adapt`] maps them to a safe form:
//!
//! - every `-` and `.` is stripped
//! - `[AMPA]` → `cAMPA`, `[T]` → `cT` (concentration brackets)
//!
//! The mapping is total and idempotent on its own output.

/// Fixed renames applied after character stripping.
const RENAMES: [(&str, &str); 2] = [("[AMPA]", "cAMPA"), ("[T]", "cT")];

/// Map a domain attribute name to a solver-safe identifier.
pub fn adapt(name: &str) -> String {
    let stripped: String = name.chars().filter(|c| !matches!(c, '-' | '.')).collect();
    match RENAMES.iter().find(|(from, _)| *from == stripped) {
        Some((_, to)) => to.to_string(),
        None => stripped,
    }
}

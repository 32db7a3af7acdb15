//! Question target resolution.

use serde::{Deserialize, Serialize};

use crate::domain::NoTargetAgentError;

/// A question waiting for its single answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuestion {
    /// Name of the participant that asked.
    pub asker: String,
    pub text: String,
}

/// Index of the participant that should answer a question from `asker`.
///
/// An explicit target must match a participant name exactly. Without one
/// the next participant in rotation order answers. Nobody answers their own
/// question.
pub fn resolve_target(
    asker: usize,
    target: Option<&str>,
    names: &[&str],
) -> Result<usize, NoTargetAgentError> {
    let asker_name = names.get(asker).copied().unwrap_or_default();
    let no_target = |target: &str| NoTargetAgentError {
        asker: asker_name.to_string(),
        target: target.to_string(),
    };

    let index = match target {
        Some(name) => names
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| no_target(name))?,
        None if names.is_empty() => return Err(no_target("")),
        None => (asker + 1) % names.len(),
    };

    if index == asker {
        return Err(no_target(target.unwrap_or(asker_name)));
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR: [&str; 2] = ["driver", "navigator"];
    const TRIO: [&str; 3] = ["planner", "coder", "reviewer"];

    #[test]
    fn default_target_is_next_in_rotation() {
        assert_eq!(resolve_target(0, None, &PAIR), Ok(1));
        assert_eq!(resolve_target(1, None, &PAIR), Ok(0));
        assert_eq!(resolve_target(2, None, &TRIO), Ok(0));
    }

    #[test]
    fn explicit_target_matches_exact_name() {
        assert_eq!(resolve_target(0, Some("reviewer"), &TRIO), Ok(2));
        let err = resolve_target(0, Some("Reviewer"), &TRIO).unwrap_err();
        assert_eq!(err.target, "Reviewer");
        assert_eq!(err.asker, "planner");
    }

    #[test]
    fn asking_yourself_has_no_target() {
        assert!(resolve_target(1, Some("coder"), &TRIO).is_err());
        assert!(resolve_target(0, None, &["solo"]).is_err());
    }
}

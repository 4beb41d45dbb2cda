//! Which projects may be staffed.

use staffline_core::Project;

/// Whether an automatic cycle may staff this project.
///
/// True iff the project is ready, not yet connected, and not handled by hand.
pub fn is_eligible(project: &Project) -> bool {
    project.ready_to_assign && !project.connected && !project.manual_override
}

/// Whether a manual single-project request may staff this project.
///
/// An explicit operator request ignores the ready flag and the manual override.
pub fn accepts_manual(project: &Project) -> bool {
    !project.connected
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffline_core::ProjectId;

    fn project(ready: bool, connected: bool, manual_override: bool) -> Project {
        let mut p = Project::new(ProjectId::from_number(1).unwrap(), "Science");
        p.ready_to_assign = ready;
        p.connected = connected;
        p.manual_override = manual_override;
        p
    }

    #[test]
    fn test_eligibility_truth_table() {
        for ready in [false, true] {
            for connected in [false, true] {
                for manual_override in [false, true] {
                    let expected = ready && !connected && !manual_override;
                    assert_eq!(
                        is_eligible(&project(ready, connected, manual_override)),
                        expected,
                        "ready={ready} connected={connected} override={manual_override}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_manual_requests_only_need_unconnected() {
        assert!(accepts_manual(&project(false, false, true)));
        assert!(!accepts_manual(&project(true, true, false)));
    }
}

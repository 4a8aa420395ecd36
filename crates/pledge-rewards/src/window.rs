use pledge_types::{Milestone, VoteWindow};

/// Resolve a milestone's voting-eligibility window.
///
/// The window opens at the review-opened time if present, else the due time,
/// else the completion time, and runs for `cutoff_secs`. A milestone that
/// was never completed has no window, and a degenerate `end <= start`
/// result is treated the same way.
pub fn resolve_window(milestone: &Milestone, cutoff_secs: u64) -> Option<VoteWindow> {
    milestone.completed_at?;

    let start = milestone
        .review_opened_at
        .or(milestone.due_at)
        .or(milestone.completed_at)?;

    let end = start.checked_add(i64::try_from(cutoff_secs).ok()?)?;
    if end <= start {
        return None;
    }

    Some(VoteWindow {
        start_unix: start,
        end_unix: end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pledge_types::{CommitmentId, MilestoneId, MilestoneKind};

    fn milestone(
        completed_at: Option<i64>,
        review_opened_at: Option<i64>,
        due_at: Option<i64>,
    ) -> Milestone {
        Milestone {
            id: MilestoneId::new("ms_1").unwrap(),
            commitment_id: CommitmentId::new("cmt_1").unwrap(),
            kind: MilestoneKind::Standard,
            completed_at,
            review_opened_at,
            due_at,
        }
    }

    #[test]
    fn test_review_time_takes_precedence() {
        let m = milestone(Some(100), Some(500), Some(300));
        let window = resolve_window(&m, 60).unwrap();
        assert_eq!(window.start_unix, 500);
        assert_eq!(window.end_unix, 560);
    }

    #[test]
    fn test_due_time_used_when_no_review() {
        let m = milestone(Some(100), None, Some(300));
        let window = resolve_window(&m, 60).unwrap();
        assert_eq!(window.start_unix, 300);
        assert_eq!(window.end_unix, 360);
    }

    #[test]
    fn test_completion_time_is_last_resort() {
        let m = milestone(Some(100), None, None);
        let window = resolve_window(&m, 60).unwrap();
        assert_eq!(window.start_unix, 100);
        assert_eq!(window.end_unix, 160);
    }

    #[test]
    fn test_unfinished_milestone_has_no_window() {
        let m = milestone(None, Some(500), Some(300));
        assert!(resolve_window(&m, 60).is_none());
    }

    #[test]
    fn test_degenerate_window_is_none() {
        let m = milestone(Some(100), None, None);
        assert!(resolve_window(&m, 0).is_none());
    }

    #[test]
    fn test_closure_boundary() {
        let m = milestone(Some(100), None, None);
        let window = resolve_window(&m, 60).unwrap();
        assert!(window.is_closed(160));
        assert!(!window.is_closed(159));
    }
}

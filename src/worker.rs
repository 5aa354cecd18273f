use crossbeam_channel::Sender;

use crate::env::TargetEnv;
use crate::model::{CleanLine, StatusMessage, WorkerId};
use crate::parser::parse_assignment;

/// Per-worker tallies, summed by the coordinator into the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ChunkOutcome {
    pub loaded: usize,
    pub failed: usize,
    pub skipped_existing: usize,
}

/// Apply one chunk of clean lines to `target`, in order.
///
/// Lines that are not assignments are skipped silently. Every rejected
/// assignment is reported on `messages`, and a single
/// [`StatusMessage::Complete`] is always sent last.
pub(crate) fn apply_chunk(
    worker: WorkerId,
    lines: &[CleanLine],
    target: &TargetEnv,
    override_existing: bool,
    messages: &Sender<StatusMessage>,
) -> ChunkOutcome {
    log::debug!("{worker}: applying {} lines", lines.len());
    let mut outcome = ChunkOutcome::default();

    for clean in lines {
        let Some((key, value)) = parse_assignment(&clean.text) else {
            log::trace!("{worker}: skipping line {} without assignment", clean.line);
            continue;
        };

        if !override_existing && target.contains_key(key) {
            log::trace!("{worker}: skipping existing key {key}");
            outcome.skipped_existing += 1;
            continue;
        }

        match target.set_var(key, value) {
            Ok(()) => {
                log::trace!("{worker}: set {key} from line {}", clean.line);
                outcome.loaded += 1;
            }
            Err(error) => {
                log::warn!("{worker}: line {}: {error}", clean.line);
                outcome.failed += 1;
                // The receiver outlives every worker, so send cannot fail.
                let _ = messages.send(StatusMessage::ApplyFailed { worker, error });
            }
        }
    }

    let _ = messages.send(StatusMessage::Complete {
        worker,
        loaded: outcome.loaded,
        failed: outcome.failed,
    });
    outcome
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crossbeam_channel::unbounded;

    use super::*;
    use crate::error::SetVarErrorKind;
    use crate::parser::filter_lines;

    #[test]
    fn applies_lines_in_order_and_completes_once() {
        let lines = filter_lines("A=1\nB=\"two\"\nA=3\n");
        let target = TargetEnv::memory();
        let (tx, rx) = unbounded();

        let outcome = apply_chunk(WorkerId::new(1), &lines, &target, true, &tx);
        drop(tx);

        assert_eq!(outcome.loaded, 3);
        assert_eq!(outcome.failed, 0);
        let map = target.into_memory().expect("memory target");
        assert_eq!(map.get("A").map(String::as_str), Some("3"));
        assert_eq!(map.get("B").map(String::as_str), Some("two"));

        let messages: Vec<_> = rx.iter().collect();
        assert_eq!(
            messages,
            vec![StatusMessage::Complete {
                worker: WorkerId::new(1),
                loaded: 3,
                failed: 0,
            }]
        );
    }

    #[test]
    fn reports_failures_before_completion() {
        let lines = filter_lines("OK=1\nBAD\0KEY=2\nALSO_OK=3\nNUL=a\0b\n");
        let target = TargetEnv::memory();
        let (tx, rx) = unbounded();

        let outcome = apply_chunk(WorkerId::new(4), &lines, &target, true, &tx);
        drop(tx);

        assert_eq!(outcome.loaded, 2);
        assert_eq!(outcome.failed, 2);

        let messages: Vec<_> = rx.iter().collect();
        assert_eq!(messages.len(), 3);
        match &messages[0] {
            StatusMessage::ApplyFailed { worker, error } => {
                assert_eq!(*worker, WorkerId::new(4));
                assert_eq!(error.key, "BAD\0KEY");
                assert_eq!(error.kind, SetVarErrorKind::KeyContainsNul);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        match &messages[1] {
            StatusMessage::ApplyFailed { error, .. } => {
                assert_eq!(error.key, "NUL");
                assert_eq!(error.kind, SetVarErrorKind::ValueContainsNul);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(messages[2].is_complete());
    }

    #[test]
    fn completes_even_when_every_line_fails() {
        let lines = filter_lines("A\0=1\nB\0=2\n");
        let target = TargetEnv::memory();
        let (tx, rx) = unbounded();

        apply_chunk(WorkerId::new(2), &lines, &target, true, &tx);
        drop(tx);

        let messages: Vec<_> = rx.iter().collect();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages.iter().filter(|msg| msg.is_complete()).count(), 1);
        assert!(messages[2].is_complete());
    }

    #[test]
    fn skips_malformed_lines_silently() {
        let lines = filter_lines("INVALIDLINE\n=novalue\nGOOD=yes\n");
        let target = TargetEnv::memory();
        let (tx, rx) = unbounded();

        let outcome = apply_chunk(WorkerId::new(1), &lines, &target, true, &tx);
        drop(tx);

        assert_eq!(outcome.loaded, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(rx.iter().count(), 1);
        let map = target.into_memory().expect("memory target");
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key("INVALIDLINE"));
    }

    #[test]
    fn keeps_existing_values_without_override() {
        let mut initial = BTreeMap::new();
        initial.insert("A".to_string(), "existing".to_string());
        let target = TargetEnv::from_memory(initial);
        let lines = filter_lines("A=new\nB=new\n");
        let (tx, _rx) = unbounded();

        let outcome = apply_chunk(WorkerId::new(1), &lines, &target, false, &tx);

        assert_eq!(outcome.loaded, 1);
        assert_eq!(outcome.skipped_existing, 1);
        let map = target.into_memory().expect("memory target");
        assert_eq!(map.get("A").map(String::as_str), Some("existing"));
        assert_eq!(map.get("B").map(String::as_str), Some("new"));
    }
}

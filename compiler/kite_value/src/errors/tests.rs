use super::*;
use pretty_assertions::assert_eq;

#[test]
fn index_out_of_range_has_correct_kind() {
    let err = index_out_of_range(5, 3);
    assert_eq!(err.kind, EvalErrorKind::IndexOutOfRange { index: 5, len: 3 });
    assert_eq!(err.message, "index 5 out of range (len 3)");
}

#[test]
fn argument_count_mismatch_pluralizes() {
    assert_eq!(
        argument_count_mismatch(1, 2).message,
        "function wants 1 argument but received 2"
    );
    assert_eq!(
        argument_count_mismatch(3, 0).message,
        "function wants 3 arguments but received 0"
    );
}

#[test]
fn display_prefixes_position() {
    let err = undefined_symbol("x").tag(Position::new(2, 7));
    assert_eq!(err.to_string(), "2:7: undefined symbol 'x'");
}

#[test]
fn display_without_position_is_message() {
    assert_eq!(thrown("boom").to_string(), "boom");
}

#[test]
fn tag_keeps_innermost_position() {
    let err = invalid_operation("bad")
        .tag(Position::new(3, 1))
        .tag(Position::new(1, 1));
    assert_eq!(err.pos, Some(Position::new(3, 1)));
}

#[test]
fn tag_ignores_unknown_position() {
    let err = invalid_operation("bad").tag(Position::UNKNOWN);
    assert_eq!(err.pos, None);
    let err = err.tag(Position::new(4, 4));
    assert_eq!(err.pos, Some(Position::new(4, 4)));
}

#[test]
fn interrupted_is_detected() {
    assert!(interrupted(InterruptReason::Cancelled).is_interrupted());
    assert!(!thrown("x").is_interrupted());
    let action: ControlAction = interrupted(InterruptReason::StepBudget).into();
    assert!(action.is_interrupted());
    assert!(!ControlAction::Break.is_interrupted());
}

#[test]
fn control_action_tag_only_touches_errors() {
    let tagged = ControlAction::from(thrown("x")).tag(Position::new(9, 9));
    match tagged {
        ControlAction::Error(e) => assert_eq!(e.pos, Some(Position::new(9, 9))),
        other => panic!("expected error, got {other:?}"),
    }
    assert!(matches!(
        ControlAction::Continue.tag(Position::new(1, 1)),
        ControlAction::Continue
    ));
}

#[test]
fn type_conversion_failure_names_both_types() {
    let err = type_conversion_failure("string", "int");
    assert_eq!(
        err.kind,
        EvalErrorKind::TypeConversionFailure {
            from: "string".into(),
            to: "int".into()
        }
    );
}

mod common;

use common::{depth, run, run_fresh, session, top, tuple};
use stackline::runtime::{
    data_structures::value::Value,
    interpreter::{CommandResult, ExecutionManagement, TupleManagement},
};
use test_case::test_case;

#[test_case("-true", "", "A"; "true runs then")]
#[test_case("-false", "", "B"; "false runs else")]
#[test_case("-true", "-!", "B"; "inverted true runs else")]
#[test_case("-false", "-!", "A"; "inverted false runs then")]
fn if_runs_exactly_one_branch(assign: &str, invert: &str, expected: &str) {
    let source = format!(
        "tuple {} @x\nIF {} @x THEN $[ put A ]$ ELSE $[ put B ]$",
        assign, invert
    );
    let (session, result) = run_fresh(&source);

    assert_eq!(result, CommandResult::Success);
    assert_eq!(depth(&session), 1);
    assert_eq!(top(&session), Some(Value::from(expected)));
}

#[test]
fn if_without_else_and_the_rest_of_the_line() {
    let (session, result) = run_fresh(
        "tuple -false @x\n\
         IF @x THEN $[ put skipped ]$ put after\n\
         IF -! @x THEN $[ put ran ]$ put last",
    );

    assert!(result.is_success());
    assert_eq!(depth(&session), 3);
    assert_eq!(top(&session), Some(Value::from("last")));
}

#[test]
fn if_needs_a_boolean() {
    let (session, result) = run_fresh("tuple -assign @x 1\nIF @x THEN $[ put A ]$");

    assert_eq!(result, CommandResult::Failure);
    assert_eq!(depth(&session), 0);
}

#[test]
fn pop_condition_while_runs_until_false() {
    let (session, result) = run_fresh(
        "tuple -assign @n 0\n\
         put @true\n\
         WHILE ~ $[ eval -to @n + @n 1 eval -to ~ < @n 3 ]$",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "n"), Some(Value::Int(3)));
    assert_eq!(depth(&session), 0);
    assert_eq!(session.frames().depth(), 0);
}

#[test_case(0; "no iterations")]
#[test_case(1; "one iteration")]
#[test_case(5; "five iterations")]
fn while_leaves_no_frames_behind(count: i64) {
    let source = format!(
        "tuple -assign @n 0\n\
         eval -to @go < @n {count}\n\
         WHILE @go $[ eval -to @n + @n 1 eval -to @go < @n {count} ]$"
    );
    let (session, result) = run_fresh(&source);

    assert!(result.is_success());
    assert_eq!(tuple(&session, "n"), Some(Value::Int(count)));
    assert_eq!(session.frames().depth(), 0);
}

#[test]
fn break_leaves_only_the_innermost_loop() {
    let (session, result) = run_fresh(
        "tuple -assign @i 0\n\
         tuple -assign @count 0\n\
         DO @i to 3 $[ tuple -assign @j 0 DO @j to 10 $[ eval -to @count + @count 1 BREAK ]$ ]$",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "count"), Some(Value::Int(3)));
    assert_eq!(session.frames().depth(), 0);
    assert!(session.frames().pending().is_none());
}

#[test]
fn break_from_inside_an_if() {
    let (session, result) = run_fresh(
        "tuple -assign @n 0\n\
         WHILE @true $[ eval -to @n + @n 1 eval -to @done == @n 4 IF @done THEN $[ BREAK ]$ ]$",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "n"), Some(Value::Int(4)));
    assert_eq!(session.frames().depth(), 0);
}

#[test]
fn continue_skips_the_rest_of_the_body() {
    let (session, result) = run_fresh(
        "tuple -assign @i 0\n\
         tuple -assign @odd 0\n\
         DO @i to 6 $[ eval -to @r % @i 2 eval -to @even == @r 0 \
            IF @even THEN $[ CONTINUE ]$ eval -to @odd + @odd 1 ]$",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "odd"), Some(Value::Int(3)));
}

#[test_case("BREAK"; "break")]
#[test_case("CONTINUE"; "continue")]
#[test_case("RETURN"; "return")]
fn unwinding_outside_its_construct_fails(command: &str) {
    let (mut session, _) = session();

    assert_eq!(run(&mut session, command), CommandResult::Failure);
    assert_eq!(tuple(&session, "?"), Some(Value::Bool(false)));
    assert!(session.frames().pending().is_none());

    assert!(run(&mut session, "put next").is_success());
    assert_eq!(top(&session), Some(Value::from("next")));
}

#[test]
fn return_leaves_the_function_early() {
    let (session, result) = run_fresh(
        "FUNC early ( ) $[ put first RETURN put second ]$\n\
         early ( )",
    );

    assert!(result.is_success());
    assert_eq!(depth(&session), 1);
    assert_eq!(top(&session), Some(Value::from("first")));
}

#[test]
fn return_passes_through_loops() {
    let (session, result) = run_fresh(
        "FUNC find ( ) $[ tuple -assign @k 0 DO @k to 10 $[ eval -to @hit == @k 4 \
            IF @hit THEN $[ RETURN ]$ ]$ put never ]$\n\
         find ( )",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "k"), Some(Value::Int(4)));
    assert_eq!(depth(&session), 0);
    assert_eq!(session.frames().depth(), 0);
    assert!(session.frames().pending().is_none());
}

#[test_case("", "3", Value::Int(2), 3; "counts up")]
#[test_case("-undo", "0", Value::Int(1), 3; "counts down")]
#[test_case("", "0", Value::Int(0), 0; "empty range")]
fn do_counts_the_iterator(undo: &str, limit: &str, last: Value, runs: usize) {
    let start = if undo.is_empty() { 0 } else { 3 };
    let source = format!(
        "tuple -assign @i {start}\n\
         DO {undo} @i to {limit} $[ put @i ]$"
    );
    let (session, result) = run_fresh(&source);

    assert!(result.is_success());
    assert_eq!(depth(&session), runs);

    if runs > 0 {
        assert_eq!(top(&session), Some(last));
    }
}

#[test]
fn for_visits_each_word() {
    let (session, result) = run_fresh(
        "tuple -assign @words ${ a b c }$\n\
         FOR @w in @words $[ put @w ]$",
    );

    assert!(result.is_success());
    assert_eq!(depth(&session), 3);
    assert_eq!(top(&session), Some(Value::from("c")));
    assert_eq!(tuple(&session, "w"), Some(Value::from("c")));
}

#[test]
fn for_requires_in() {
    let (_, result) = run_fresh("tuple -assign @words a\nFOR @w @words $[ put @w ]$");

    assert_eq!(result, CommandResult::Failure);
}

#[test_case("a", "one"; "first case")]
#[test_case("b", "two"; "second case")]
#[test_case("z", "other"; "default")]
fn switch_picks_one_block(selector: &str, expected: &str) {
    let source = format!(
        "tuple -assign @s {selector}\n\
         SWITCH @s -case a $[ put one ]$ -case b $[ put two ]$ -default $[ put other ]$ put done"
    );
    let (session, result) = run_fresh(&source);

    assert!(result.is_success());
    assert_eq!(depth(&session), 2);
    assert_eq!(
        session.tuples().peek(1).map(|t| t.borrow().value().clone()),
        Some(Value::from(expected))
    );
}

#[test]
fn switch_without_a_match_or_default_does_nothing() {
    let (session, result) = run_fresh("SWITCH x -case a $[ put one ]$");

    assert!(result.is_success());
    assert_eq!(depth(&session), 0);
}

#[test]
fn try_catches_failures() {
    let (session, result) = run_fresh("TRY $[ THROW oops ]$ CATCH $[ put caught ]$");

    assert!(result.is_success());
    assert_eq!(top(&session), Some(Value::from("caught")));

    let (session, result) = run_fresh("TRY $[ put fine ]$ CATCH $[ put caught ]$");

    assert!(result.is_success());
    assert_eq!(depth(&session), 1);
    assert_eq!(top(&session), Some(Value::from("fine")));
}

#[test]
fn try_without_catch_keeps_the_failure() {
    let (_, result) = run_fresh("TRY $[ THROW ${ went wrong }$ ]$");

    assert_eq!(result, CommandResult::Failure);
}

#[test]
fn failed_line_stops_the_source() {
    let (session, result) = run_fresh("put a\nnot-a-command\nput b");

    assert_eq!(result, CommandResult::Failure);
    assert_eq!(depth(&session), 1);
}

#[test]
fn bye_ends_the_session() {
    let (session, result) = run_fresh("put a\nbye put b\nput c");

    assert!(result.is_success());
    assert!(session.is_goodbye());
    assert_eq!(depth(&session), 1);
}

#[test]
fn comments_are_discarded() {
    let (mut session, buffer) = session();

    assert!(run(&mut session, "\\\\ ${ not shown }$ put after # trailing comment").is_success());
    assert!(run(&mut session, "\\\\ -to STD: ${ shown }$").is_success());

    assert_eq!(depth(&session), 1);
    assert_eq!(top(&session), Some(Value::from("after")));
    assert_eq!(buffer.text(), "shown\n");
}

#[test_case("IF @true THEN $[ put A ]$ ELSE"; "else without a block")]
#[test_case("IF @false THEN"; "then without a block")]
#[test_case("IF @true THEN"; "true then without a block")]
fn if_without_its_blocks_fails(source: &str) {
    let (mut session, _) = session();

    assert_eq!(run(&mut session, source), CommandResult::Failure);
    assert_eq!(session.frames().depth(), 0);

    assert!(run(&mut session, "lifo -clear IF @true THEN $[ put ok ]$").is_success());
    assert_eq!(top(&session), Some(Value::from("ok")));
}

#[test]
fn while_on_a_missing_tuple_fails() {
    let (mut session, _) = session();

    assert_eq!(run(&mut session, "WHILE @missing $[ put x ]$"), CommandResult::Failure);
    assert_eq!(session.frames().depth(), 0);
    assert_eq!(depth(&session), 0);

    assert!(run(&mut session, "put after").is_success());
}

#[test_case("tuple -assign @x true", true; "text true")]
#[test_case("tuple -assign @x false", true; "text false")]
#[test_case("tuple -assign @x ${ True }$", false; "other capitalization")]
#[test_case("tuple -assign @x 0", false; "number")]
fn conditions_take_booleans_or_their_text(setup: &str, accepted: bool) {
    let (_, result) = run_fresh(&format!("{}\nIF @x THEN $[ put A ]$", setup));

    assert_eq!(result.is_success(), accepted);
}

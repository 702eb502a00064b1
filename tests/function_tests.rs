mod common;

use common::{depth, run, run_fresh, session, stack_values, top, tuple};
use stackline::runtime::{
    data_structures::value::Value,
    interpreter::{
        CommandManagement, CommandResult, ExecutionManagement, FunctionManagement, TupleManagement,
    },
};
use test_case::test_case;

const ADD: &str = "FUNC add ( a b ) $[ eval + @@a @@b ]$";

#[test]
fn named_functions_take_their_arguments() {
    let (session, result) = run_fresh(&format!("{}\nadd ( 2 3 )", ADD));

    assert!(result.is_success());
    assert_eq!(depth(&session), 1);
    assert_eq!(top(&session), Some(Value::Int(5)));
}

#[test_case("add ( 1 )"; "too few")]
#[test_case("add ( 1 2 3 )"; "too many")]
#[test_case("add 1 2"; "no parameter list")]
#[test_case("add ( 1 2"; "unclosed parameter list")]
fn bad_calls_fail(call: &str) {
    let (session, result) = run_fresh(&format!("{}\n{}", ADD, call));

    assert_eq!(result, CommandResult::Failure);
    assert_eq!(depth(&session), 0);
    assert_eq!(session.frames().depth(), 0);
}

#[test]
fn tuple_arguments_are_passed_by_name() {
    let (session, result) = run_fresh(
        "FUNC bump ( t ) $[ eval -to @@t + @@t 1 ]$\n\
         tuple -assign @x 1\n\
         bump ( @x ) bump ( @x )",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "x"), Some(Value::Int(3)));
}

#[test]
fn missing_tuple_arguments_are_created() {
    let (session, result) = run_fresh(
        "FUNC init ( t ) $[ tuple -assign @@t ready ]$\n\
         init ( @fresh )",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "fresh"), Some(Value::from("ready")));
}

#[test]
fn quoted_and_popped_arguments() {
    let (session, result) = run_fresh(
        "FUNC echo ( v ) $[ put @@v ]$\n\
         echo ( ${ two words }$ )\n\
         put popped echo ( ~ )",
    );

    assert!(result.is_success());
    assert_eq!(depth(&session), 2);
    assert_eq!(top(&session), Some(Value::from("popped")));
    assert_eq!(
        session
            .tuples()
            .peek(1)
            .map(|tuple| tuple.borrow().value().clone()),
        Some(Value::from("two words"))
    );
}

#[test]
fn locals_vanish_when_the_function_returns() {
    let (mut session, _) = session();

    let result = run(
        &mut session,
        "tuple -assign @tmp outer\n\
         FUNC scoped ( ) $[ LOCAL @tmp ${ inner }$ put @tmp tuple -assign @tmp changed ]$\n\
         scoped ( )",
    );

    assert!(result.is_success());
    assert_eq!(top(&session), Some(Value::from("inner")));
    assert_eq!(tuple(&session, "tmp"), Some(Value::from("outer")));
    assert!(!session.tuples().has_local_context());
}

#[test]
fn local_outside_a_function_fails() {
    let (session, result) = run_fresh("LOCAL @tmp");

    assert_eq!(result, CommandResult::Failure);
    assert_eq!(tuple(&session, "tmp"), None);
}

#[test]
fn failure_inside_a_function_releases_its_context() {
    let (session, result) = run_fresh(
        "FUNC broken ( ) $[ LOCAL @tmp frobnicate ]$\n\
         broken ( )",
    );

    assert_eq!(result, CommandResult::Failure);
    assert!(!session.tuples().has_local_context());
    assert_eq!(session.frames().depth(), 0);
    assert!(session.call_stack().is_empty());
}

#[test]
fn anonymous_functions() {
    let (session, result) = run_fresh(
        "FUN -to @square ( v ) $[ eval * @@v @@v ]$\n\
         CALL @square ( 7 )\n\
         @square ( 4 )\n\
         defun sq @square\n\
         sq ( 3 )",
    );

    assert!(result.is_success());

    assert_eq!(stack_values(&session), vec![Value::Int(49), Value::Int(16), Value::Int(9)]);
    assert!(session.functions().lookup("sq").is_some());
}

#[test]
fn calling_a_tuple_that_is_not_a_function_fails() {
    let (_, result) = run_fresh("tuple -assign @f 1\n@f ( )");

    assert_eq!(result, CommandResult::Failure);

    let (_, result) = run_fresh("tuple -assign @f 1\nCALL @f ( )");

    assert_eq!(result, CommandResult::Failure);
}

#[test]
fn func_list_show_and_delete() {
    let (mut session, _) = session();

    assert!(run(&mut session, ADD).is_success());
    assert!(run(&mut session, "FUNC -to @shown -show add").is_success());

    match tuple(&session, "shown") {
        Some(Value::String(text)) => {
            assert!(text.starts_with("add ( a b )"));
            assert!(text.contains("eval + @@a @@b"));
        }
        other => panic!("expected the function text, found {:?}", other),
    }

    assert!(run(&mut session, "FUNC -to @all -list").is_success());
    assert!(matches!(tuple(&session, "all"), Some(Value::String(text)) if text.contains("add")));

    assert!(run(&mut session, "FUNC -delete add").is_success());
    assert!(session.functions().lookup("add").is_none());
    assert_eq!(run(&mut session, "add ( 1 2 )"), CommandResult::Failure);
    assert_eq!(run(&mut session, "FUNC -delete add"), CommandResult::Failure);
}

#[test]
fn commands_shadow_functions() {
    let (session, result) = run_fresh("FUNC put ( v ) $[ eval + 1 1 ]$\nput x");

    assert!(result.is_success());
    assert_eq!(top(&session), Some(Value::from("x")));
}

#[test]
fn functions_can_call_functions() {
    let (session, result) = run_fresh(&format!(
        "{}\nFUNC twice ( v ) $[ add ( @@v @@v ) ]$\ntwice ( 21 )",
        ADD
    ));

    assert!(result.is_success());
    assert_eq!(top(&session), Some(Value::Int(42)));
    assert!(session.call_stack().is_empty());
}

const COUNTDOWN: &str = "FUNC down ( ) $[ eval -to @n - @n 1 eval -to @go > @n 0 \
                         IF @go THEN $[ down ( ) ]$ ]$";

#[test]
fn runaway_recursion_fails_and_unwinds() {
    let (mut session, _) = session();

    assert_eq!(run(&mut session, "FUNC f ( ) $[ f ( ) ]$\nf ( )"), CommandResult::Failure);

    assert!(session.call_stack().is_empty());
    assert!(!session.tuples().has_local_context());
    assert_eq!(session.frames().depth(), 0);

    assert!(run(&mut session, "put next").is_success());
    assert_eq!(top(&session), Some(Value::from("next")));
}

#[test_case(10, true; "shallow recursion runs")]
#[test_case(200, false; "deep recursion is refused")]
fn recursion_depth_is_bounded(count: i64, succeeds: bool) {
    let source = format!("tuple -assign @n {}\n{}\ndown ( )", count, COUNTDOWN);
    let (session, result) = run_fresh(&source);

    assert_eq!(result.is_success(), succeeds);
    assert!(session.call_stack().is_empty());

    if succeeds {
        assert_eq!(tuple(&session, "n"), Some(Value::Int(0)));
    }
}

#[test]
fn the_depth_limit_can_be_raised() {
    let (mut session, _) = session();

    session.set_max_depth(30);
    assert_eq!(session.max_depth(), 30);
    assert_eq!(
        run(&mut session, &format!("tuple -assign @n 20\n{}\ndown ( )", COUNTDOWN)),
        CommandResult::Failure
    );

    session.set_max_depth(60);
    assert!(run(&mut session, "tuple -assign @n 20\ndown ( )").is_success());
    assert_eq!(tuple(&session, "n"), Some(Value::Int(0)));
}

#[test]
fn locals_do_not_hide_tuple_arguments() {
    let (session, result) = run_fresh(
        "put -to @x ${ orig }$\n\
         FUNC f ( a ) $[ LOCAL @x ${ inner }$ put -to @@a ${ out }$ ]$\n\
         f ( @x )",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "x"), Some(Value::from("out")));
    assert!(!session.tuples().has_local_context());
}

#[test]
fn tuple_arguments_pass_through_nested_calls() {
    let (session, result) = run_fresh(
        "put -to @x ${ orig }$\n\
         FUNC g ( b ) $[ LOCAL @x ${ g }$ put -to @@b ${ deep }$ ]$\n\
         FUNC f ( a ) $[ LOCAL @x ${ f }$ g ( @@a ) put -from @@a -to @seen ]$\n\
         f ( @x )",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "x"), Some(Value::from("deep")));
    assert_eq!(tuple(&session, "seen"), Some(Value::from("deep")));
}

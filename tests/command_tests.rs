mod common;

use common::{depth, run, run_fresh, session, temp_path, top, tuple};
use stackline::runtime::{
    data_structures::value::{OpaqueHandle, Value},
    interpreter::{CommandResult, TupleManagement},
};
use std::fs;
use test_case::test_case;

#[test]
fn put_prints_to_std() {
    let (mut session, buffer) = session();

    assert!(run(&mut session, "put -to STD: hello").is_success());
    assert!(run(&mut session, "put -n -s -to STD: a put -n -to STD: b").is_success());
    assert!(run(&mut session, "put -to NULL: gone").is_success());

    assert_eq!(buffer.text(), "hello\na b");
    assert_eq!(depth(&session), 0);
}

#[test]
fn put_resolves_its_argument() {
    let (session, result) = run_fresh(
        "tuple -assign @x ${ quoted text }$\n\
         put @x put -# 0x10 put literal",
    );

    assert!(result.is_success());
    assert_eq!(depth(&session), 3);
    assert_eq!(top(&session), Some(Value::from("literal")));
    assert_eq!(
        session.tuples().peek(1).map(|t| t.borrow().value().clone()),
        Some(Value::Int(16))
    );
    assert_eq!(
        session.tuples().peek(2).map(|t| t.borrow().value().clone()),
        Some(Value::from("quoted text"))
    );
}

#[test]
fn put_from_a_tuple_to_a_tuple() {
    let (session, result) = run_fresh("tuple -assign @a 5\nput -from @a -to @b");

    assert!(result.is_success());
    assert_eq!(tuple(&session, "b"), Some(Value::from("5")));
    assert_eq!(depth(&session), 0);
}

#[test]
fn results_are_visible_to_scripts() {
    let (mut session, _) = session();

    assert!(run(&mut session, "put a").is_success());
    assert_eq!(tuple(&session, "?"), Some(Value::Bool(true)));

    assert_eq!(run(&mut session, "frobnicate"), CommandResult::Failure);
    assert_eq!(tuple(&session, "?"), Some(Value::Bool(false)));

    assert!(run(&mut session, "IF -! @? THEN $[ put recovered ]$").is_success());
    assert_eq!(top(&session), Some(Value::from("recovered")));
}

#[test]
fn unknown_dash_command_fails_the_command() {
    let (session, result) = run_fresh("put -bogus a");

    assert_eq!(result, CommandResult::Failure);
    assert_eq!(depth(&session), 0);
}

#[test]
fn exhausted_arguments_fail() {
    let (_, result) = run_fresh("put");

    assert_eq!(result, CommandResult::Failure);
}

#[test]
fn missing_tuple_fails() {
    let (_, result) = run_fresh("put @nowhere");

    assert_eq!(result, CommandResult::Failure);
}

#[test_case("-dup", "3 3 2 1"; "dup")]
#[test_case("-swap", "2 3 1"; "swap")]
#[test_case("-over", "2 3 2 1"; "over")]
#[test_case("-rot", "1 3 2"; "rot")]
#[test_case("-drop", "2 1"; "drop")]
#[test_case("-pick 2", "1 3 2 1"; "pick")]
fn lifo_reshapes_the_stack(operation: &str, expected: &str) {
    let source = format!(
        "put 1 put 2 put 3\n\
         lifo {operation}\n\
         lifo -to @shown -show"
    );
    let (session, result) = run_fresh(&source);

    assert!(result.is_success());
    assert_eq!(tuple(&session, "shown"), Some(Value::from(format!("top <== {}", expected).as_str())));
}

#[test]
fn lifo_show_empty_and_depth() {
    let (session, result) = run_fresh("lifo -to @empty -show\nput a put b\nlifo -depth");

    assert!(result.is_success());
    assert_eq!(tuple(&session, "empty"), Some(Value::from("(empty)")));
    assert_eq!(top(&session), Some(Value::Int(2)));
}

#[test]
fn lifo_pop_and_push() {
    let (session, result) = run_fresh(
        "put a lifo -pop @t\n\
         lifo -push @t\n\
         lifo -to @v -popval",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "t"), Some(Value::from("a")));
    assert_eq!(tuple(&session, "v"), Some(Value::from("a")));
    assert_eq!(depth(&session), 0);
}

#[test_case("lifo -drop"; "drop")]
#[test_case("lifo -pop @t"; "pop")]
#[test_case("put 1 lifo -rot"; "rot")]
#[test_case("lifo -pick -1"; "negative pick")]
fn lifo_underflow_fails(source: &str) {
    let (_, result) = run_fresh(source);

    assert_eq!(result, CommandResult::Failure);
}

#[test]
fn pushed_tuples_keep_their_identity() {
    let (session, result) = run_fresh(
        "tuple -assign @cell 1\n\
         lifo -push @cell\n\
         tuple -assign @cell 2",
    );

    assert!(result.is_success());
    assert_eq!(top(&session), Some(Value::from("2")));
}

#[test]
fn tuple_lifecycle() {
    let (mut session, _) = session();

    assert!(run(&mut session, "tuple -exists @t").is_success());
    assert_eq!(top(&session), Some(Value::Bool(false)));

    assert!(run(&mut session, "tuple -null @t tuple -exists @t").is_success());
    assert_eq!(top(&session), Some(Value::Bool(true)));
    assert_eq!(tuple(&session, "t"), Some(Value::None));

    assert!(run(&mut session, "tuple -delete @t").is_success());
    assert_eq!(tuple(&session, "t"), None);

    assert_eq!(run(&mut session, "tuple -delete @t"), CommandResult::Failure);
}

#[test_case("tuple -true @v", "bool"; "bool")]
#[test_case("tuple -assign @v text", "string"; "string")]
#[test_case("tuple -null @v", "null"; "null")]
#[test_case("eval -to @v + 1 2", "int"; "int")]
#[test_case("eval -to @v + 1.5 2", "float"; "float")]
#[test_case("FUN -to @v ( ) $[ put x ]$", "functor"; "functor")]
#[test_case("dict -save -to @v", "bytes"; "bytes")]
fn tuple_type_names(setup: &str, expected: &str) {
    let source = format!("{setup}\ntuple -type @v\ntuple -typename @v");
    let (session, result) = run_fresh(&source);

    assert!(result.is_success());
    assert_eq!(top(&session), Some(Value::from(expected)));
    assert_eq!(
        session.tuples().peek(1).map(|t| t.borrow().value().clone()),
        Some(Value::from(expected))
    );
}

#[test]
fn handles_are_opaque() {
    let (mut session, _) = session();

    let _ = session.set_tuple("h", Value::Handle(OpaqueHandle::new("socket", 7_u32)));

    assert!(run(&mut session, "tuple -type @h tuple -value @h").is_success());

    match top(&session) {
        Some(Value::Handle(handle)) => {
            assert_eq!(handle.type_name(), "socket");
            assert_eq!(handle.downcast_ref::<u32>(), Some(&7));
        }
        other => panic!("expected a handle, found {:?}", other),
    }

    assert_eq!(
        session.tuples().peek(1).map(|t| t.borrow().value().clone()),
        Some(Value::from("handle"))
    );
}

#[test]
fn tuple_map_lists_visible_tuples() {
    let (session, result) = run_fresh("tuple -assign @listed yes\ntuple -to @map -map");

    assert!(result.is_success());

    match tuple(&session, "map") {
        Some(Value::String(text)) => assert!(text.contains("listed")),
        other => panic!("expected a listing, found {:?}", other),
    }
}

#[test_case("+ 2 3", Value::Int(5); "add")]
#[test_case("- 2 5", Value::Int(-3); "subtract")]
#[test_case("* 1.5 2", Value::Float(3.0); "float multiply")]
#[test_case("/ 7 2", Value::Int(3); "integer divide")]
#[test_case("% 7 2", Value::Int(1); "remainder")]
#[test_case("<< 1 4", Value::Int(16); "shift left")]
#[test_case(">> 0x100 4", Value::Int(16); "shift right")]
#[test_case("& 12 10", Value::Int(8); "and")]
#[test_case("| 12 10", Value::Int(14); "or")]
#[test_case("^ 12 10", Value::Int(6); "xor")]
#[test_case("max 3 9", Value::Int(9); "max")]
#[test_case("min 3 9", Value::Int(3); "min")]
#[test_case("== abc abc", Value::Bool(true); "text equal")]
#[test_case("< 2 10", Value::Bool(true); "numeric less")]
#[test_case("< b a", Value::Bool(false); "text less")]
#[test_case(">= 2.5 2", Value::Bool(true); "mixed compare")]
#[test_case("&& @true @false", Value::Bool(false); "logical and")]
#[test_case("|| @true false", Value::Bool(true); "logical or")]
#[test_case("! @false", Value::Bool(true); "not")]
fn eval_operators(expression: &str, expected: Value) {
    let (session, result) = run_fresh(&format!("eval {}", expression));

    assert!(result.is_success());
    assert_eq!(depth(&session), 1);
    assert_eq!(top(&session), Some(expected));
}

#[test_case("/ 1 0"; "divide by zero")]
#[test_case("% 1 0"; "remainder by zero")]
#[test_case("+ a 1"; "not a number")]
#[test_case("+ 9223372036854775807 1"; "overflow")]
#[test_case("<< 1.5 1"; "float shift")]
#[test_case("&& 1 @true"; "not a boolean")]
#[test_case("?? 1 2"; "unknown operator")]
fn eval_errors_fail(expression: &str) {
    let (session, result) = run_fresh(&format!("eval {}", expression));

    assert_eq!(result, CommandResult::Failure);
    assert_eq!(depth(&session), 0);
}

#[test]
fn usage_describes_commands() {
    let (session, result) = run_fresh("usage -cmd put -to @one\nhelp -to @all");

    assert!(result.is_success());

    match tuple(&session, "one") {
        Some(Value::String(text)) => assert!(text.starts_with("put [-n]")),
        other => panic!("expected usage text, found {:?}", other),
    }

    match tuple(&session, "all") {
        Some(Value::String(text)) => {
            assert!(text.contains("commands defined."));
            assert!(text.contains("Manipulate the tuple stack."));
        }
        other => panic!("expected a listing, found {:?}", other),
    }

    let (_, result) = run_fresh("usage -cmd frobnicate");
    assert_eq!(result, CommandResult::Failure);
}

#[test]
fn files_as_sinks_and_sources() {
    let path = temp_path("sink.txt");
    let source = format!(
        "put -to ${{ {path} }}$ ${{ file contents }}$\n\
         put -from ${{ {path} }}$ -to @read",
        path = path.display()
    );
    let (session, result) = run_fresh(&source);

    assert!(result.is_success());
    assert_eq!(tuple(&session, "read"), Some(Value::from("file contents")));

    let _ = fs::remove_file(path);
}

#[test]
fn include_runs_a_file() {
    let good = temp_path("good.sl");
    let bad = temp_path("bad.sl");

    fs::write(&good, "put one\nput two\n").unwrap();
    fs::write(&bad, "put three\nfrobnicate\nput four\n").unwrap();

    let (mut session, _) = session();

    assert!(run(&mut session, &format!("include ${{ {} }}$", good.display())).is_success());
    assert_eq!(depth(&session), 2);

    assert_eq!(
        run(&mut session, &format!("include -s ${{ {} }}$", bad.display())),
        CommandResult::Failure
    );
    assert_eq!(depth(&session), 3);
    assert_eq!(top(&session), Some(Value::from("three")));

    assert_eq!(run(&mut session, "include ${ no-such-file.sl }$"), CommandResult::Failure);

    let _ = fs::remove_file(good);
    let _ = fs::remove_file(bad);
}

#[test_case("string -cat abc def", Value::from("abcdef"); "cat")]
#[test_case("string -cat ${ a b }$ c", Value::from("a bc"); "cat keeps inner spaces")]
#[test_case("string -eq abc abc", Value::Bool(true); "equal")]
#[test_case("string -eq abc abd", Value::Bool(false); "not equal")]
#[test_case("string -len ${ héllo }$", Value::Int(5); "length in characters")]
#[test_case("string -new", Value::from(""); "new")]
#[test_case("string -bl a", Value::from("a "); "blank")]
#[test_case("string -bls a 3", Value::from("a   "); "blanks")]
#[test_case("string -nl a", Value::from("a\n"); "newline")]
#[test_case("string -repl banana an AN", Value::from("bANANa"); "replace all")]
#[test_case("string -repl1 banana an AN", Value::from("bANana"); "replace first")]
#[test_case("string -startswith prefix pre", Value::Bool(true); "starts with")]
#[test_case("string -substr ${ héllo }$ 1 3", Value::from("él"); "substring by character")]
#[test_case("string -substr abc 0 3", Value::from("abc"); "whole substring")]
#[test_case("string -upper MiXed", Value::from("MIXED"); "upper")]
#[test_case("string -lower MiXed", Value::from("mixed"); "lower")]
#[test_case("string -- abc -len", Value::Int(3); "operand first")]
#[test_case("string -- text", Value::from("text"); "identity")]
fn string_operations(source: &str, expected: Value) {
    let (session, result) = run_fresh(source);

    assert!(result.is_success());
    assert_eq!(depth(&session), 1);
    assert_eq!(top(&session), Some(expected));
}

#[test]
fn string_trim_and_routing() {
    let (mut session, buffer) = session();

    assert!(run(&mut session, "string -nl x -to @line").is_success());
    assert!(run(&mut session, "string -to @trimmed -trim @line").is_success());
    assert!(run(&mut session, "string -cat @trimmed ! -to STD:").is_success());

    assert_eq!(tuple(&session, "line"), Some(Value::from("x\n")));
    assert_eq!(tuple(&session, "trimmed"), Some(Value::from("x")));
    assert_eq!(buffer.text(), "x!\n");
    assert_eq!(depth(&session), 0);
}

#[test]
fn string_bytes_round_trip_through_tuples() {
    let (session, result) = run_fresh(
        "string -tobytes ${ dé }$ -to @raw\n\
         tuple -to @kind -type @raw\n\
         string -frombytes @raw",
    );

    assert!(result.is_success());
    assert_eq!(tuple(&session, "kind"), Some(Value::from("bytes")));
    assert_eq!(top(&session), Some(Value::from("dé")));
}

#[test_case("string -substr abc 2 1"; "reversed range")]
#[test_case("string -substr abc 0 4"; "past the end")]
#[test_case("string -substr abc -1 2"; "negative start")]
#[test_case("string -len"; "missing operand")]
#[test_case("string"; "nothing to do")]
#[test_case("string -frombytes @missing"; "missing tuple")]
#[test_case("tuple -assign @t text string -frombytes @t"; "not bytes")]
#[test_case("string -upper a -bogus"; "unknown dash command")]
fn string_errors_fail(source: &str) {
    let (session, result) = run_fresh(source);

    assert_eq!(result, CommandResult::Failure);
    assert_eq!(depth(&session), 0);
}

#[test]
fn put_takes_the_whole_integer_range() {
    let (session, result) = run_fresh("put -# -9223372036854775808 put -# 9223372036854775807");

    assert!(result.is_success());
    assert_eq!(
        session.tuples().peek(1).map(|t| t.borrow().value().clone()),
        Some(Value::Int(i64::MIN))
    );
    assert_eq!(top(&session), Some(Value::Int(i64::MAX)));
}

#[test_case("--5"; "doubled minus")]
#[test_case("-+5"; "minus plus")]
#[test_case("+-5"; "plus minus")]
#[test_case("-9223372036854775809"; "below the range")]
fn put_rejects_malformed_integers(text: &str) {
    let (session, result) = run_fresh(&format!("put -# {}", text));

    assert_eq!(result, CommandResult::Failure);
    assert_eq!(depth(&session), 0);
}

#[test]
fn self_including_files_fail() {
    let path = temp_path("loop.sl");

    fs::write(&path, format!("put again\ninclude ${{ {} }}$\n", path.display())).unwrap();

    let (mut session, _) = session();

    assert_eq!(
        run(&mut session, &format!("include ${{ {} }}$", path.display())),
        CommandResult::Failure
    );
    assert!(run(&mut session, "lifo -clear put after").is_success());
    assert_eq!(depth(&session), 1);

    let _ = fs::remove_file(path);
}

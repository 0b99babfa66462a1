mod common;

#[cfg(test)]
mod interpreter_tests {
    use crate::common::{output_of, run, runtime_error_of, session, SharedBuffer};
    use krust::driver::{decode_source, Outcome, Session};
    use krust::error::KrustError;
    use krust::interpreter::Interpreter;

    #[test]
    fn test_initializer_sees_shadowed_binding() {
        assert_eq!(
            output_of("var a = 1; { var a = a + 1; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_counter_closure() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    print i;
                }
                return count;
            }

            var counter = makeCounter();
            counter();
            counter();
        "#;

        assert_eq!(output_of(source), "1\n2\n");
    }

    #[test]
    fn test_closure_binding_is_static() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\n");
    }

    #[test]
    fn test_mixed_kind_equality() {
        assert_eq!(
            output_of("print \"1\" == 1; print \"1\" != 1; print nil == false;"),
            "false\ntrue\nfalse\n"
        );
        assert_eq!(
            output_of("print nil == nil; print true != false; print \"a\" == \"a\";"),
            "true\ntrue\ntrue\n"
        );
    }

    #[test]
    fn test_number_display() {
        assert_eq!(
            output_of("print 3; print 2.5; print 10 / 4; print -0.5;"),
            "3\n2.5\n2.5\n-0.5\n"
        );
    }

    #[test]
    fn test_large_whole_numbers_print_as_written() {
        assert_eq!(
            output_of("print 100000000000000000000000; print 123456789012;"),
            "100000000000000000000000\n123456789012\n"
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(output_of("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn test_truthiness() {
        let source = r#"
            if (0) print "yes"; else print "no";
            if ("") print "yes"; else print "no";
            if (nil) print "yes"; else print "no";
            if ("a") print "yes"; else print "no";
            if (1) print "yes"; else print "no";
            class A {}
            if (A()) print "yes"; else print "no";
            print !nil;
        "#;

        assert_eq!(output_of(source), "no\nno\nno\nyes\nyes\nno\ntrue\n");
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(
            output_of("print nil or \"x\"; print 0 and 1; print 1 and 2;"),
            "x\n0\n2\n"
        );
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let source = r#"
            fun boom() { print "boom"; return true; }
            print false and boom();
            print true or boom();
        "#;

        assert_eq!(output_of(source), "false\ntrue\n");
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            output_of("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
        assert_eq!(
            output_of("var n = 3; while (n > 0) { print n; n = n - 1; }"),
            "3\n2\n1\n"
        );
    }

    #[test]
    fn test_return_unwinds_loops() {
        assert_eq!(
            output_of("fun f() { while (true) { return 5; } } print f();"),
            "5\n"
        );
    }

    #[test]
    fn test_recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        "#;

        assert_eq!(output_of(source), "55\n");
    }

    #[test]
    fn test_uninitialized_var_is_nil() {
        assert_eq!(output_of("var a; print a;"), "nil\n");
    }

    #[test]
    fn test_callable_display() {
        assert_eq!(
            output_of("fun f() {} class A {} print f; print clock; print A; print A();"),
            "<fn f>\n<native fn clock>\nA\nA instance\n"
        );
    }

    #[test]
    fn test_clock() {
        assert_eq!(output_of("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_class_round_trip() {
        let source = r#"
            class Point {
                init(x) { this.x = x; }
                getX() { return this.x; }
            }
            print Point(1).getX();
        "#;

        assert_eq!(output_of(source), "1\n");
    }

    #[test]
    fn test_initializer_always_returns_instance() {
        let source = r#"
            class A {
                init() { this.v = 1; return; }
            }
            var a = A();
            print a;
            print a.init();
        "#;

        assert_eq!(output_of(source), "A instance\nA instance\n");
    }

    #[test]
    fn test_bound_method_keeps_receiver() {
        let source = r#"
            class Box {
                init(v) { this.v = v; }
                get() { return this.v; }
            }
            var g = Box(3).get;
            print g();
        "#;

        assert_eq!(output_of(source), "3\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = r#"
            class A { m() { return 1; } }
            var a = A();
            print a.m();
            a.m = 2;
            print a.m;
        "#;

        assert_eq!(output_of(source), "1\n2\n");
    }

    #[test]
    fn test_inheritance() {
        let source = r#"
            class A {
                init(name) { this.name = name; }
                hi() { print "A " + this.name; }
                who() { print "A"; }
            }
            class B < A {
                who() { print "B"; }
            }
            var b = B("b");
            b.hi();
            b.who();
        "#;

        assert_eq!(output_of(source), "A b\nB\n");
    }

    #[test]
    fn test_inherited_initializer_sets_arity() {
        assert_eq!(
            runtime_error_of("class A { init(x) {} } class B < A {} B();"),
            "Expected 1 arguments but got 0."
        );
    }

    #[test]
    fn test_runtime_errors() {
        let cases = [
            ("print 10 / 0;", "Attempted division by zero."),
            ("print -\"a\";", "Operand must be a number."),
            ("print 1 + \"a\";", "Invalid operator on mismatched types."),
            ("print \"a\" - \"b\";", "Invalid string operator."),
            ("print nil + nil;", "Invalid nil operator."),
            ("print true < false;", "Invalid boolean operator."),
            ("\"abc\"();", "Can only call functions and classes."),
            ("fun f(a) {} f();", "Expected 1 arguments but got 0."),
            ("print nope;", "Undefined variable 'nope'."),
            ("nope = 1;", "Undefined variable 'nope'."),
            ("class A {} print A().x;", "Undefined property 'x'."),
            ("var x = 1; print x.y;", "Only instances have properties."),
            ("var x = 1; x.y = 2;", "Only instances have fields."),
            (
                "var NotAClass = 1; class B < NotAClass {}",
                "Superclass must be a class.",
            ),
        ];

        for (source, expected) in cases {
            assert_eq!(runtime_error_of(source), expected, "source: {}", source);
        }
    }

    #[test]
    fn test_runtime_error_reports_line_and_exit_code() {
        let (output, outcome) = run("print 1;\nprint 1 / 0;\nprint 2;");

        assert_eq!(output, "1\n");
        assert_eq!(outcome.exit_code(), 70);

        let Outcome::RuntimeError(error) = outcome else {
            panic!("expected a runtime error");
        };
        assert_eq!(error.to_string(), "Attempted division by zero.\n[line 2]");
    }

    #[test]
    fn test_static_errors_skip_evaluation() {
        let (output, outcome) = run("print 1;\nreturn 1;");

        assert_eq!(output, "");
        assert_eq!(outcome.exit_code(), 65);
        assert!(matches!(outcome, Outcome::StaticErrors(ref e) if e.len() == 1));

        let (output, outcome) = run("print 1;\nvar a = a;");
        assert_eq!(output, "");
        assert!(matches!(outcome, Outcome::StaticErrors(_)));
    }

    #[test]
    fn test_session_continues_after_runtime_error() {
        let (mut session, buffer) = session();

        assert!(session.run("var a = \"global\";").is_ok());

        let outcome = session.run("{ var a = \"local\"; print 10 / 0; }");
        assert!(matches!(outcome, Outcome::RuntimeError(_)));

        // The block's frame was unwound along with the error.
        assert!(session.run("print a;").is_ok());
        assert_eq!(buffer.take(), "global\n");
    }

    #[test]
    fn test_session_keeps_definitions_between_inputs() {
        let (mut session, buffer) = session();

        assert!(session
            .run("fun makeAdder(n) { fun add(x) { return x + n; } return add; }")
            .is_ok());
        assert!(session.run("var add2 = makeAdder(2);").is_ok());
        assert!(session.run("print add2(3);").is_ok());
        assert!(session.run("var x = 1;").is_ok());
        assert!(session.run("var x = x + 1; print x;").is_ok());

        assert_eq!(buffer.take(), "5\n2\n");
    }

    #[test]
    fn test_session_reports_static_errors_and_continues() {
        let (mut session, buffer) = session();

        assert_eq!(session.run("print ;").exit_code(), 65);
        assert!(session.run("print \"still here\";").is_ok());
        assert_eq!(buffer.contents(), "still here\n");
    }

    #[test]
    #[should_panic(expected = "resolver rejects top-level return")]
    fn test_unresolved_top_level_return_is_an_internal_fault() {
        let statements = Session::new().parse("return 1;").expect("parses");
        let mut interpreter = Interpreter::with_output(Box::new(SharedBuffer::default()));
        let _ = interpreter.interpret(&statements);
    }

    #[test]
    fn test_invalid_utf8_source() {
        let error = decode_source(vec![b'p', 0xff, 0xfe]).expect_err("not UTF-8");

        assert!(matches!(error, KrustError::Utf8(_)));
        assert_eq!(error.exit_code(), 74);
        assert_eq!(
            decode_source(b"print 1;".to_vec()),
            Ok("print 1;".to_string())
        );
    }
}

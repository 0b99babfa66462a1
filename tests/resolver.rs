#[cfg(test)]
mod resolver_tests {
    use krust::ast::Stmt;
    use krust::driver::Session;
    use krust::resolver::{Locals, Resolver};

    fn parse(source: &str) -> Vec<Stmt> {
        Session::new().parse(source).expect("source should parse")
    }

    fn resolve(source: &str) -> Locals {
        Resolver::new()
            .resolve(&parse(source))
            .expect("source should resolve")
    }

    fn resolve_errors(source: &str) -> Vec<String> {
        match Resolver::new().resolve(&parse(source)) {
            Ok(locals) => panic!("expected resolution errors, got {:?}", locals),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn distances(locals: &Locals) -> Vec<usize> {
        let mut entries: Vec<_> = locals.iter().collect();
        entries.sort();
        entries.into_iter().map(|(_, d)| *d).collect()
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let statements = parse(
            "fun outer() { var x = 1; fun inner() { return x; } return inner; }\n\
             { var a = 1; { var b = a; print b; } }",
        );

        let mut resolver = Resolver::new();
        let first = resolver.resolve(&statements).expect("resolves");
        let second = resolver.resolve(&statements).expect("resolves");

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_globals_are_left_unresolved() {
        assert!(resolve("var a = 1; print a; a = 2;").is_empty());
    }

    #[test]
    fn test_block_distances() {
        let locals = resolve("{ var a = 1; { print a; } }");
        assert_eq!(distances(&locals), vec![1]);
    }

    #[test]
    fn test_closure_distance() {
        let locals = resolve("fun outer() { var x = 1; fun inner() { return x; } }");
        assert_eq!(distances(&locals), vec![1]);
    }

    #[test]
    fn test_this_sits_one_frame_outside_method_body() {
        let locals = resolve("class A { m() { return this; } }");
        assert_eq!(distances(&locals), vec![1]);
    }

    #[test]
    fn test_initializer_reads_shadowed_binding() {
        // `a` in the initializer refers to the outer local, one frame out.
        let locals = resolve("{ var a = 1; { var a = a + 1; } }");
        assert_eq!(distances(&locals), vec![1]);

        // ...or to the global it shadows.
        assert!(resolve("var a = 1; { var a = a + 1; }").is_empty());
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            resolve_errors("{ var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
        assert_eq!(
            resolve_errors("var b = b;"),
            vec!["[line 1] Error at 'b': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_known_global_may_feed_its_own_redeclaration() {
        let statements = parse("var b = b + 1;");
        let locals = Resolver::with_globals(["b"])
            .resolve(&statements)
            .expect("existing global should be readable");
        assert!(locals.is_empty());
    }

    #[test]
    fn test_duplicate_local() {
        assert_eq!(
            resolve_errors("{ var a = 1; var a = 2; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_globals_may_be_redeclared() {
        assert!(resolve("var a = 1; var a = 2;").is_empty());
    }

    #[test]
    fn test_top_level_return() {
        assert_eq!(
            resolve_errors("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            resolve_errors("fun f() { print this; }"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        assert_eq!(
            resolve_errors("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_all_errors_are_collected() {
        let errors = resolve_errors("return 1;\nprint this;\n{ var c = c; }");
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("[line 1]"));
        assert!(errors[1].starts_with("[line 2]"));
        assert!(errors[2].starts_with("[line 3]"));
    }
}

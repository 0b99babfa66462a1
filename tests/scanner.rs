#[cfg(test)]
mod scanner_tests {
    use krust::error::KrustError;
    use krust::scanner::*;
    use krust::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "! != = == < <= > >= / -",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::MINUS, "-"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "class Point < Base { init() { this.x = nil; } }",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Point"),
                (TokenType::LESS, "<"),
                (TokenType::IDENTIFIER, "Base"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::IDENTIFIER, "init"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::THIS, "this"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::NIL, "nil"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_and_lines() {
        let tokens: Vec<Token> = Scanner::new("1 // one\n// nothing here\n2")
            .filter_map(Result::ok)
            .collect();

        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 3, 3]);
        assert_eq!(tokens[1].lexeme, "2");
    }

    #[test]
    fn test_scanner_05_literal_display() {
        let tokens: Vec<String> = Scanner::new("3 3.14 \"hi\" x")
            .filter_map(Result::ok)
            .map(|t| t.to_string())
            .collect();

        assert_eq!(
            tokens,
            vec![
                "NUMBER 3 3.0",
                "NUMBER 3.14 3.14",
                "STRING \"hi\" hi",
                "IDENTIFIER x null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_scanner_06_multiline_string_counts_lines() {
        let tokens: Vec<Token> = Scanner::new("\"a\nb\" c").filter_map(Result::ok).collect();

        assert_eq!(tokens[0].token_type, TokenType::STRING(String::new()));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].lexeme, "c");
    }

    #[test]
    fn test_unterminated_string() {
        let results: Vec<_> = Scanner::new("\"abc").collect();

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].as_ref().err(),
            Some(&KrustError::lex(1, "Unterminated string."))
        );
        assert!(matches!(&results[1], Ok(t) if t.token_type == TokenType::EOF));
    }

    #[test]
    fn test_multibyte_unexpected_character_reported_once() {
        let results: Vec<_> = Scanner::new("é;").collect();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().err().map(|e| e.to_string()),
            Some("[line 1] Error: Unexpected character: é".to_string())
        );
        assert!(matches!(&results[1], Ok(t) if t.token_type == TokenType::SEMICOLON));
    }

    #[test]
    fn test_scan_all_splits_tokens_from_errors() {
        let (tokens, errors) = Scanner::scan_all("var @ x;");

        assert_eq!(errors.len(), 1);
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // We expect this sequence:
        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }

        fn assert_token_matches(
            result: &Result<Token, KrustError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(
                        token.token_type, expected_type,
                        "Expected token type {:?}, got {:?}",
                        expected_type, token.token_type
                    );
                    assert_eq!(
                        token.lexeme, expected_lexeme,
                        "Expected lexeme '{}', got '{}'",
                        expected_lexeme, token.lexeme
                    );
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }
}

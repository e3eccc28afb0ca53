//! Lexical extraction of import specifiers from solidity sources.
//!
//! This deliberately does not parse the solidity grammar. Import targets are
//! always string literals following an `import` keyword, so a small scanner
//! over quoted literals is sufficient and tolerant of both plain and named
//! import syntaxes:
//!
//! ```solidity
//! import "./A.sol";
//! import './B.sol' as B;
//! import * as C from "lib/C.sol";
//! import {D as E} from "./D.sol";
//! ```

/// A lazy iterator over the raw import specifiers of one source text, in
/// source order.
///
/// The scanner skips line and block comments and string literals that do not
/// belong to an import statement. It yields the first quoted literal after
/// each `import` keyword and resets at the statement's `;`.
#[derive(Debug, Clone)]
pub struct ImportScanner<'a> {
    source: &'a str,
    pos: usize,
    awaiting_path: bool,
}

impl<'a> ImportScanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0, awaiting_path: false }
    }

    fn skip_line_comment(&mut self) {
        let bytes = self.source.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        let bytes = self.source.as_bytes();
        self.pos += 2;
        while self.pos + 1 < bytes.len() {
            if bytes[self.pos] == b'*' && bytes[self.pos + 1] == b'/' {
                self.pos += 2;
                return
            }
            self.pos += 1;
        }
        self.pos = bytes.len();
    }

    /// Consumes a quoted literal, returning the content between the quotes.
    fn scan_string(&mut self, quote: u8) -> &'a str {
        let bytes = self.source.as_bytes();
        self.pos += 1;
        let start = self.pos;
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\\' => self.pos += 2,
                c if c == quote => {
                    let end = self.pos;
                    self.pos += 1;
                    return &self.source[start..end]
                }
                _ => self.pos += 1,
            }
        }
        // unterminated literal, yield what we have
        &self.source[start..]
    }
}

impl<'a> Iterator for ImportScanner<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.source.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'/' if bytes.get(self.pos + 1) == Some(&b'/') => self.skip_line_comment(),
                b'/' if bytes.get(self.pos + 1) == Some(&b'*') => self.skip_block_comment(),
                quote @ (b'"' | b'\'') => {
                    let literal = self.scan_string(quote);
                    if self.awaiting_path {
                        self.awaiting_path = false;
                        return Some(literal)
                    }
                }
                b';' => {
                    self.awaiting_path = false;
                    self.pos += 1;
                }
                c if is_ident_start(c) => {
                    let start = self.pos;
                    while self.pos < bytes.len() && is_ident_char(bytes[self.pos]) {
                        self.pos += 1;
                    }
                    if &self.source[start..self.pos] == "import" {
                        self.awaiting_path = true;
                    }
                }
                _ => self.pos += 1,
            }
        }
        None
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

/// Returns all import specifiers of any solidity import statement in a
/// string, `import "./contracts/Contract.sol";` -> `"./contracts/Contract.sol"`.
pub fn find_import_paths(contract: &str) -> Vec<&str> {
    ImportScanner::new(contract).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_find_import_paths() {
        let s = r##"//SPDX-License-Identifier: Unlicense
pragma solidity ^0.8.0;
import "hardhat/console.sol";
import "../contract/Contract.sol";
"##;
        assert_eq!(vec!["hardhat/console.sol", "../contract/Contract.sol"], find_import_paths(s));
    }

    #[test]
    fn can_find_named_imports() {
        let s = r#"
import * as A from "./A.sol";
import {B as Bee} from './B.sol';
import 'C.sol' as C;
"#;
        assert_eq!(vec!["./A.sol", "./B.sol", "C.sol"], find_import_paths(s));
    }

    #[test]
    fn ignores_comments_and_unrelated_strings() {
        let s = r#"
// import "./NotThis.sol";
/* import "./NorThis.sol"; */
string constant banner = "import \"./AlsoNot.sol\";";
import "./Real.sol";
"#;
        assert_eq!(vec!["./Real.sol"], find_import_paths(s));
    }

    #[test]
    fn scanner_is_lazy_and_restartable() {
        let s = r#"import "./A.sol"; import "./B.sol";"#;
        let mut scanner = ImportScanner::new(s);
        assert_eq!(Some("./A.sol"), scanner.next());
        assert_eq!(Some("./B.sol"), scanner.next());
        assert_eq!(None, scanner.next());

        // a fresh scanner over the same text yields the same sequence
        assert_eq!(vec!["./A.sol", "./B.sol"], find_import_paths(s));
    }

    #[test]
    fn tolerates_unterminated_sources() {
        assert_eq!(vec!["./A"], find_import_paths("import \"./A"));
        assert!(find_import_paths("/* unterminated").is_empty());
    }
}

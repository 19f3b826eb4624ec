//! Literal validation.
//!
//! Assigning opcodes to a `Literal` node assumes the literal is
//! well-formed; the parser's grammar lets some malformed literals through
//! as valid productions it is this module's job to reject before lowering:
//! legacy (pre-ES5) octal numeric and escape-sequence literals under strict
//! mode, malformed regular expressions, and invalid template-literal escape
//! sequences in untagged position.

use oxc_regular_expression::{LiteralParser, Options as RegExpOptions};
use oxc_allocator::Allocator;

use crate::error::{CompileError, CompileResult};

/// A resolved `line:column` location, attached to literal-validation errors.
#[derive(Debug, Clone, Copy)]
pub struct SourceLocation {
    /// Line number (1-based).
    pub line: u32,
    /// Column number (1-based).
    pub column: u32,
}

impl SourceLocation {
    /// Construct a source location.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Reject a legacy octal numeric literal (`0755`) or a numeric literal with
/// a leading-zero-then-non-octal-digit (`0899`, legacy decimal) under
/// strict mode. Sloppy mode allows both as Annex B legacy syntax.
pub fn validate_numeric_literal(
    raw: &str,
    is_strict: bool,
    loc: SourceLocation,
) -> CompileResult<()> {
    if !is_strict {
        return Ok(());
    }
    let mut chars = raw.chars();
    let Some(first) = chars.next() else {
        return Ok(());
    };
    if first != '0' {
        return Ok(());
    }
    let Some(second) = chars.next() else {
        return Ok(());
    };
    if second.is_ascii_digit() {
        return Err(CompileError::legacy_syntax(
            "legacy octal literals are not allowed in strict mode",
            loc.line,
            loc.column,
        ));
    }
    Ok(())
}

/// Reject a legacy octal escape sequence (`"\251"`) inside a string literal
/// under strict mode. `\0` not followed by a digit is always allowed.
pub fn validate_string_escapes(
    raw: &str,
    is_strict: bool,
    loc: SourceLocation,
) -> CompileResult<()> {
    if !is_strict {
        return Ok(());
    }
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let next = bytes[i + 1];
            if next.is_ascii_digit() && next != b'0' {
                return Err(CompileError::legacy_syntax(
                    "legacy octal escape sequences are not allowed in strict mode",
                    loc.line,
                    loc.column,
                ));
            }
            if next == b'0' && i + 2 < bytes.len() && bytes[i + 2].is_ascii_digit() {
                return Err(CompileError::legacy_syntax(
                    "legacy octal escape sequences are not allowed in strict mode",
                    loc.line,
                    loc.column,
                ));
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Validate a regular expression literal's pattern against its flags.
pub fn validate_regexp(pattern: &str, flags: &str, loc: SourceLocation) -> CompileResult<()> {
    let allocator = Allocator::default();
    let options = RegExpOptions {
        pattern_span_offset: 0,
        unicode_mode: flags.contains('u') || flags.contains('v'),
        unicode_sets_mode: flags.contains('v'),
    };
    LiteralParser::new(&allocator, pattern, Some(flags), options)
        .parse()
        .map_err(|e| CompileError::invalid_literal(e.to_string(), loc.line, loc.column))?;
    Ok(())
}

/// Validate a tagged-template's cooked segments. Per the grammar, an
/// invalid escape sequence in a tagged template produces a `None` cooked
/// segment rather than a parse error (the tag function sees `undefined`);
/// in an *untagged* template the same escape is a syntax error.
pub fn validate_untagged_template_cooked(
    cooked: &[Option<String>],
    loc: SourceLocation,
) -> CompileResult<()> {
    if cooked.iter().any(Option::is_none) {
        return Err(CompileError::syntax(
            "invalid escape sequence in template literal",
            loc.line,
            loc.column,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 1)
    }

    #[test]
    fn legacy_octal_rejected_in_strict_mode() {
        assert!(validate_numeric_literal("0755", true, loc()).is_err());
    }

    #[test]
    fn legacy_octal_allowed_in_sloppy_mode() {
        assert!(validate_numeric_literal("0755", false, loc()).is_ok());
    }

    #[test]
    fn plain_zero_is_fine() {
        assert!(validate_numeric_literal("0", true, loc()).is_ok());
        assert!(validate_numeric_literal("0.5", true, loc()).is_ok());
    }

    #[test]
    fn legacy_octal_escape_rejected_in_strict_mode() {
        assert!(validate_string_escapes(r"a\251b", true, loc()).is_err());
        assert!(validate_string_escapes(r"a\0b", true, loc()).is_ok());
    }

    #[test]
    fn valid_regexp_accepted() {
        assert!(validate_regexp("a+b", "g", loc()).is_ok());
    }

    #[test]
    fn untagged_template_rejects_invalid_escape() {
        let cooked = vec![Some("a".to_string()), None];
        assert!(validate_untagged_template_cooked(&cooked, loc()).is_err());
    }
}

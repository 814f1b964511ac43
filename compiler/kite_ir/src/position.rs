//! Source positions.
//!
//! The evaluator tags errors with the position of the innermost expression
//! or statement they escape from. Positions are line/column pairs because
//! the parser that produced the tree is external and reports them that way.

use std::fmt;

/// Line/column location of a node in its source text (both 1-based).
///
/// `Position::UNKNOWN` (0:0) marks synthesized nodes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// Position used for generated nodes.
    pub const UNKNOWN: Position = Position { line: 0, column: 0 };

    /// Create a new position.
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    /// Whether this position points into real source text.
    #[inline]
    pub const fn is_known(self) -> bool {
        self.line != 0
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_line_colon_column() {
        assert_eq!(Position::new(3, 14).to_string(), "3:14");
    }

    #[test]
    fn unknown_is_not_known() {
        assert!(!Position::UNKNOWN.is_known());
        assert!(Position::new(1, 1).is_known());
    }

    #[test]
    fn positions_order_by_line_then_column() {
        assert!(Position::new(1, 9) < Position::new(2, 1));
        assert!(Position::new(2, 1) < Position::new(2, 2));
    }
}

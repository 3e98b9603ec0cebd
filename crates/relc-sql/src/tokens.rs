//! Keyword-level vocabulary shared by plans and dialects

use serde::{Deserialize, Serialize};

/// Join type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    /// Inner join
    Inner,
    /// Left outer join
    LeftOuter,
    /// Full outer join
    FullOuter,
    /// Rows of the left side with at least one match on the right
    LeftSemi,
    /// Rows of the left side with no match on the right
    LeftAnti,
    /// Cartesian product; carries no predicates
    Cross,
}

impl JoinKind {
    /// Whether the right side's columns are part of the join output
    pub fn exposes_right(&self) -> bool {
        !matches!(self, JoinKind::LeftSemi | JoinKind::LeftAnti)
    }

    /// ANSI spelling of the join keyword
    pub fn ansi_keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
            JoinKind::LeftSemi => "LEFT SEMI JOIN",
            JoinKind::LeftAnti => "LEFT ANTI JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "inner"),
            JoinKind::LeftOuter => write!(f, "left_outer"),
            JoinKind::FullOuter => write!(f, "full_outer"),
            JoinKind::LeftSemi => write!(f, "left_semi"),
            JoinKind::LeftAnti => write!(f, "left_anti"),
            JoinKind::Cross => write!(f, "cross"),
        }
    }
}

/// Set operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOpKind {
    /// UNION (deduplicated)
    Union,
    /// UNION ALL
    UnionAll,
    /// INTERSECT
    Intersect,
    /// EXCEPT
    Except,
}

impl SetOpKind {
    /// SQL combinator keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            SetOpKind::Union => "UNION",
            SetOpKind::UnionAll => "UNION ALL",
            SetOpKind::Intersect => "INTERSECT",
            SetOpKind::Except => "EXCEPT",
        }
    }
}

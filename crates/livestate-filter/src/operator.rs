use crate::schema::ColumnKind;
use std::fmt;

/// Comparison applied by a leaf filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    /// Regular expression match
    Matches,
    /// Case-insensitive regular expression match
    MatchesIcase,
    /// Case-insensitive equality
    EqualIcase,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Matches => "~",
            Operator::MatchesIcase => "~~",
            Operator::EqualIcase => "=~",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Operator::Equal),
            "!=" => Some(Operator::NotEqual),
            "<" => Some(Operator::Less),
            "<=" => Some(Operator::LessOrEqual),
            ">" => Some(Operator::Greater),
            ">=" => Some(Operator::GreaterOrEqual),
            "~" => Some(Operator::Matches),
            "~~" => Some(Operator::MatchesIcase),
            "=~" => Some(Operator::EqualIcase),
            _ => None,
        }
    }

    /// Equality and ordering operators. These are the ones that can be
    /// turned into a bitmask over an enumerated column.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::Less
                | Operator::LessOrEqual
                | Operator::Greater
                | Operator::GreaterOrEqual
        )
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Operator::Matches | Operator::MatchesIcase)
    }

    pub fn applies_to(&self, kind: &ColumnKind) -> bool {
        if self.is_ordering() {
            return true;
        }
        matches!(kind, ColumnKind::Text)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

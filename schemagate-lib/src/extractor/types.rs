//! Classification of declared column types.

use once_cell::sync::Lazy;
use regex::Regex;

static TYPE_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:NATIONAL\s+)?([A-Z]+)(?:\s+(PRECISION|VARYING))?\s*(\()?").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Integer(u8),
    Decimal { precision: u32, scale: u32 },
    Float(u8),
    Char { length: Option<u32> },
    Text(u8),
    Binary { length: Option<u32> },
    Blob(u8),
    Enum(usize),
    Set(usize),
    Temporal(u8),
    Json,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlType {
    /// Upper-cased base keyword, e.g. `VARCHAR` or `DOUBLE`.
    pub base: String,
    pub family: TypeFamily,
}

impl SqlType {
    pub fn is_floating_point(&self) -> bool {
        matches!(self.family, TypeFamily::Float(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.family, TypeFamily::Integer(_))
    }

    pub fn is_character_string(&self) -> bool {
        matches!(self.family, TypeFamily::Char { .. } | TypeFamily::Text(_))
    }

    pub fn is_text_or_blob(&self) -> bool {
        matches!(self.family, TypeFamily::Text(_) | TypeFamily::Blob(_))
    }

    pub fn enum_value_count(&self) -> Option<usize> {
        match self.family {
            TypeFamily::Enum(count) => Some(count),
            _ => None,
        }
    }

    /// Whether converting a column from `self` to `to` can lose data.
    pub fn narrows_to(&self, to: &SqlType) -> bool {
        use TypeFamily::*;

        match (self.family, to.family) {
            (Integer(a), Integer(b)) | (Float(a), Float(b)) => b < a,
            (Text(a), Text(b)) | (Blob(a), Blob(b)) => b < a,
            (
                Decimal {
                    precision: p1,
                    scale: s1,
                },
                Decimal {
                    precision: p2,
                    scale: s2,
                },
            ) => s2 < s1 || p2.saturating_sub(s2) < p1.saturating_sub(s1),
            (Float(_), Integer(_) | Decimal { .. }) => true,
            (Decimal { scale, .. }, Integer(_)) => scale > 0,
            (Char { length: Some(a) }, Char { length: Some(b) })
            | (Binary { length: Some(a) }, Binary { length: Some(b) }) => b < a,
            (Text(_), Char { .. }) | (Blob(_), Binary { .. }) => true,
            (Char { length: Some(a) }, Text(rank)) => u64::from(a) > text_capacity(rank),
            (Binary { length: Some(a) }, Blob(rank)) => u64::from(a) > text_capacity(rank),
            (Enum(a), Enum(b)) | (Set(a), Set(b)) => b < a,
            (Temporal(a), Temporal(b)) => b < a || (a == b && self.base != to.base),
            (Char { .. } | Text(_), _) => !to.is_character_string(),
            _ => false,
        }
    }
}

fn text_capacity(rank: u8) -> u64 {
    match rank {
        1 => 255,
        2 => 65_535,
        3 => 16_777_215,
        _ => 4_294_967_295,
    }
}

/// Parse the declared type token of a column, e.g. `DECIMAL(10,2) UNSIGNED`.
pub fn parse_type(declared: &str) -> SqlType {
    let Some(caps) = TYPE_HEAD.captures(declared) else {
        return SqlType {
            base: declared.trim().to_uppercase(),
            family: TypeFamily::Other,
        };
    };
    let mut base = caps[1].to_uppercase();
    if let Some(second) = caps.get(2) {
        base = format!("{} {}", base, second.as_str().to_uppercase());
    }
    let args = caps
        .get(3)
        .and_then(|open| paren_contents(declared, open.start()))
        .unwrap_or_default();
    let numbers: Vec<u32> = args
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect();
    let first = numbers.first().copied();

    let family = match base.as_str() {
        "TINYINT" | "BOOL" | "BOOLEAN" => TypeFamily::Integer(1),
        "SMALLINT" => TypeFamily::Integer(2),
        "MEDIUMINT" => TypeFamily::Integer(3),
        "INT" | "INTEGER" => TypeFamily::Integer(4),
        "BIGINT" | "SERIAL" => TypeFamily::Integer(5),
        "DECIMAL" | "NUMERIC" | "DEC" | "FIXED" => TypeFamily::Decimal {
            precision: first.unwrap_or(10),
            scale: numbers.get(1).copied().unwrap_or(0),
        },
        "FLOAT" => match first {
            Some(p) if p > 24 && numbers.len() == 1 => TypeFamily::Float(2),
            _ => TypeFamily::Float(1),
        },
        "DOUBLE" | "DOUBLE PRECISION" | "REAL" => TypeFamily::Float(2),
        "CHAR" | "CHARACTER" => TypeFamily::Char {
            length: Some(first.unwrap_or(1)),
        },
        "VARCHAR" | "CHARACTER VARYING" | "NCHAR" | "NVARCHAR" => {
            TypeFamily::Char { length: first }
        }
        "TINYTEXT" => TypeFamily::Text(1),
        "TEXT" => TypeFamily::Text(2),
        "MEDIUMTEXT" | "LONG" => TypeFamily::Text(3),
        "LONGTEXT" => TypeFamily::Text(4),
        "BINARY" => TypeFamily::Binary {
            length: Some(first.unwrap_or(1)),
        },
        "VARBINARY" => TypeFamily::Binary { length: first },
        "TINYBLOB" => TypeFamily::Blob(1),
        "BLOB" => TypeFamily::Blob(2),
        "MEDIUMBLOB" => TypeFamily::Blob(3),
        "LONGBLOB" => TypeFamily::Blob(4),
        "ENUM" => TypeFamily::Enum(count_quoted_values(&args)),
        "SET" => TypeFamily::Set(count_quoted_values(&args)),
        "YEAR" => TypeFamily::Temporal(1),
        "DATE" | "TIME" => TypeFamily::Temporal(2),
        "DATETIME" | "TIMESTAMP" => TypeFamily::Temporal(3),
        "JSON" => TypeFamily::Json,
        _ => TypeFamily::Other,
    };

    SqlType { base, family }
}

fn paren_contents(text: &str, open: usize) -> Option<String> {
    let close = super::sql::matching_paren(text, open)?;
    Some(text[open + 1..close].to_string())
}

/// Count the quoted literals of an `ENUM(...)`/`SET(...)` value list.
fn count_quoted_values(args: &str) -> usize {
    let bytes = args.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        let quote = bytes[i];
        if quote == b'\'' || quote == b'"' {
            count += 1;
            i += 1;
            while i < bytes.len() {
                if bytes[i] == b'\\' {
                    i += 2;
                    continue;
                }
                if bytes[i] == quote {
                    if bytes.get(i + 1) == Some(&quote) {
                        i += 2;
                        continue;
                    }
                    break;
                }
                i += 1;
            }
        }
        i += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_types() {
        assert!(parse_type("FLOAT").is_floating_point());
        assert!(parse_type("double precision").is_floating_point());
        assert!(parse_type("REAL").is_floating_point());
        assert!(!parse_type("DECIMAL(10,2)").is_floating_point());
        assert!(parse_type("varchar(36)").is_character_string());
        assert!(parse_type("CHAR").is_character_string());
        assert!(parse_type("mediumtext").is_text_or_blob());
        assert!(parse_type("BLOB").is_text_or_blob());
        assert!(parse_type("bigint unsigned").is_integer());
        assert_eq!(parse_type("GEOMETRY").family, TypeFamily::Other);
    }

    #[test]
    fn counts_enum_values_with_escapes() {
        let t = parse_type("ENUM('a','b','c','d','e','f','g')");
        assert_eq!(t.enum_value_count(), Some(7));
        let t = parse_type("enum('it''s', 'comma,inside', \"x\")");
        assert_eq!(t.enum_value_count(), Some(3));
        assert_eq!(parse_type("INT").enum_value_count(), None);
    }

    #[test]
    fn detects_narrowing() {
        let narrows = |a: &str, b: &str| parse_type(a).narrows_to(&parse_type(b));
        assert!(narrows("BIGINT", "INT"));
        assert!(!narrows("INT", "BIGINT"));
        assert!(narrows("VARCHAR(255)", "VARCHAR(100)"));
        assert!(!narrows("VARCHAR(100)", "VARCHAR(255)"));
        assert!(narrows("TEXT", "VARCHAR(255)"));
        assert!(narrows("VARCHAR(1000)", "TINYTEXT"));
        assert!(!narrows("VARCHAR(100)", "TEXT"));
        assert!(narrows("DECIMAL(12,4)", "DECIMAL(12,2)"));
        assert!(narrows("DECIMAL(12,2)", "DECIMAL(8,2)"));
        assert!(!narrows("DECIMAL(8,2)", "DECIMAL(12,2)"));
        assert!(narrows("DOUBLE", "FLOAT"));
        assert!(narrows("DATETIME", "DATE"));
        assert!(narrows("VARCHAR(20)", "INT"));
        assert!(narrows("ENUM('a','b','c')", "ENUM('a','b')"));
        assert!(!narrows("INT", "VARCHAR(20)"));
    }
}

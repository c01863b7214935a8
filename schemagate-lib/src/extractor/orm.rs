//! Table definitions from ORM schema files: Rails `db/schema.rb` and
//! `schema.prisma`.
//!
//! Both readers are line-oriented. Types are mapped to the MySQL column type
//! the framework's MySQL adapter emits so the gates see the same shapes they
//! would in a dump.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use schemagate_core::models::schema::{
    ColumnDefinition, IndexColumn, IndexDefinition, TableDefinition,
};
use schemagate_core::models::snapshot::ParseNote;

use super::statements::SqlAnalysis;
use super::table::parse_table_options;
use super::types::parse_type;

static RB_CREATE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*create_table\s+["':]([^"',\s]+)["']?(.*?)\s+do\s*\|"#).unwrap());
static RB_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*t\.(\w+)\s+["':]([^"',\s]+)["']?(.*)$"#).unwrap());
static RB_T_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*t\.index\s+(.*)$"#).unwrap());
static RB_ADD_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*add_index\s+["':]([^"',\s]+)["']?\s*,\s*(.*)$"#).unwrap());
static RB_STRING_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w+):\s*"((?:[^"\\]|\\.)*)""#).unwrap());
static RB_SYMBOL_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w+):\s*(:?[\w.]+)"#).unwrap());
static RB_LENGTH_MAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"length:\s*\{([^}]*)\}"#).unwrap());
static RB_DOUBLE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).unwrap());
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["']([^"']+)["']|:(\w+)"#).unwrap());

static PRISMA_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(model|enum)\s+(\w+)\s*\{").unwrap());
static PRISMA_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\w+)\s+(\w+)(\[\])?(\?)?\s*(.*)$").unwrap());
static PRISMA_MAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@map\(\s*(?:name:\s*)?"([^"]+)"\s*\)"#).unwrap());
static PRISMA_TABLE_MAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*@@map\(\s*(?:name:\s*)?"([^"]+)"\s*\)"#).unwrap());
static PRISMA_NATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@db\.(\w+)(?:\(([^)]*)\))?").unwrap());
static PRISMA_BLOCK_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*@@(id|index|unique|fulltext)\(\s*\[([^\]]*)\]\s*(.*)\)\s*$").unwrap());
static PRISMA_NAME_ARG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:name|map):\s*"([^"]+)""#).unwrap());
static PRISMA_LENGTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"length:\s*(\d+)").unwrap());

pub fn extract(path: &Path, text: &str) -> SqlAnalysis {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if file_name.ends_with(".prisma") {
        prisma(path, text)
    } else if file_name.ends_with(".rb") {
        rails(path, text)
    } else {
        SqlAnalysis {
            notes: vec![ParseNote::new(path, None, "unsupported ORM schema format")],
            ..Default::default()
        }
    }
}

fn rails(path: &Path, text: &str) -> SqlAnalysis {
    let mut out = SqlAnalysis::default();
    let mut current: Option<TableDefinition> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if let Some(caps) = RB_CREATE_TABLE.captures(line) {
            if let Some(table) = current.take() {
                out.tables.push(table);
            }
            current = Some(rails_table(path, &caps[1], &caps[2], line_no));
            continue;
        }
        if let Some(table) = current.as_mut() {
            if trimmed == "end" {
                if let Some(table) = current.take() {
                    out.tables.push(table);
                }
                continue;
            }
            if let Some(caps) = RB_T_INDEX.captures(line) {
                table.indexes.push(rails_index(&caps[1], line_no));
                continue;
            }
            if let Some(caps) = RB_COLUMN.captures(line) {
                match rails_column(&caps[1], &caps[2], &caps[3], line_no) {
                    Some(column) => table.columns.push(column),
                    None => out.notes.push(ParseNote::new(
                        path,
                        Some(line_no),
                        format!("unrecognized column helper `t.{}`", &caps[1]),
                    )),
                }
            }
            continue;
        }
        if let Some(caps) = RB_ADD_INDEX.captures(line) {
            let index = rails_index(&caps[2], line_no);
            match out.tables.iter_mut().find(|t| t.name == caps[1]) {
                Some(table) => table.indexes.push(index),
                None => out.notes.push(ParseNote::new(
                    path,
                    Some(line_no),
                    format!("add_index on unknown table `{}`", &caps[1]),
                )),
            }
        }
    }
    if let Some(table) = current.take() {
        out.tables.push(table);
    }
    out
}

fn rails_options(text: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for caps in RB_STRING_OPTION.captures_iter(text) {
        options.insert(caps[1].to_string(), caps[2].to_string());
    }
    for caps in RB_SYMBOL_OPTION.captures_iter(text) {
        options
            .entry(caps[1].to_string())
            .or_insert_with(|| caps[2].trim_start_matches(':').to_string());
    }
    options
}

fn rails_table(path: &Path, name: &str, rest: &str, line: usize) -> TableDefinition {
    let options = rails_options(rest);
    let mut table = TableDefinition::new(name, path);
    table.source_line = Some(line);

    // The MySQL adapter appends ENGINE=InnoDB unless told otherwise.
    table.engine = Some("InnoDB".to_string());
    if let Some(raw) = options.get("options") {
        let parsed = parse_table_options(raw);
        table.engine = parsed.engine.or(table.engine);
        table.charset = parsed.charset;
        table.collation = parsed.collation;
    }
    if let Some(charset) = options.get("charset") {
        table.charset = Some(charset.clone());
    }
    if let Some(collation) = options.get("collation") {
        table.collation = Some(collation.clone());
    }

    let id = options.get("id").map(String::as_str);
    if id != Some("false") {
        let pk_name = options
            .get("primary_key")
            .cloned()
            .unwrap_or_else(|| "id".to_string());
        let declared = match id {
            Some(kind) => rails_type(kind, &HashMap::new()).unwrap_or_else(|| "BIGINT".to_string()),
            None => "BIGINT".to_string(),
        };
        table.columns.push(column(pk_name.clone(), declared, line));
        table.has_primary_key = true;
        table.indexes.push(IndexDefinition {
            name: None,
            columns: vec![IndexColumn {
                name: pk_name,
                prefix_length: None,
            }],
            is_unique: true,
            is_fulltext: false,
            line: Some(line),
        });
    } else if options.contains_key("primary_key") {
        table.has_primary_key = true;
    }
    table
}

fn rails_type(helper: &str, options: &HashMap<String, String>) -> Option<String> {
    let limit = options.get("limit").and_then(|l| l.parse::<u32>().ok());
    let declared = match helper {
        "string" => format!("VARCHAR({})", limit.unwrap_or(255)),
        "text" => match options.get("size").map(String::as_str) {
            Some("tiny") => "TINYTEXT".to_string(),
            Some("medium") => "MEDIUMTEXT".to_string(),
            Some("long") => "LONGTEXT".to_string(),
            _ => "TEXT".to_string(),
        },
        "binary" | "blob" => match options.get("size").map(String::as_str) {
            Some("medium") => "MEDIUMBLOB".to_string(),
            Some("long") => "LONGBLOB".to_string(),
            _ => "BLOB".to_string(),
        },
        "integer" => match limit {
            Some(1) => "TINYINT".to_string(),
            Some(2) => "SMALLINT".to_string(),
            Some(3) => "MEDIUMINT".to_string(),
            Some(l) if l >= 5 => "BIGINT".to_string(),
            _ => "INT".to_string(),
        },
        "bigint" | "primary_key" | "references" | "belongs_to" => "BIGINT".to_string(),
        "float" => "FLOAT".to_string(),
        "decimal" => {
            let precision = options.get("precision").map(String::as_str).unwrap_or("10");
            let scale = options.get("scale").map(String::as_str).unwrap_or("0");
            format!("DECIMAL({},{})", precision, scale)
        }
        "boolean" => "TINYINT(1)".to_string(),
        "date" => "DATE".to_string(),
        "datetime" => "DATETIME".to_string(),
        "timestamp" => "TIMESTAMP".to_string(),
        "time" => "TIME".to_string(),
        "json" => "JSON".to_string(),
        "uuid" => "VARCHAR(36)".to_string(),
        _ => return None,
    };
    Some(declared)
}

fn rails_column(helper: &str, name: &str, rest: &str, line: usize) -> Option<ColumnDefinition> {
    let options = rails_options(rest);
    if helper == "column" {
        // t.column "name", "enum('a','b')"
        let declared = RB_DOUBLE_QUOTED.captures(rest)?[1].to_string();
        return Some(column(name.to_string(), declared, line));
    }
    let declared = rails_type(helper, &options)?;
    let name = if matches!(helper, "references" | "belongs_to") {
        format!("{}_id", name)
    } else {
        name.to_string()
    };
    Some(column(name, declared, line))
}

fn rails_index(args: &str, line: usize) -> IndexDefinition {
    let (columns_part, options_part) = match (args.find('['), args.find(']')) {
        (Some(open), Some(close)) if open < close => (&args[open + 1..close], &args[close + 1..]),
        _ => match args.find(',') {
            Some(comma) => (&args[..comma], &args[comma + 1..]),
            None => (args, ""),
        },
    };
    let options = rails_options(options_part);
    let mut prefix_lengths: HashMap<String, u32> = HashMap::new();
    let mut uniform_length = None;
    if let Some(caps) = RB_LENGTH_MAP.captures(options_part) {
        for pair in caps[1].split(',') {
            let mut parts = pair.split(':').map(|p| p.trim().trim_matches('"'));
            if let (Some(column), Some(length)) = (parts.next(), parts.next()) {
                if let Ok(length) = length.trim().parse() {
                    prefix_lengths.insert(column.to_string(), length);
                }
            }
        }
    } else if let Some(length) = options.get("length").and_then(|l| l.parse().ok()) {
        uniform_length = Some(length);
    }

    let columns = QUOTED
        .captures_iter(columns_part)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| IndexColumn {
            name: m.as_str().to_string(),
            prefix_length: prefix_lengths.get(m.as_str()).copied().or(uniform_length),
        })
        .collect();

    IndexDefinition {
        name: options.get("name").cloned(),
        columns,
        is_unique: options.get("unique").map(String::as_str) == Some("true"),
        is_fulltext: options.get("type").map(String::as_str) == Some("fulltext"),
        line: Some(line),
    }
}

fn column(name: String, declared_type: String, line: usize) -> ColumnDefinition {
    let sql_type = parse_type(&declared_type);
    ColumnDefinition {
        name,
        is_enum: sql_type.enum_value_count().is_some(),
        enum_value_count: sql_type.enum_value_count().unwrap_or(0),
        is_floating_point: sql_type.is_floating_point(),
        declared_type,
        line: Some(line),
    }
}

struct PrismaModel {
    table: TableDefinition,
    fields: Vec<PrismaField>,
}

struct PrismaField {
    name: String,
    column: String,
    type_name: String,
    attributes: String,
    line: usize,
}

fn prisma(path: &Path, text: &str) -> SqlAnalysis {
    let mut out = SqlAnalysis::default();
    let mut enums: HashMap<String, Vec<String>> = HashMap::new();
    let mut models: Vec<PrismaModel> = Vec::new();
    let mut block: Option<(String, String)> = None;

    // First pass: collect enums and raw model fields; enum blocks may follow
    // the models that use them.
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split("//").next().unwrap_or_default();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(caps) = PRISMA_BLOCK.captures(line) {
            let (kind, name) = (caps[1].to_string(), caps[2].to_string());
            if kind == "model" {
                let mut table = TableDefinition::new(name.clone(), path);
                table.source_line = Some(line_no);
                // Prisma only targets InnoDB and creates utf8mb4 tables.
                table.engine = Some("InnoDB".to_string());
                table.charset = Some("utf8mb4".to_string());
                table.collation = Some("utf8mb4_unicode_ci".to_string());
                models.push(PrismaModel {
                    table,
                    fields: Vec::new(),
                });
            } else {
                enums.insert(name.clone(), Vec::new());
            }
            block = Some((kind, name));
            continue;
        }
        if trimmed == "}" {
            block = None;
            continue;
        }
        let Some((kind, name)) = block.as_ref() else {
            continue;
        };
        if kind == "enum" {
            if let Some(values) = enums.get_mut(name) {
                if let Some(value) = trimmed.split_whitespace().next() {
                    if !value.starts_with('@') {
                        values.push(value.to_string());
                    }
                }
            }
            continue;
        }
        let Some(model) = models.last_mut() else {
            continue;
        };
        if let Some(caps) = PRISMA_TABLE_MAP.captures(line) {
            model.table.name = caps[1].to_string();
        } else if let Some(caps) = PRISMA_BLOCK_ATTR.captures(line) {
            prisma_block_attribute(&mut model.table, &model.fields, &caps, line_no);
        } else if trimmed.starts_with("@@") {
            // @@schema, @@ignore and friends carry nothing the gates read.
        } else if let Some(caps) = PRISMA_FIELD.captures(line) {
            if caps.get(3).is_some() {
                // List fields are relation back-references.
                continue;
            }
            let attributes = caps[5].to_string();
            let column = PRISMA_MAP
                .captures(&attributes)
                .map(|m| m[1].to_string())
                .unwrap_or_else(|| caps[1].to_string());
            model.fields.push(PrismaField {
                name: caps[1].to_string(),
                column,
                type_name: caps[2].to_string(),
                attributes,
                line: line_no,
            });
        } else {
            out.notes.push(ParseNote::new(
                path,
                Some(line_no),
                format!("unrecognized line in model `{}`", name),
            ));
        }
    }

    for model in models {
        let mut table = model.table;
        for field in &model.fields {
            if field.attributes.contains("@relation") {
                continue;
            }
            let Some(declared) = prisma_type(field, &enums) else {
                // Another model: a relation field without a column.
                continue;
            };
            table.columns.push(column(field.column.clone(), declared, field.line));
            if field.attributes.contains("@id") {
                table.has_primary_key = true;
                table.indexes.push(single_index(&field.column, true, field.line));
            } else if field.attributes.contains("@unique") {
                table.indexes.push(single_index(&field.column, true, field.line));
            }
        }
        out.tables.push(table);
    }
    out
}

fn prisma_block_attribute(
    table: &mut TableDefinition,
    fields: &[PrismaField],
    caps: &regex::Captures<'_>,
    line: usize,
) {
    let kind = &caps[1];
    let columns = caps[2]
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            let field = part.split('(').next()?.trim();
            if field.is_empty() {
                return None;
            }
            let name = fields
                .iter()
                .find(|f| f.name == field)
                .map(|f| f.column.clone())
                .unwrap_or_else(|| field.to_string());
            Some(IndexColumn {
                name,
                prefix_length: PRISMA_LENGTH
                    .captures(part)
                    .and_then(|c| c[1].parse().ok()),
            })
        })
        .collect();
    let name = PRISMA_NAME_ARG.captures(&caps[3]).map(|c| c[1].to_string());
    if kind == "id" {
        table.has_primary_key = true;
    }
    table.indexes.push(IndexDefinition {
        name: if kind == "id" { None } else { name },
        columns,
        is_unique: kind == "id" || kind == "unique",
        is_fulltext: kind == "fulltext",
        line: Some(line),
    });
}

fn prisma_type(field: &PrismaField, enums: &HashMap<String, Vec<String>>) -> Option<String> {
    if let Some(values) = enums.get(&field.type_name) {
        let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
        return Some(format!("ENUM({})", quoted.join(",")));
    }
    if let Some(native) = PRISMA_NATIVE.captures(&field.attributes) {
        let base = native[1].to_uppercase();
        return Some(match native.get(2) {
            Some(args) if !args.as_str().trim().is_empty() => {
                format!("{}({})", base, args.as_str().replace(' ', ""))
            }
            _ => base,
        });
    }
    let declared = match field.type_name.as_str() {
        "Int" => "INT",
        "BigInt" => "BIGINT",
        "Float" => "DOUBLE",
        "Decimal" => "DECIMAL(65,30)",
        "String" => "VARCHAR(191)",
        "Boolean" => "TINYINT(1)",
        "DateTime" => "DATETIME(3)",
        "Json" => "JSON",
        "Bytes" => "LONGBLOB",
        _ => return None,
    };
    Some(declared.to_string())
}

fn single_index(column: &str, is_unique: bool, line: usize) -> IndexDefinition {
    IndexDefinition {
        name: None,
        columns: vec![IndexColumn {
            name: column.to_string(),
            prefix_length: None,
        }],
        is_unique,
        is_fulltext: false,
        line: Some(line),
    }
}

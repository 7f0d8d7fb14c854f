//! SQL text for snapshot objects.
//!
//! Clause printers shared by the migration generator, the definition
//! printer and the design-schema reconciler. Every identifier goes
//! through [`quote_ident`] and every string literal through
//! [`quote_string`].

use oxide_schema_core::model::{
    CheckConstraintMetadata, ColumnDefault, ColumnMetadata, ForeignKeyMetadata, GenerationKind,
    IndexMetadata, TableMetadata, TablePartitionMetadata,
};
use oxide_schema_core::{Result, SchemaError};

use crate::types::base_name;

const NO_ACTION: &str = "NO ACTION";

/// Quotes an identifier with backticks.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes a string literal, escaping quotes and backslashes.
#[must_use]
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Character set and collation a column inherits from its table.
///
/// Column clauses omit `CHARACTER SET` / `COLLATE` when they match.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableDefaults<'a> {
    pub charset: &'a str,
    pub collation: &'a str,
}

impl<'a> TableDefaults<'a> {
    #[must_use]
    pub fn of(table: &'a TableMetadata) -> Self {
        Self {
            charset: &table.charset,
            collation: &table.collation,
        }
    }
}

/// Types that cannot carry a default, not even `DEFAULT NULL`.
fn type_supports_default(column_type: &str) -> bool {
    !matches!(
        base_name(column_type).as_str(),
        "blob" | "tinyblob" | "mediumblob" | "longblob" | "json" | "geometry"
    )
}

/// The SQL text of a default value.
#[must_use]
pub fn default_value_sql(default: &ColumnDefault) -> String {
    match default {
        ColumnDefault::Null => String::from("NULL"),
        ColumnDefault::Value(value) => quote_string(value),
        ColumnDefault::Expression(expression) => expression.clone(),
    }
}

/// ` DEFAULT ...` for a column, or nothing.
///
/// `DEFAULT NULL` is left out for NOT NULL columns, generated columns
/// and types without defaults. The auto-increment sentinel is printed
/// as its own attribute instead.
#[must_use]
pub fn default_clause(column: &ColumnMetadata) -> String {
    let Some(default) = &column.default else {
        return String::new();
    };
    match default {
        ColumnDefault::Null => {
            if !column.nullable
                || !type_supports_default(&column.column_type)
                || column.generation.is_some()
            {
                String::new()
            } else {
                String::from(" DEFAULT NULL")
            }
        }
        d if d.is_auto_increment() => String::new(),
        d => format!(" DEFAULT {}", default_value_sql(d)),
    }
}

/// The column clause without leading indentation, e.g.
/// `` `id` int NOT NULL AUTO_INCREMENT ``.
#[must_use]
pub fn column_clause(column: &ColumnMetadata, defaults: TableDefaults<'_>) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), column.column_type);

    if !column.character_set.is_empty()
        && !column.character_set.eq_ignore_ascii_case(defaults.charset)
    {
        sql.push_str(" CHARACTER SET ");
        sql.push_str(&column.character_set);
    }
    if !column.collation.is_empty() && !column.collation.eq_ignore_ascii_case(defaults.collation) {
        sql.push_str(" COLLATE ");
        sql.push_str(&column.collation);
    }
    if let Some(generation) = &column.generation {
        let kind = match generation.kind {
            GenerationKind::Stored => "STORED",
            GenerationKind::Virtual => "VIRTUAL",
        };
        sql.push_str(&format!(
            " GENERATED ALWAYS AS ({}) {kind}",
            generation.expression
        ));
    }
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    sql.push_str(&default_clause(column));
    if column.is_auto_increment() {
        sql.push_str(" AUTO_INCREMENT");
    }
    if !column.on_update.is_empty() {
        sql.push_str(" ON UPDATE ");
        sql.push_str(&column.on_update);
    }
    if !column.comment.is_empty() {
        sql.push_str(" COMMENT ");
        sql.push_str(&quote_string(&column.comment));
    }
    sql
}

/// One key part: a quoted column or a parenthesized expression, with
/// optional prefix length and `DESC`.
#[must_use]
pub fn key_part(expression: &str, length: i64, descending: bool) -> String {
    let mut sql = if expression.starts_with('(') && expression.ends_with(')') {
        expression.to_string()
    } else {
        quote_ident(expression)
    };
    if length > 0 {
        sql.push_str(&format!("({length})"));
    }
    if descending {
        sql.push_str(" DESC");
    }
    sql
}

/// `(key, key, ...)` of an index.
#[must_use]
pub fn key_list(index: &IndexMetadata) -> String {
    let parts: Vec<String> = index
        .expressions
        .iter()
        .enumerate()
        .map(|(i, expression)| {
            key_part(
                expression,
                index.key_length.get(i).copied().unwrap_or(-1),
                index.descending.get(i).copied().unwrap_or(false),
            )
        })
        .collect();
    format!("({})", parts.join(", "))
}

/// `(`a`, `b`)`.
#[must_use]
pub fn column_list(columns: &[String]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!("({})", quoted.join(", "))
}

fn index_options(index: &IndexMetadata) -> String {
    let mut sql = String::new();
    if index.index_type.eq_ignore_ascii_case("HASH") {
        sql.push_str(" USING HASH");
    }
    if !index.comment.is_empty() {
        sql.push_str(" COMMENT ");
        sql.push_str(&quote_string(&index.comment));
    }
    if !index.visible && !index.primary {
        sql.push_str(" INVISIBLE");
    }
    sql
}

/// Index keyword prefix: `UNIQUE KEY`, `FULLTEXT KEY`, `SPATIAL KEY` or
/// `KEY`.
fn index_kind(index: &IndexMetadata) -> &'static str {
    if index.unique {
        "UNIQUE KEY"
    } else if index.index_type.eq_ignore_ascii_case("FULLTEXT") {
        "FULLTEXT KEY"
    } else if index.index_type.eq_ignore_ascii_case("SPATIAL") {
        "SPATIAL KEY"
    } else {
        "KEY"
    }
}

/// The index clause as written inside `CREATE TABLE`, e.g.
/// `` PRIMARY KEY (`id`) `` or `` UNIQUE KEY `uk` (`a`, `b`) ``.
#[must_use]
pub fn index_clause(index: &IndexMetadata) -> String {
    if index.primary {
        return format!("PRIMARY KEY {}{}", key_list(index), index_options(index));
    }
    format!(
        "{} {} {}{}",
        index_kind(index),
        quote_ident(&index.name),
        key_list(index),
        index_options(index)
    )
}

/// `CREATE [UNIQUE|FULLTEXT|SPATIAL] INDEX ... ON ...`.
#[must_use]
pub fn create_index_statement(table: &str, index: &IndexMetadata) -> String {
    let modifier = if index.unique {
        "UNIQUE "
    } else if index.index_type.eq_ignore_ascii_case("FULLTEXT") {
        "FULLTEXT "
    } else if index.index_type.eq_ignore_ascii_case("SPATIAL") {
        "SPATIAL "
    } else {
        ""
    };
    format!(
        "CREATE {modifier}INDEX {} ON {} {}{}",
        quote_ident(&index.name),
        quote_ident(table),
        key_list(index),
        index_options(index)
    )
}

fn referential_action(sql: &mut String, clause: &str, action: &str) {
    if !action.is_empty() && !action.eq_ignore_ascii_case(NO_ACTION) {
        sql.push_str(clause);
        sql.push_str(action);
    }
}

/// `` CONSTRAINT `fk` FOREIGN KEY (...) REFERENCES `t` (...) ``. `NO
/// ACTION` is the default and is left out.
#[must_use]
pub fn foreign_key_clause(fk: &ForeignKeyMetadata) -> String {
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY {} REFERENCES {} {}",
        quote_ident(&fk.name),
        column_list(&fk.columns),
        quote_ident(&fk.referenced_table),
        column_list(&fk.referenced_columns)
    );
    referential_action(&mut sql, " ON DELETE ", &fk.on_delete);
    referential_action(&mut sql, " ON UPDATE ", &fk.on_update);
    sql
}

/// `` CONSTRAINT `c` CHECK (expr) ``.
#[must_use]
pub fn check_clause(check: &CheckConstraintMetadata) -> String {
    format!(
        "CONSTRAINT {} CHECK ({})",
        quote_ident(&check.name),
        check.expression
    )
}

/// Table options after the closing parenthesis, each with a leading
/// space.
#[must_use]
pub fn table_options(table: &TableMetadata) -> String {
    let mut sql = String::new();
    if !table.engine.is_empty() {
        sql.push_str(&format!(" ENGINE={}", table.engine));
    }
    if !table.charset.is_empty() {
        sql.push_str(&format!(" DEFAULT CHARSET={}", table.charset));
    }
    if !table.collation.is_empty() {
        sql.push_str(&format!(" COLLATE={}", table.collation));
    }
    if !table.comment.is_empty() {
        sql.push_str(&format!(" COMMENT={}", quote_string(&table.comment)));
    }
    sql
}

/// The `PARTITIONS n` count of a partition, zero for an explicit list.
fn parse_count(partition: &TablePartitionMetadata) -> Result<u64> {
    let value = partition.use_default.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| {
        SchemaError::InvalidPartition(format!(
            "partition `{}` has a malformed count `{value}`",
            partition.name
        ))
    })
}

/// The partition clause, starting with a newline and wrapped in a
/// version comment. Empty when the table is not partitioned.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidPartition`] when a partition count is
/// not a number.
pub fn partition_clause(partitions: &[TablePartitionMetadata]) -> Result<String> {
    let Some(first) = partitions.first() else {
        return Ok(String::new());
    };
    let version = if first.partition_type.is_columns() {
        "50500"
    } else {
        "50100"
    };
    let mut sql = format!(
        "\n/*!{version} PARTITION BY {} ({})",
        first.partition_type.as_sql(),
        first.expression
    );

    let count = parse_count(first)?;
    if count != 0 {
        sql.push_str(&format!("\nPARTITIONS {count}"));
    }

    let sub = first.subpartitions.first();
    if let Some(sub) = sub {
        sql.push_str(&format!(
            "\nSUBPARTITION BY {} ({})",
            sub.partition_type.as_sql(),
            sub.expression
        ));
    }
    let sub_count = sub.map_or(Ok(0), parse_count)?;
    if sub_count != 0 {
        sql.push_str(&format!("\nSUBPARTITIONS {sub_count}"));
    }

    if count == 0 {
        let preposition = first.partition_type.preposition();
        let definitions: Vec<String> = partitions
            .iter()
            .map(|partition| {
                let mut def = format!("PARTITION {}", partition.name);
                if let Some(preposition) = preposition {
                    if partition.value == "MAXVALUE" {
                        def.push_str(&format!(" VALUES {preposition} MAXVALUE"));
                    } else {
                        def.push_str(&format!(" VALUES {preposition} ({})", partition.value));
                    }
                }
                if sub_count == 0 && !partition.subpartitions.is_empty() {
                    let subs: Vec<String> = partition
                        .subpartitions
                        .iter()
                        .map(|s| format!("SUBPARTITION {} ENGINE=InnoDB", s.name))
                        .collect();
                    def.push_str(&format!("\n ({})", subs.join(",\n  ")));
                } else {
                    def.push_str(" ENGINE=InnoDB");
                }
                def
            })
            .collect();
        sql.push_str(&format!("\n({})", definitions.join(",\n ")));
    }

    sql.push_str(" */");
    Ok(sql)
}

/// Which parts of a table go inside `CREATE TABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStyle {
    pub if_not_exists: bool,
    pub foreign_keys: bool,
}

impl TableStyle {
    /// A dump: everything inline.
    pub const DUMP: Self = Self {
        if_not_exists: false,
        foreign_keys: true,
    };

    /// A migration: foreign keys are added once every table exists.
    pub const MIGRATION: Self = Self {
        if_not_exists: true,
        foreign_keys: false,
    };
}

/// Renders `CREATE TABLE ... ;` without a trailing newline.
///
/// # Errors
///
/// Fails when the partition clause cannot be rendered.
pub fn create_table_statement(table: &TableMetadata, style: TableStyle) -> Result<String> {
    let defaults = TableDefaults::of(table);
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| column_clause(c, defaults))
        .collect();
    if let Some(pk) = table.primary_key() {
        lines.push(index_clause(pk));
    }
    lines.extend(
        table
            .indexes
            .iter()
            .filter(|i| !i.primary)
            .map(index_clause),
    );
    if style.foreign_keys {
        lines.extend(table.foreign_keys.iter().map(foreign_key_clause));
    }
    lines.extend(table.check_constraints.iter().map(check_clause));

    let mut sql = String::from("CREATE TABLE ");
    if style.if_not_exists {
        sql.push_str("IF NOT EXISTS ");
    }
    sql.push_str(&quote_ident(&table.name));
    sql.push_str(" (\n  ");
    sql.push_str(&lines.join(",\n  "));
    sql.push_str("\n)");
    sql.push_str(&table_options(table));
    sql.push_str(&partition_clause(&table.partitions)?);
    sql.push(';');
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_schema_core::model::{GenerationMetadata, PartitionType};

    fn column(name: &str, ty: &str, nullable: bool) -> ColumnMetadata {
        ColumnMetadata {
            nullable,
            ..ColumnMetadata::new(name, ty)
        }
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("a`b"), "`a``b`");
        assert_eq!(quote_string("it's"), "'it''s'");
        assert_eq!(quote_string("c:\\dir"), "'c:\\\\dir'");
    }

    #[test]
    fn test_column_clause_defaults() {
        let mut c = column("id", "int", false);
        c.default = Some(ColumnDefault::auto_increment());
        assert_eq!(
            column_clause(&c, TableDefaults::default()),
            "`id` int NOT NULL AUTO_INCREMENT"
        );

        let mut c = column("name", "varchar(20)", true);
        c.default = Some(ColumnDefault::Null);
        c.comment = "user's name".into();
        assert_eq!(
            column_clause(&c, TableDefaults::default()),
            "`name` varchar(20) DEFAULT NULL COMMENT 'user''s name'"
        );

        let mut c = column("doc", "json", true);
        c.default = Some(ColumnDefault::Null);
        assert_eq!(column_clause(&c, TableDefaults::default()), "`doc` json");

        let mut c = column("state", "varchar(8)", false);
        c.default = Some(ColumnDefault::Value("new".into()));
        assert_eq!(
            column_clause(&c, TableDefaults::default()),
            "`state` varchar(8) NOT NULL DEFAULT 'new'"
        );
    }

    #[test]
    fn test_column_clause_charset_and_generation() {
        let mut c = column("name", "varchar(20)", true);
        c.character_set = "utf8mb4".into();
        c.collation = "utf8mb4_bin".into();
        let defaults = TableDefaults {
            charset: "utf8mb4",
            collation: "utf8mb4_general_ci",
        };
        assert_eq!(
            column_clause(&c, defaults),
            "`name` varchar(20) COLLATE utf8mb4_bin"
        );

        let mut c = column("total", "int", true);
        c.default = Some(ColumnDefault::Null);
        c.generation = Some(GenerationMetadata {
            kind: GenerationKind::Stored,
            expression: "`a` + `b`".into(),
        });
        assert_eq!(
            column_clause(&c, TableDefaults::default()),
            "`total` int GENERATED ALWAYS AS (`a` + `b`) STORED"
        );
    }

    #[test]
    fn test_index_clauses() {
        let index = IndexMetadata {
            name: "idx".into(),
            expressions: vec!["a".into(), "(lower(b))".into()],
            key_length: vec![10, -1],
            descending: vec![false, true],
            index_type: "BTREE".into(),
            visible: true,
            ..IndexMetadata::default()
        };
        assert_eq!(index_clause(&index), "KEY `idx` (`a`(10), (lower(b)) DESC)");
        assert_eq!(
            create_index_statement("t", &index),
            "CREATE INDEX `idx` ON `t` (`a`(10), (lower(b)) DESC)"
        );

        let pk = IndexMetadata {
            name: IndexMetadata::PRIMARY.into(),
            expressions: vec!["id".into()],
            primary: true,
            unique: true,
            visible: true,
            ..IndexMetadata::default()
        };
        assert_eq!(index_clause(&pk), "PRIMARY KEY (`id`)");

        let fulltext = IndexMetadata {
            name: "ft".into(),
            expressions: vec!["body".into()],
            index_type: "FULLTEXT".into(),
            visible: false,
            ..IndexMetadata::default()
        };
        assert_eq!(index_clause(&fulltext), "FULLTEXT KEY `ft` (`body`) INVISIBLE");
    }

    #[test]
    fn test_foreign_key_omits_no_action() {
        let fk = ForeignKeyMetadata {
            name: "fk_user".into(),
            columns: vec!["user_id".into()],
            referenced_table: "users".into(),
            referenced_columns: vec!["id".into()],
            on_delete: "CASCADE".into(),
            on_update: "NO ACTION".into(),
            ..ForeignKeyMetadata::default()
        };
        assert_eq!(
            foreign_key_clause(&fk),
            "CONSTRAINT `fk_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_range_partition_clause() {
        let partition = |name: &str, value: &str| TablePartitionMetadata {
            name: name.into(),
            partition_type: PartitionType::Range,
            expression: "`id`".into(),
            value: value.into(),
            ..TablePartitionMetadata::default()
        };
        let sql =
            partition_clause(&[partition("p0", "100"), partition("p1", "MAXVALUE")]).unwrap();
        assert_eq!(
            sql,
            "\n/*!50100 PARTITION BY RANGE (`id`)\n(PARTITION p0 VALUES LESS THAN (100) ENGINE=InnoDB,\n PARTITION p1 VALUES LESS THAN MAXVALUE ENGINE=InnoDB) */"
        );
    }

    #[test]
    fn test_default_partition_count() {
        let partitions: Vec<TablePartitionMetadata> = (0..4)
            .map(|i| TablePartitionMetadata {
                name: format!("p{i}"),
                partition_type: PartitionType::Key,
                expression: "`id`".into(),
                use_default: "4".into(),
                ..TablePartitionMetadata::default()
            })
            .collect();
        assert_eq!(
            partition_clause(&partitions).unwrap(),
            "\n/*!50100 PARTITION BY KEY (`id`)\nPARTITIONS 4 */"
        );

        let mut malformed = partitions;
        malformed[0].use_default = "four".into();
        assert!(matches!(
            partition_clause(&malformed),
            Err(SchemaError::InvalidPartition(_))
        ));
    }

    #[test]
    fn test_create_table_statement() {
        let mut table = TableMetadata::new("t");
        let mut id = column("id", "int", false);
        id.default = Some(ColumnDefault::auto_increment());
        table.columns.push(id);
        table.indexes.push(IndexMetadata {
            name: IndexMetadata::PRIMARY.into(),
            expressions: vec!["id".into()],
            primary: true,
            unique: true,
            visible: true,
            ..IndexMetadata::default()
        });
        table.engine = "InnoDB".into();
        table.comment = "a table".into();
        assert_eq!(
            create_table_statement(&table, TableStyle::DUMP).unwrap(),
            "CREATE TABLE `t` (\n  `id` int NOT NULL AUTO_INCREMENT,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB COMMENT='a table';"
        );
        assert!(create_table_statement(&table, TableStyle::MIGRATION)
            .unwrap()
            .starts_with("CREATE TABLE IF NOT EXISTS `t` (\n"));
    }
}

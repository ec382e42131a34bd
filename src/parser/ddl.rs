use log::{debug, info, warn};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::tokenizer::{Token, Word};

use crate::core::{ColumnDefinition, EmmError, Result, TableDefinition};
use super::tokens::{self, Node};

/// Keywords recognized as built-in column types. The first one following a
/// column name becomes the column's declared type.
const BUILTIN_TYPES: &[&str] = &[
    "SMALLINT", "INT", "INT2", "INT4", "INT8", "INTEGER", "BIGINT", "TINYINT",
    "SERIAL", "SERIAL4", "SERIAL8", "SMALLSERIAL", "BIGSERIAL",
    "REAL", "FLOAT", "FLOAT4", "FLOAT8", "DOUBLE", "NUMERIC", "DECIMAL", "DEC", "MONEY",
    "BOOLEAN", "BOOL", "BIT", "VARBIT",
    "CHAR", "CHARACTER", "NCHAR", "VARCHAR", "VARCHAR2", "NVARCHAR", "TEXT", "CITEXT",
    "BYTEA", "BLOB", "BINARY", "VARBINARY",
    "DATE", "TIME", "TIMETZ", "TIMESTAMP", "TIMESTAMPTZ", "DATETIME", "INTERVAL",
    "UUID", "JSON", "JSONB", "XML", "INET", "CIDR", "MACADDR", "MACADDR8",
    "POINT", "LINE", "LSEG", "BOX", "PATH", "POLYGON", "CIRCLE", "TSVECTOR", "TSQUERY",
];

/// Keywords that open a table-level constraint inside the column list.
const CONSTRAINT_KEYWORDS: &[&str] = &[
    "CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN", "EXCLUDE", "LIKE",
];

/// Words allowed between CREATE and TABLE.
const TABLE_MODIFIERS: &[&str] = &["TEMP", "TEMPORARY", "UNLOGGED", "GLOBAL", "LOCAL"];

/// Words between TABLE and the table name.
const NAME_PREFIXES: &[&str] = &["IF", "NOT", "EXISTS"];

fn is_keyword(word: &Word, keyword: &str) -> bool {
    word.quote_style.is_none() && word.value.eq_ignore_ascii_case(keyword)
}

fn is_one_of(word: &Word, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| is_keyword(word, keyword))
}

/// Recognizes the first CREATE TABLE statement of a DDL script and decomposes
/// its column list.
pub struct DdlParser {
    dialect: PostgreSqlDialect,
}

impl DdlParser {
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    pub fn parse(&self, ddl: &str) -> Result<TableDefinition> {
        let lexemes = tokens::tokenize(&self.dialect, ddl)?;
        let nodes = tokens::group(ddl, lexemes)?;
        let statements = tokens::split_statements(nodes);
        debug!("Found {} statements", statements.len());

        let mut creates = statements
            .into_iter()
            .filter(|statement| is_create_table(statement));

        let statement = creates
            .next()
            .ok_or_else(|| EmmError::ParseError("No `CREATE TABLE` statement found".into()))?;

        let discarded = creates.count();
        if discarded > 0 {
            info!(
                "Found {} more CREATE TABLE statements, considering the first and discarding the others",
                discarded
            );
        }

        parse_create_statement(&statement)
    }
}

impl Default for DdlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `ddl` with the default (PostgreSQL) dialect.
pub fn parse(ddl: &str) -> Result<TableDefinition> {
    DdlParser::new().parse(ddl)
}

/// True if the statement contains `CREATE [modifiers] TABLE` at its top level.
fn is_create_table(statement: &[Node<'_>]) -> bool {
    let mut words = statement
        .iter()
        .filter(|node| !node.is_trivia())
        .map(|node| node.as_leaf().and_then(|lexeme| lexeme.word()));

    while let Some(word) = words.next() {
        if !word.is_some_and(|w| is_keyword(w, "CREATE")) {
            continue;
        }
        for next in words.by_ref() {
            match next {
                Some(w) if is_one_of(w, TABLE_MODIFIERS) => continue,
                Some(w) if is_keyword(w, "TABLE") => return true,
                _ => break,
            }
        }
    }
    false
}

fn parse_create_statement(statement: &[Node<'_>]) -> Result<TableDefinition> {
    let mut table = TableDefinition::default();
    scan(statement, ScanState::default(), &mut table)?;

    let table_name = table
        .table_name()
        .ok_or_else(|| EmmError::ParseError("CREATE TABLE statement has no table name".into()))?
        .to_string();

    if table.columns().is_empty() {
        return Err(EmmError::ParseError(format!(
            "Could not decompose the column list of table '{}'",
            table_name
        )));
    }

    Ok(table)
}

// ============================================================================
// Scan state machine
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Neutral,
    InCreate,
    InCreateTable,
}

#[derive(Debug)]
struct PendingColumn {
    name: String,
    declared_type: Option<String>,
    definition: String,
}

#[derive(Debug, Default)]
struct ScanState {
    phase: Phase,
    in_columns: bool,
    /// A table constraint is being skipped until the next delimiter.
    in_constraint: bool,
    column: Option<PendingColumn>,
}

impl ScanState {
    fn columns() -> Self {
        Self {
            in_columns: true,
            ..Self::default()
        }
    }
}

/// Walk `nodes` with the given state and return the state reached at the end.
/// Parenthesized groups met outside a column list are rescanned recursively in
/// column mode with a fresh state of their own.
fn scan(nodes: &[Node<'_>], mut state: ScanState, table: &mut TableDefinition) -> Result<ScanState> {
    let mut index = 0;

    while index < nodes.len() {
        let node = &nodes[index];
        index += 1;

        if state.in_columns {
            state = scan_column_node(node, state, table)?;
            continue;
        }

        let lexeme = match node {
            Node::Group(group) => {
                debug!("Scanning parenthesized group for columns");
                scan(&group.nodes, ScanState::columns(), table)?;
                continue;
            }
            Node::Leaf(lexeme) => lexeme,
        };

        let Some(word) = lexeme.word() else {
            continue;
        };

        if is_keyword(word, "CREATE") {
            debug!("Found a CREATE statement");
            state.phase = Phase::InCreate;
        } else if state.phase == Phase::InCreate && is_keyword(word, "TABLE") {
            debug!("Identified a CREATE TABLE statement");
            state.phase = Phase::InCreateTable;
        } else if state.phase == Phase::InCreateTable && !is_one_of(word, NAME_PREFIXES) {
            let (name, consumed) = qualified_name(word, &nodes[index..]);
            index += consumed;
            if table.set_table_name(name.clone()) {
                info!("Found table name {}", name);
            } else {
                warn!("Ignoring second table name {} in the same statement", name);
            }
            state.phase = Phase::Neutral;
        }
    }

    Ok(state)
}

/// A name part the way the catalog stores it: unquoted identifiers fold to
/// lower case.
fn catalog_part(word: &Word) -> String {
    match word.quote_style {
        Some(_) => word.value.clone(),
        None => word.value.to_lowercase(),
    }
}

/// Join `schema . table` style names. Returns the name and how many of the
/// following nodes were consumed.
fn qualified_name(first: &Word, rest: &[Node<'_>]) -> (String, usize) {
    let mut name = catalog_part(first);
    let mut consumed = 0;

    while let [Node::Leaf(dot), Node::Leaf(part), ..] = &rest[consumed..] {
        match (&dot.token, part.word()) {
            (Token::Period, Some(word)) => {
                name.push('.');
                name.push_str(&catalog_part(word));
                consumed += 2;
            }
            _ => break,
        }
    }

    (name, consumed)
}

fn scan_column_node(node: &Node<'_>, mut state: ScanState, table: &mut TableDefinition) -> Result<ScanState> {
    let lexeme = match node {
        Node::Group(group) => {
            // Nested groups (width specifiers, CHECK bodies, defaults) are
            // plain text of the current column.
            if let Some(column) = state.column.as_mut() {
                column.definition.push_str(group.text);
            }
            return Ok(state);
        }
        Node::Leaf(lexeme) => lexeme,
    };

    if lexeme.is_comment() {
        // a line comment swallows its newline, keep the words around it apart
        if let Some(column) = state.column.as_mut() {
            column.definition.push(' ');
        }
        return Ok(state);
    }
    if state.column.is_none() && lexeme.is_whitespace() {
        return Ok(state);
    }

    match lexeme.token {
        Token::LParen => return Ok(state),
        Token::Comma | Token::RParen => {
            flush_column(&mut state, table)?;
            return Ok(state);
        }
        _ => {}
    }

    if state.in_constraint {
        return Ok(state);
    }

    if let Some(word) = lexeme.word() {
        match state.column.as_mut() {
            None if is_one_of(word, CONSTRAINT_KEYWORDS) => {
                warn!(
                    "Table constraint starting with {} is not carried over to permuted tables",
                    word.value
                );
                state.in_constraint = true;
                return Ok(state);
            }
            None => {
                info!("Found column {}", word.value);
                state.column = Some(PendingColumn {
                    name: word.value.clone(),
                    declared_type: None,
                    definition: String::new(),
                });
            }
            Some(column) if column.declared_type.is_none() && is_one_of(word, BUILTIN_TYPES) => {
                column.declared_type = Some(word.value.to_uppercase());
            }
            Some(_) => {}
        }
    }

    if let Some(column) = state.column.as_mut() {
        column.definition.push_str(lexeme.text);
    }

    Ok(state)
}

fn flush_column(state: &mut ScanState, table: &mut TableDefinition) -> Result<()> {
    state.in_constraint = false;
    let Some(column) = state.column.take() else {
        return Ok(());
    };

    let Some(declared_type) = column.declared_type else {
        warn!(
            "Column {} has no recognizable built-in type, leaving it out",
            column.name
        );
        return Ok(());
    };

    if table.find_column_index(&column.name).is_some() {
        return Err(EmmError::ParseError(format!(
            "Column '{}' is defined twice in table '{}'",
            column.name,
            table.table_name().unwrap_or("<unnamed>")
        )));
    }

    table.add_column(ColumnDefinition::new(column.name, declared_type, column.definition));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS original_table (
    id SERIAL PRIMARY KEY,                       -- Unique identifier for each row
    created TIMESTAMP DEFAULT CURRENT_TIMESTAMP, -- Creation time
    name TEXT NOT NULL,                          -- Name of the project
    original_table_name TEXT NOT NULL            -- The original table name
);
"#;

    fn names(table: &TableDefinition) -> Vec<&str> {
        table.columns().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_parse_simple_table() {
        let table = parse("CREATE TABLE t (id INT, name TEXT, flag BOOLEAN)").unwrap();

        assert_eq!(table.table_name(), Some("t"));
        assert_eq!(names(&table), vec!["id", "name", "flag"]);
        let types: Vec<&str> = table.columns().iter().map(|c| c.declared_type.as_str()).collect();
        assert_eq!(types, vec!["INT", "TEXT", "BOOLEAN"]);
        assert_eq!(table.columns()[1].original_definition, "name TEXT");
    }

    #[test]
    fn test_parse_skips_comments_and_if_not_exists() {
        let table = parse(PROJECT_DDL).unwrap();

        assert_eq!(table.table_name(), Some("original_table"));
        assert_eq!(names(&table), vec!["id", "created", "name", "original_table_name"]);
        assert_eq!(table.columns()[0].original_definition, "id SERIAL PRIMARY KEY");
        assert_eq!(
            table.columns()[1].original_definition,
            "created TIMESTAMP DEFAULT CURRENT_TIMESTAMP"
        );
        assert_eq!(table.columns()[1].declared_type, "TIMESTAMP");
        assert_eq!(
            table.columns()[3].original_definition.trim_end(),
            "original_table_name TEXT NOT NULL"
        );
        assert!(table.columns().iter().all(|c| !c.original_definition.contains("--")));
    }

    #[test]
    fn test_nested_groups_are_plain_text() {
        let ddl = "CREATE TABLE items (code VARCHAR(12) NOT NULL, price NUMERIC(10, 2) DEFAULT 0, PRIMARY KEY (code))";
        let table = parse(ddl).unwrap();

        assert_eq!(names(&table), vec!["code", "price"]);
        assert_eq!(table.columns()[0].original_definition, "code VARCHAR(12) NOT NULL");
        assert_eq!(table.columns()[1].original_definition, "price NUMERIC(10, 2) DEFAULT 0");
        assert_eq!(table.columns()[1].declared_type, "NUMERIC");
    }

    #[test]
    fn test_definitions_are_verbatim_substrings() {
        let ddl = "create table   Orders(\n  id   bigint  not null ,\n\tamount numeric(12,2) check (amount > 0),note text\n)";
        let table = parse(ddl).unwrap();

        assert_eq!(table.column_count(), 3);
        let delimiters = [",", ",", ")"];
        for (column, delimiter) in table.columns().iter().zip(delimiters) {
            let fragment = format!("{}{}", column.original_definition, delimiter);
            assert!(ddl.contains(&fragment), "{:?} not found in source", fragment);
        }
        assert_eq!(table.columns()[0].declared_type, "BIGINT");
    }

    #[test]
    fn test_table_constraints_are_skipped() {
        let ddl = "CREATE TABLE t (a INT, CONSTRAINT t_pk PRIMARY KEY (a), b TEXT, UNIQUE (b), FOREIGN KEY (a) REFERENCES o (id))";
        let table = parse(ddl).unwrap();
        assert_eq!(names(&table), vec!["a", "b"]);
        assert_eq!(table.columns()[1].original_definition, "b TEXT");
        assert!(table.columns().iter().all(|c| !c.original_definition.contains("PRIMARY")));
    }

    #[test]
    fn test_quoted_and_qualified_names() {
        let table = parse(r#"CREATE TABLE sales."Order" ("Id" INT, "Total" NUMERIC)"#).unwrap();

        assert_eq!(table.table_name(), Some("sales.Order"));
        assert_eq!(names(&table), vec!["Id", "Total"]);
        assert_eq!(table.columns()[0].original_definition, r#""Id" INT"#);
    }

    #[test]
    fn test_unquoted_table_names_fold_to_lower_case() {
        let table = parse("create table   Orders(\n  id bigint\n)").unwrap();
        assert_eq!(table.table_name(), Some("orders"));

        let table = parse(r#"CREATE TABLE "Orders" (id INT)"#).unwrap();
        assert_eq!(table.table_name(), Some("Orders"));

        let table = parse("CREATE TABLE Sales.Orders (id INT)").unwrap();
        assert_eq!(table.table_name(), Some("sales.orders"));
        assert!(table.is_qualified());
    }

    #[test]
    fn test_comment_inside_a_column_separates_its_words() {
        let table = parse("CREATE TABLE t (a INT--c\nNOT NULL, b TEXT /* why */DEFAULT 'x')").unwrap();

        assert_eq!(names(&table), vec!["a", "b"]);
        let a = &table.columns()[0].original_definition;
        assert!(!a.contains("INTNOT"), "{:?}", a);
        assert_eq!(a.split_whitespace().collect::<Vec<_>>(), vec!["a", "INT", "NOT", "NULL"]);
        let b = &table.columns()[1].original_definition;
        assert!(!b.contains("--") && !b.contains("/*"));
        assert!(!b.contains("TEXTDEFAULT"), "{:?}", b);
        assert_eq!(table.columns()[1].declared_type, "TEXT");
    }

    #[test]
    fn test_lowercase_types_are_normalized() {
        let table = parse("create table t (a integer, b double precision, c timestamp with time zone)").unwrap();
        let types: Vec<&str> = table.columns().iter().map(|c| c.declared_type.as_str()).collect();
        assert_eq!(types, vec!["INTEGER", "DOUBLE", "TIMESTAMP"]);
        assert_eq!(table.columns()[2].original_definition, "c timestamp with time zone");
    }

    #[test]
    fn test_column_without_builtin_type_is_left_out() {
        let table = parse("CREATE TABLE t (id INT, status order_status, note TEXT)").unwrap();
        assert_eq!(names(&table), vec!["id", "note"]);
    }

    #[test]
    fn test_missing_terminator_is_accepted() {
        let table = parse("CREATE TABLE t (id INT, name TEXT)").unwrap();
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_first_of_several_create_statements_is_used() {
        let ddl = "CREATE TABLE first (a INT);\nCREATE TABLE second (b TEXT, c TEXT);";
        let table = parse(ddl).unwrap();
        assert_eq!(table.table_name(), Some("first"));
        assert_eq!(names(&table), vec!["a"]);
    }

    #[test]
    fn test_other_statements_are_ignored() {
        let ddl = "SET client_encoding = 'UTF8';\nCREATE INDEX idx ON t (a);\nCREATE TEMPORARY TABLE t (a INT);";
        let table = parse(ddl).unwrap();
        assert_eq!(table.table_name(), Some("t"));
    }

    #[test]
    fn test_no_create_statement() {
        let err = parse("select * from table_name;").unwrap_err();
        assert!(matches!(err, EmmError::ParseError(_)));
    }

    #[test]
    fn test_unbalanced_column_list() {
        let ddl = "create table if not exists table_name ( id SERIAL PRIMARY KEY, name TEXT NOT NULL;";
        assert!(matches!(parse(ddl), Err(EmmError::ParseError(_))));
    }

    #[test]
    fn test_no_columns() {
        assert!(matches!(parse("CREATE TABLE t ()"), Err(EmmError::ParseError(_))));
    }

    #[test]
    fn test_duplicate_column() {
        let err = parse("CREATE TABLE t (a INT, a TEXT)").unwrap_err();
        assert!(err.to_string().contains("'a'"));
    }
}

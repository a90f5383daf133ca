//! Table Classifier & Row Parser
//!
//! A service's documentation page carries up to three tables: operations,
//! resource types and condition keys. Tables are recognized by their header
//! text and parsed independently; a missing table yields an empty list.
//!
//! The operations table interleaves two row shapes. A primary row (six or
//! more cells) introduces an operation. A continuation row (exactly three
//! cells) lists more resource types for the operation introduced above it,
//! because the first three columns span several rows.

use super::dependencies::extract_dependencies_with_links;
use crate::model::{
    AccessLevel, ConditionKeyRecord, OperationRecord, ResourceTypeRecord, ServiceRecord,
};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::LazyLock;

/// Minimum cell count of a row that introduces an operation
pub const PRIMARY_ROW_MIN_CELLS: usize = 6;

/// Exact cell count of a continuation row
pub const CONTINUATION_ROW_CELLS: usize = 3;

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static TITLE_CANDIDATES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["h1.topictitle", "h1", "title"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// "Actions, resources, and condition keys for Amazon S3 - Service Authorization Reference"
static DISPLAY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"for\s+(.+?)(?:\s+-|$)").unwrap());

/// Semantic kind of a documentation table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Operations,
    ResourceTypes,
    ConditionKeys,
}

/// Classify a table by its header cells.
///
/// Matching is a case-insensitive substring test; the first matching kind
/// wins, checked in the order operations, resource types, condition keys.
pub fn classify(headers: &[String]) -> Option<TableKind> {
    let headers: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let has = |needle: &str| headers.iter().any(|h| h.contains(needle));

    if has("actions") && has("access level") {
        Some(TableKind::Operations)
    } else if has("resource types") && has("arn") {
        Some(TableKind::ResourceTypes)
    } else if has("condition keys") && has("type") {
        Some(TableKind::ConditionKeys)
    } else {
        None
    }
}

/// Malformed input that was skipped during parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAnomaly {
    /// Continuation row with no operation above it in the same table
    OrphanContinuation { row: usize },
    /// Operations row that is neither a primary nor a continuation row
    UnexpectedShape { row: usize, cells: usize },
    /// Primary row whose name cell is empty
    MissingName { row: usize },
}

impl fmt::Display for ParseAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrphanContinuation { row } => {
                write!(f, "row {row}: continuation row without a preceding operation")
            }
            Self::UnexpectedShape { row, cells } => {
                write!(f, "row {row}: unexpected operations row with {cells} cells")
            }
            Self::MissingName { row } => write!(f, "row {row}: operation row without a name"),
        }
    }
}

/// Everything extracted from one documentation page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub display_name: Option<String>,
    pub operations: Vec<OperationRecord>,
    pub resource_types: Vec<ResourceTypeRecord>,
    pub condition_keys: Vec<ConditionKeyRecord>,
    pub anomalies: Vec<ParseAnomaly>,
}

impl ParsedPage {
    pub fn into_record(self, service_id: &str) -> ServiceRecord {
        ServiceRecord {
            service_id: service_id.to_string(),
            display_name: self.display_name.unwrap_or_else(|| service_id.to_string()),
            operations: self.operations,
            resource_types: self.resource_types,
            condition_keys: self.condition_keys,
        }
    }
}

/// Parse a documentation page body
pub fn parse_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut page = ParsedPage {
        display_name: display_name(&document),
        ..ParsedPage::default()
    };

    for table in document.select(&TABLE) {
        let headers: Vec<String> = table.select(&HEADER_CELL).map(|th| cell_text(&th)).collect();

        match classify(&headers) {
            Some(TableKind::Operations) => {
                let mut acc = OperationTable::new(OperationColumns::locate(&headers));
                for (index, cells) in data_rows(table).enumerate() {
                    if let Err(anomaly) = acc.push_row(index, &cells) {
                        page.anomalies.push(anomaly);
                    }
                }
                page.operations.extend(acc.finish());
            }
            Some(TableKind::ResourceTypes) => {
                let name_col = locate(&headers, |h| h.contains("resource type"), 0);
                let arn_col = locate(&headers, |h| h.contains("arn"), 1);
                for cells in data_rows(table).filter(|c| c.len() >= 2) {
                    let name = text_at(&cells, name_col);
                    if name.is_empty() {
                        continue;
                    }
                    let arn = text_at(&cells, arn_col);
                    let arn_formats = if arn.is_empty() { vec![] } else { vec![arn] };
                    page.resource_types.push(ResourceTypeRecord { name, arn_formats });
                }
            }
            Some(TableKind::ConditionKeys) => {
                let name_col = locate(&headers, |h| h.contains("condition key"), 0);
                let type_col = locate(&headers, |h| h.contains("type"), 1);
                for cells in data_rows(table).filter(|c| c.len() >= 2) {
                    let name = text_at(&cells, name_col);
                    if name.is_empty() {
                        continue;
                    }
                    let value_type = text_at(&cells, type_col);
                    let value_types = if value_type.is_empty() {
                        vec![]
                    } else {
                        vec![value_type]
                    };
                    page.condition_keys.push(ConditionKeyRecord::new(name, value_types));
                }
            }
            None => {}
        }
    }

    tracing::debug!(
        "Parsed page: {} operations, {} resource types, {} condition keys, {} anomalies",
        page.operations.len(),
        page.resource_types.len(),
        page.condition_keys.len(),
        page.anomalies.len()
    );

    page
}

/// Column positions of the operations table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationColumns {
    pub name: usize,
    pub description: usize,
    pub access_level: usize,
    pub resource_types: usize,
    pub condition_keys: usize,
    pub dependent_actions: usize,
}

impl Default for OperationColumns {
    fn default() -> Self {
        Self {
            name: 0,
            description: 1,
            access_level: 2,
            resource_types: 3,
            condition_keys: 4,
            dependent_actions: 5,
        }
    }
}

impl OperationColumns {
    /// Locate columns by header text, keeping the canonical position for
    /// any header that is not found
    pub fn locate(headers: &[String]) -> Self {
        let d = Self::default();
        Self {
            name: locate(headers, |h| h.starts_with("action"), d.name),
            description: locate(headers, |h| h.contains("description"), d.description),
            access_level: locate(headers, |h| h.contains("access level"), d.access_level),
            resource_types: locate(headers, |h| h.contains("resource type"), d.resource_types),
            condition_keys: locate(headers, |h| h.contains("condition key"), d.condition_keys),
            dependent_actions: locate(headers, |h| h.contains("dependent"), d.dependent_actions),
        }
    }

    /// Cells holding dependent actions. Extra cells past the last column
    /// belong to the dependency column only when it is the rightmost one.
    fn dependency_cells<'a, 'b>(&self, cells: &'b [ElementRef<'a>]) -> &'b [ElementRef<'a>] {
        let dep = self.dependent_actions;
        let rightmost = [
            self.name,
            self.description,
            self.access_level,
            self.resource_types,
            self.condition_keys,
        ]
        .into_iter()
        .all(|col| col < dep);

        let range = if rightmost { dep..cells.len() } else { dep..dep + 1 };
        cells.get(range).unwrap_or_default()
    }
}

/// Row-processing state of one operations table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    Idle,
    /// Index of the most recently created operation
    Current(usize),
}

/// Accumulates operations for a single table
#[derive(Debug)]
pub struct OperationTable {
    columns: OperationColumns,
    state: RowState,
    operations: Vec<OperationRecord>,
}

impl OperationTable {
    pub fn new(columns: OperationColumns) -> Self {
        Self {
            columns,
            state: RowState::Idle,
            operations: Vec::new(),
        }
    }

    /// Process one data row. Anomalous rows are skipped and returned as errors.
    pub fn push_row(
        &mut self,
        index: usize,
        cells: &[ElementRef<'_>],
    ) -> Result<(), ParseAnomaly> {
        match cells.len() {
            n if n >= PRIMARY_ROW_MIN_CELLS => self.push_primary(index, cells),
            CONTINUATION_ROW_CELLS => self.push_continuation(index, cells),
            n => Err(ParseAnomaly::UnexpectedShape { row: index, cells: n }),
        }
    }

    pub fn finish(self) -> Vec<OperationRecord> {
        self.operations
    }

    fn push_primary(
        &mut self,
        index: usize,
        cells: &[ElementRef<'_>],
    ) -> Result<(), ParseAnomaly> {
        let cols = self.columns;
        let name = text_at(cells, cols.name);
        if name.is_empty() {
            self.state = RowState::Idle;
            return Err(ParseAnomaly::MissingName { row: index });
        }

        let mut op = OperationRecord::new(
            name,
            text_at(cells, cols.description),
            AccessLevel::from_doc_text(&text_at(cells, cols.access_level)),
        );

        if let Some(cell) = cells.get(cols.resource_types) {
            for resource in link_texts(cell) {
                op.add_resource_type(&resource);
            }
        }

        if let Some(cell) = cells.get(cols.condition_keys) {
            let keys = link_texts(cell).into_iter().filter(|k| k.contains(':')).collect();
            op.set_condition_keys(keys);
        }

        let trailing = cols.dependency_cells(cells);
        let text = trailing.iter().map(raw_text).collect::<Vec<_>>().join(" ");
        let links: Vec<String> = trailing.iter().flat_map(anchor_texts).collect();
        op.dependent_actions = extract_dependencies_with_links(&text, &links);

        op.refresh_flags();
        self.operations.push(op);
        self.state = RowState::Current(self.operations.len() - 1);
        Ok(())
    }

    fn push_continuation(
        &mut self,
        index: usize,
        cells: &[ElementRef<'_>],
    ) -> Result<(), ParseAnomaly> {
        let RowState::Current(current) = self.state else {
            return Err(ParseAnomaly::OrphanContinuation { row: index });
        };

        let op = &mut self.operations[current];
        for resource in link_texts(&cells[0]) {
            op.add_resource_type(&resource);
        }
        Ok(())
    }
}

/// Data rows of a table as cell lists; header-only rows are skipped
fn data_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = Vec<ElementRef<'a>>> + 'a {
    table
        .select(&ROW)
        .filter(|row| row.select(&DATA_CELL).next().is_some())
        .map(|row| row.select(&CELL).collect())
}

fn locate(headers: &[String], predicate: impl Fn(&str) -> bool, fallback: usize) -> usize {
    headers
        .iter()
        .position(|h| predicate(&h.to_lowercase()))
        .unwrap_or(fallback)
}

fn display_name(document: &Html) -> Option<String> {
    TITLE_CANDIDATES.iter().find_map(|selector| {
        document.select(selector).find_map(|el| {
            let text = cell_text(&el);
            DISPLAY_NAME_RE
                .captures(&text)
                .map(|caps| caps[1].trim().to_string())
                .filter(|name| !name.is_empty())
        })
    })
}

/// Element text with whitespace runs collapsed
fn cell_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Element text with text nodes kept apart, for pattern matching
fn raw_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

fn text_at(cells: &[ElementRef<'_>], index: usize) -> String {
    cells.get(index).map(cell_text).unwrap_or_default()
}

fn anchor_texts(cell: &ElementRef<'_>) -> Vec<String> {
    cell.select(&ANCHOR)
        .map(|a| cell_text(&a))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Anchor texts of a cell, or its whitespace/comma separated tokens when
/// the cell carries no links
fn link_texts(cell: &ElementRef<'_>) -> Vec<String> {
    let anchors = anchor_texts(cell);
    if !anchors.is_empty() {
        return anchors;
    }
    raw_text(cell)
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "<tr><th>Actions</th><th>Description</th><th>Access level</th>\
        <th>Resource types (*required)</th><th>Condition keys</th><th>Dependent actions</th></tr>";

    fn operations_page(rows: &str) -> String {
        format!("<html><body><table>{HEADER}{rows}</table></body></html>")
    }

    #[test]
    fn test_classify_tables() {
        let h = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(
            classify(&h(&["Actions", "Description", "Access level", "Resource types (*required)"])),
            Some(TableKind::Operations)
        );
        assert_eq!(
            classify(&h(&["Resource types", "ARN", "Condition keys"])),
            Some(TableKind::ResourceTypes)
        );
        assert_eq!(
            classify(&h(&["Condition keys", "Description", "Type"])),
            Some(TableKind::ConditionKeys)
        );
        assert_eq!(classify(&h(&["ACTIONS", "ACCESS LEVEL"])), Some(TableKind::Operations));
        assert_eq!(classify(&h(&["Name", "Value"])), None);
        assert_eq!(classify(&[]), None);
    }

    #[test]
    fn test_primary_row_with_list_access_and_no_resources() {
        let page = parse_page(&operations_page(
            "<tr><td>ListBuckets</td><td>Grants permission to list buckets</td>\
             <td>List</td><td></td><td></td><td></td></tr>",
        ));

        assert_eq!(page.operations.len(), 1);
        let op = &page.operations[0];
        assert_eq!(op.name, "ListBuckets");
        assert_eq!(op.description, "Grants permission to list buckets");
        assert_eq!(op.access_level, AccessLevel::List);
        assert!(op.resource_types.is_empty());
        assert!(!op.supports_resource_level_permissions);
        assert!(page.anomalies.is_empty());
    }

    #[test]
    fn test_continuation_rows_extend_previous_operation() {
        let page = parse_page(&operations_page(
            r##"<tr><td rowspan="3">GetObject</td><td rowspan="3">Grants permission to retrieve objects</td>
               <td rowspan="3">Read</td><td><a href="#object">object*</a></td>
               <td><a href="#k">s3:ExistingObjectTag/${TagKey}</a></td><td></td></tr>
               <tr><td><a href="#ap">accesspoint</a></td><td></td><td></td></tr>
               <tr><td><a href="#object">object*</a><a href="#mr">multiregionaccesspoint</a></td><td></td><td></td></tr>"##,
        ));

        assert_eq!(page.operations.len(), 1);
        let op = &page.operations[0];
        assert_eq!(op.resource_types, vec!["object*", "accesspoint", "multiregionaccesspoint"]);
        assert!(op.supports_resource_level_permissions);
        assert_eq!(op.condition_keys, vec!["s3:ExistingObjectTag/${TagKey}"]);
    }

    #[test]
    fn test_continuation_goes_to_most_recent_operation() {
        let page = parse_page(&operations_page(
            "<tr><td>First</td><td></td><td>Write</td><td><a>a</a></td><td></td><td></td></tr>\
             <tr><td>Second</td><td></td><td>Write</td><td><a>b</a></td><td></td><td></td></tr>\
             <tr><td><a>c</a></td><td></td><td></td></tr>",
        ));

        assert_eq!(page.operations[0].resource_types, vec!["a"]);
        assert_eq!(page.operations[1].resource_types, vec!["b", "c"]);
    }

    #[test]
    fn test_orphan_continuation_is_dropped() {
        let page = parse_page(&operations_page(
            "<tr><td><a>bucket</a></td><td></td><td></td></tr>\
             <tr><td>CreateBucket</td><td></td><td>Write</td><td><a>bucket*</a></td><td></td><td></td></tr>",
        ));

        assert_eq!(page.operations.len(), 1);
        assert_eq!(page.operations[0].resource_types, vec!["bucket*"]);
        assert_eq!(page.anomalies, vec![ParseAnomaly::OrphanContinuation { row: 0 }]);
    }

    #[test]
    fn test_state_resets_between_tables() {
        let html = format!(
            "<html><body>\
             <table>{HEADER}<tr><td>A</td><td></td><td>Read</td><td></td><td></td><td></td></tr></table>\
             <table>{HEADER}<tr><td><a>orphan</a></td><td></td><td></td></tr></table>\
             </body></html>"
        );
        let page = parse_page(&html);

        assert_eq!(page.operations.len(), 1);
        assert!(page.operations[0].resource_types.is_empty());
        assert_eq!(page.anomalies, vec![ParseAnomaly::OrphanContinuation { row: 0 }]);
    }

    #[test]
    fn test_unexpected_row_shapes_are_skipped() {
        let page = parse_page(&operations_page(
            "<tr><td>Only</td><td>four</td><td>cells</td><td>here</td></tr>\
             <tr><td></td><td>nameless</td><td>Read</td><td></td><td></td><td></td></tr>\
             <tr><td><a>x</a></td><td></td><td></td></tr>",
        ));

        assert!(page.operations.is_empty());
        assert_eq!(
            page.anomalies,
            vec![
                ParseAnomaly::UnexpectedShape { row: 0, cells: 4 },
                ParseAnomaly::MissingName { row: 1 },
                ParseAnomaly::OrphanContinuation { row: 2 },
            ]
        );
    }

    #[test]
    fn test_condition_flags_from_condition_column() {
        let page = parse_page(&operations_page(
            r##"<tr><td>TagResource</td><td></td><td>Tagging</td><td></td>
               <td><a href="#">aws:RequestTag/${TagKey}</a></td><td></td></tr>"##,
        ));

        let op = &page.operations[0];
        assert_eq!(op.access_level, AccessLevel::Tagging);
        assert!(op.has_request_tag_condition);
        assert!(!op.has_resource_tag_condition);
        assert!(!op.has_tag_keys_condition);
    }

    #[test]
    fn test_dependent_actions_from_trailing_cells() {
        let page = parse_page(&operations_page(
            "<tr><td>CreateFunction</td><td></td><td>Write</td><td></td><td></td>\
             <td><p>iam:PassRole</p><p>lambda:GetLayerVersion</p><p>iam:PassRole</p></td>\
             <td><a>ec2:DescribeSubnets</a></td></tr>",
        ));

        assert_eq!(
            page.operations[0].dependent_actions,
            vec!["iam:PassRole", "lambda:GetLayerVersion", "ec2:DescribeSubnets"]
        );
    }

    #[test]
    fn test_columns_located_by_header_text() {
        let html = "<table><tr><th>Access level</th><th>Actions</th><th>Description</th>\
            <th>Resource types</th><th>Condition keys</th><th>Dependent actions</th></tr>\
            <tr><td>Write</td><td>PutThing</td><td>Puts a thing</td><td><a>thing</a></td><td></td><td></td></tr>\
            </table>";
        let page = parse_page(html);

        let op = &page.operations[0];
        assert_eq!(op.name, "PutThing");
        assert_eq!(op.description, "Puts a thing");
        assert_eq!(op.access_level, AccessLevel::Write);
        assert_eq!(op.resource_types, vec!["thing"]);
    }

    #[test]
    fn test_dependency_column_before_condition_keys() {
        let html = "<table><tr><th>Actions</th><th>Description</th><th>Access level</th>\
            <th>Dependent actions</th><th>Resource types</th><th>Condition keys</th></tr>\
            <tr><td>PutObject</td><td></td><td>Write</td><td>iam:PassRole</td>\
            <td><a>object*</a></td><td><a>s3:ExistingObjectTag/${TagKey}</a></td></tr>\
            </table>";
        let page = parse_page(html);

        let op = &page.operations[0];
        assert_eq!(op.dependent_actions, vec!["iam:PassRole"]);
        assert_eq!(op.resource_types, vec!["object*"]);
        assert_eq!(op.condition_keys, vec!["s3:ExistingObjectTag/${TagKey}"]);
    }

    #[test]
    fn test_resource_and_condition_tables() {
        let html = r#"<html><head><title>ignored</title></head><body>
            <h1 class="topictitle">Actions, resources, and condition keys for Amazon S3</h1>
            <table>
              <tr><th>Resource types</th><th>ARN</th><th>Condition keys</th></tr>
              <tr><td>bucket</td><td><code>arn:${Partition}:s3:::${BucketName}</code></td><td></td></tr>
              <tr><td>orphan</td><td></td><td></td></tr>
              <tr><td></td><td>arn:nameless</td><td></td></tr>
            </table>
            <table>
              <tr><th>Condition keys</th><th>Description</th><th>Type</th></tr>
              <tr><td>s3:max-keys</td><td>Filters by max keys</td><td>Numeric</td></tr>
              <tr><td>s3:prefix</td><td>Filters by prefix</td><td></td></tr>
            </table>
            </body></html>"#;
        let page = parse_page(html);

        assert_eq!(page.display_name.as_deref(), Some("Amazon S3"));
        assert!(page.operations.is_empty());

        assert_eq!(page.resource_types.len(), 2);
        assert_eq!(page.resource_types[0].arn_formats, vec!["arn:${Partition}:s3:::${BucketName}"]);
        assert!(page.resource_types[1].arn_formats.is_empty());

        assert_eq!(page.condition_keys.len(), 2);
        assert_eq!(page.condition_keys[0].value_types, vec!["Numeric"]);
        assert_eq!(page.condition_keys[1].value_types, vec!["String"]);
    }

    #[test]
    fn test_two_column_condition_table() {
        let html = "<table><tr><th>Condition keys</th><th>Type</th></tr>\
            <tr><td>aws:TagKeys</td><td>ArrayOfString</td></tr></table>";
        let page = parse_page(html);
        assert_eq!(page.condition_keys[0].value_types, vec!["ArrayOfString"]);
    }

    #[test]
    fn test_display_name_strips_suffix_and_falls_back() {
        let page = parse_page(
            "<html><head><title>Actions, resources, and condition keys for AWS Glue - Service Authorization Reference</title></head></html>",
        );
        assert_eq!(page.display_name.as_deref(), Some("AWS Glue"));

        let page = parse_page("<html><body><p>nothing here</p></body></html>");
        assert_eq!(page.display_name, None);
        assert_eq!(page.into_record("glue").display_name, "glue");
    }

    #[test]
    fn test_empty_page_yields_empty_lists() {
        let page = parse_page("");
        assert!(page.operations.is_empty());
        assert!(page.resource_types.is_empty());
        assert!(page.condition_keys.is_empty());
    }
}

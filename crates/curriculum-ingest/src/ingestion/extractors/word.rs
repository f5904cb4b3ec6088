//! Word documents via docx-rs

use std::path::Path;

use docx_rs::{
    DocumentChild, InsertChild, MoveToChild, Paragraph, ParagraphChild, Run, RunChild, StructuredDataTag,
    StructuredDataTagChild, Table, TableCellContent, TableChild, TableRowChild,
};

use super::FormatExtractor;
use crate::error::{Error, Result};
use crate::processing::ExtractionVariant;

/// Extracts paragraph and table text from .docx files
///
/// Paragraphs are separated by blank lines; each table row becomes one line
/// with cells joined by `" | "`. Hyperlinks, tracked insertions and content
/// controls are read through to their runs.
pub struct WordExtractor;

impl FormatExtractor for WordExtractor {
    fn name(&self) -> &'static str {
        "docx-rs"
    }

    fn try_primary(&self, path: &Path, _variant: ExtractionVariant) -> Result<String> {
        let data = std::fs::read(path)?;
        let doc = docx_rs::read_docx(&data)
            .map_err(|e| Error::extraction("docx-rs", e.to_string()))?;

        let mut blocks = Vec::new();
        for child in &doc.document.children {
            match child {
                DocumentChild::Paragraph(p) => push_block(&mut blocks, paragraph_text(p)),
                DocumentChild::Table(table) => push_block(&mut blocks, table_text(table)),
                DocumentChild::StructuredDataTag(sdt) => sdt_blocks(sdt, &mut blocks),
                _ => {}
            }
        }

        Ok(blocks.join("\n\n"))
    }
}

fn push_block(blocks: &mut Vec<String>, text: String) {
    if !text.trim().is_empty() {
        blocks.push(text);
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    push_paragraph_children(&paragraph.children, &mut text);
    text
}

fn push_paragraph_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(run, out),
            ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, out),
            ParagraphChild::Insert(insert) => {
                for child in &insert.children {
                    if let InsertChild::Run(run) = child {
                        push_run(run, out);
                    }
                }
            }
            ParagraphChild::MoveTo(moved) => {
                for child in &moved.children {
                    if let MoveToChild::Run(run) = child {
                        push_run(run, out);
                    }
                }
            }
            ParagraphChild::StructuredDataTag(sdt) => push_sdt_inline(sdt, out),
            _ => {}
        }
    }
}

fn push_run(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

/// Inline content control: runs only, nested controls included
fn push_sdt_inline(sdt: &StructuredDataTag, out: &mut String) {
    for child in &sdt.children {
        match child {
            StructuredDataTagChild::Run(run) => push_run(run, out),
            StructuredDataTagChild::Paragraph(p) => push_paragraph_children(&p.children, out),
            StructuredDataTagChild::StructuredDataTag(nested) => push_sdt_inline(nested, out),
            _ => {}
        }
    }
}

/// Block-level content control: each paragraph and table is its own block
fn sdt_blocks(sdt: &StructuredDataTag, blocks: &mut Vec<String>) {
    let mut pending = String::new();
    for child in &sdt.children {
        match child {
            StructuredDataTagChild::Run(run) => push_run(run, &mut pending),
            StructuredDataTagChild::Paragraph(p) => {
                push_block(blocks, std::mem::take(&mut pending));
                push_block(blocks, paragraph_text(p));
            }
            StructuredDataTagChild::Table(table) => {
                push_block(blocks, std::mem::take(&mut pending));
                push_block(blocks, table_text(table));
            }
            StructuredDataTagChild::StructuredDataTag(nested) => {
                push_block(blocks, std::mem::take(&mut pending));
                sdt_blocks(nested, blocks);
            }
            _ => {}
        }
    }
    push_block(blocks, pending);
}

#[allow(irrefutable_let_patterns)]
fn table_text(table: &Table) -> String {
    let mut lines = Vec::new();
    for row in &table.rows {
        let TableChild::TableRow(row) = row else {
            continue;
        };
        let cells: Vec<String> = row
            .cells
            .iter()
            .filter_map(|cell| match cell {
                TableRowChild::TableCell(cell) => Some(cell),
                #[allow(unreachable_patterns)]
                _ => None,
            })
            .map(|cell| {
                cell.children
                    .iter()
                    .filter_map(|content| match content {
                        TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                        TableCellContent::Table(nested) => Some(table_text(nested)),
                        TableCellContent::StructuredDataTag(sdt) => {
                            let mut blocks = Vec::new();
                            sdt_blocks(sdt, &mut blocks);
                            Some(blocks.join(" "))
                        }
                        _ => None,
                    })
                    .filter(|t| !t.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        if cells.iter().any(|c| !c.trim().is_empty()) {
            lines.push(cells.join(" | "));
        }
    }
    lines.join("\n")
}

//! Cobertura XML serialization.
//!
//! The writer streams straight into the sink, so a failing sink surfaces
//! mid-document. Callers must discard partial output on error.
use std::io::{self, Write};
use std::sync::Arc;

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;

use crate::error::{ConvertError, Result};
use crate::model::{Class, Coverage, Line, Method, Package};

pub const DOCTYPE: &str =
    r#"coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd""#;

/// Serialize `doc` to `sink`: XML declaration, DOCTYPE, then the document tree.
pub fn write_document<W: Write>(doc: &Coverage, sink: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(sink, b'\t', 1);
    write_prolog(&mut writer)
        .and_then(|()| doc.write_xml(&mut writer))
        .map_err(output_error)?;

    let sink = writer.get_mut();
    sink.write_all(b"\n").map_err(ConvertError::Output)?;
    sink.flush().map_err(ConvertError::Output)
}

fn write_prolog<W: Write>(writer: &mut Writer<W>) -> quick_xml::Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::DocType(BytesText::from_escaped(DOCTYPE)))
}

/// Unwrap the sink's own error so its message reaches the caller unchanged.
fn output_error(err: quick_xml::Error) -> ConvertError {
    match err {
        quick_xml::Error::Io(e) => ConvertError::Output(
            Arc::try_unwrap(e).unwrap_or_else(|shared| io::Error::new(shared.kind(), shared.to_string())),
        ),
        other => ConvertError::Output(io::Error::new(io::ErrorKind::InvalidData, other.to_string())),
    }
}

trait WriteXml {
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()>;
}

/// `<name>` wrapping one element per item, as in `<lines><line/>...</lines>`.
fn write_list<W: Write, T: WriteXml>(
    writer: &mut Writer<W>,
    name: &str,
    items: &[T],
) -> quick_xml::Result<()> {
    writer
        .create_element(name)
        .write_inner_content(|w| -> quick_xml::Result<()> {
            for item in items {
                item.write_xml(w)?;
            }
            Ok(())
        })?;
    Ok(())
}

fn float(value: f64) -> String {
    format!("{value}")
}

// <!ELEMENT coverage (sources?,packages)>
impl WriteXml for Coverage {
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        let line_rate = float(self.line_rate);
        let branch_rate = float(self.branch_rate);
        let lines_covered = self.lines_covered.to_string();
        let lines_valid = self.lines_valid.to_string();
        let branches_covered = self.branches_covered.to_string();
        let branches_valid = self.branches_valid.to_string();
        let complexity = float(self.complexity);
        let timestamp = self.timestamp.to_string();

        writer
            .create_element("coverage")
            .with_attributes([
                ("line-rate", line_rate.as_str()),
                ("branch-rate", branch_rate.as_str()),
                ("lines-covered", lines_covered.as_str()),
                ("lines-valid", lines_valid.as_str()),
                ("branches-covered", branches_covered.as_str()),
                ("branches-valid", branches_valid.as_str()),
                ("complexity", complexity.as_str()),
                ("version", self.version.as_str()),
                ("timestamp", timestamp.as_str()),
            ])
            .write_inner_content(|w| {
                w.create_element("sources")
                    .write_inner_content(|w| -> quick_xml::Result<()> {
                        for source in &self.sources {
                            w.create_element("source")
                                .write_text_content(BytesText::new(source))?;
                        }
                        Ok(())
                    })?;
                write_list(w, "packages", &self.packages)
            })?;

        Ok(())
    }
}

// <!ELEMENT package (classes)>
impl WriteXml for Package {
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        let line_rate = float(self.line_rate);
        let branch_rate = float(self.branch_rate);
        let complexity = float(self.complexity);

        writer
            .create_element("package")
            .with_attributes([
                ("name", self.name.as_str()),
                ("line-rate", line_rate.as_str()),
                ("branch-rate", branch_rate.as_str()),
                ("complexity", complexity.as_str()),
            ])
            .write_inner_content(|w| write_list(w, "classes", &self.classes))?;

        Ok(())
    }
}

// <!ELEMENT class (methods,lines)>
impl WriteXml for Class {
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        let line_rate = float(self.line_rate);
        let branch_rate = float(self.branch_rate);
        let complexity = float(self.complexity);

        writer
            .create_element("class")
            .with_attributes([
                ("name", self.name.as_str()),
                ("filename", self.filename.as_str()),
                ("line-rate", line_rate.as_str()),
                ("branch-rate", branch_rate.as_str()),
                ("complexity", complexity.as_str()),
            ])
            .write_inner_content(|w| {
                write_list(w, "methods", &self.methods)?;
                write_list(w, "lines", &self.lines)
            })?;

        Ok(())
    }
}

// <!ELEMENT method (lines)>
impl WriteXml for Method {
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        let line_rate = float(self.line_rate);
        let branch_rate = float(self.branch_rate);
        let complexity = float(self.complexity);

        writer
            .create_element("method")
            .with_attributes([
                ("name", self.name.as_str()),
                ("signature", self.signature.as_str()),
                ("line-rate", line_rate.as_str()),
                ("branch-rate", branch_rate.as_str()),
                ("complexity", complexity.as_str()),
            ])
            .write_inner_content(|w| write_list(w, "lines", &self.lines))?;

        Ok(())
    }
}

// <!ELEMENT line (conditions*)>
impl WriteXml for Line {
    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        let number = self.number.to_string();
        let hits = self.hits.to_string();

        writer
            .create_element("line")
            .with_attributes([("number", number.as_str()), ("hits", hits.as_str())])
            .write_empty()?;

        Ok(())
    }
}

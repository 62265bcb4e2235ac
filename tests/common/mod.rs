#![allow(dead_code)]

use std::path::{Path, PathBuf};

use gocov_cobertura::resolve::{GoModule, GoPackage, StaticResolver};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

pub const MODULE: &str = "github.com/example/gocov";
pub const PACKAGE: &str = "github.com/example/gocov/testdata";

/// Root of the fixture module; Go sources live in its `testdata/` package.
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Resolver answering for the fixture module the way `go list` would.
pub fn testdata_resolver() -> StaticResolver {
    let dir = fixtures_dir();
    StaticResolver::new(vec![GoPackage {
        import_path: PACKAGE.to_string(),
        module: Some(GoModule {
            path: MODULE.to_string(),
            dir: dir.clone(),
        }),
        go_files: (1..=5)
            .map(|i| dir.join("testdata").join(format!("func{i}.go")))
            .collect(),
    }])
}

/// An element with its attributes, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Flatten a document into its elements, skipping text content.
pub fn elements(xml: &[u8]) -> Vec<Element> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut out = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let attrs = e
                    .attributes()
                    .map(|a| {
                        let a = a.unwrap();
                        (
                            String::from_utf8(a.key.as_ref().to_vec()).unwrap(),
                            a.unescape_value().unwrap().into_owned(),
                        )
                    })
                    .collect();
                out.push(Element {
                    name: String::from_utf8(e.name().as_ref().to_vec()).unwrap(),
                    attrs,
                });
            }
            _ => {}
        }
        buf.clear();
    }
    out
}

/// Compare two documents structurally: same elements and attributes in the
/// same order, rates equal numerically, timestamp and version ignored.
pub fn assert_same_shape(actual: &[u8], expected: &[u8]) {
    let normalize = |xml: &[u8]| -> Vec<Element> {
        elements(xml)
            .into_iter()
            .map(|mut el| {
                el.attrs.retain(|(k, _)| k != "timestamp" && k != "version");
                for (k, v) in &mut el.attrs {
                    if k.ends_with("-rate") {
                        let rate: f64 = v.parse().unwrap();
                        *v = format!("{rate:.6}");
                    }
                }
                el
            })
            .collect()
    };
    pretty_assertions::assert_eq!(normalize(actual), normalize(expected));
}

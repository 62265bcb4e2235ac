mod common;

use std::io::{self, Write};

use gocov_cobertura::resolve::{GoModule, GoPackage, StaticResolver};
use gocov_cobertura::{ConvertError, Converter, Ignore};

const PROFILE: &[u8] = include_bytes!("fixtures/testdata_set.txt");
const REFERENCE: &[u8] = include_bytes!("fixtures/testdata_set.xml");

/// Output sink whose reader has gone away.
struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "io: read/write on closed pipe",
        ))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn convert(converter: &Converter, input: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let mut out = Vec::new();
    converter.convert(input, &mut out)?;
    Ok(out)
}

fn fixture_ignore() -> Ignore {
    Ignore::new()
        .generated_files(true)
        .files(r"[\\/]func[45]\.go$")
        .unwrap()
}

#[test]
fn convert_set_mode() {
    let converter = Converter::new(common::testdata_resolver())
        .with_ignore(fixture_ignore())
        .with_timestamp(1700000000000);
    let doc = converter.build(&mut &PROFILE[..]).unwrap();

    assert_eq!(doc.sources.len(), 1);
    assert_eq!(doc.packages.len(), 1);

    let p = &doc.packages[0];
    assert_eq!(p.name, common::PACKAGE);
    assert_eq!(p.classes.len(), 2);

    let c = &p.classes[0];
    assert_eq!(c.name, "-");
    assert_eq!(c.filename, "testdata/func1.go");
    assert_eq!(c.methods.len(), 1);
    assert_eq!(c.lines.len(), 4);

    let m = &c.methods[0];
    assert_eq!(m.name, "Func1");
    let expected = [(4, 1), (5, 0), (6, 0), (7, 0)];
    let method_lines: Vec<_> = m.lines.iter().map(|l| (l.number, l.hits)).collect();
    let class_lines: Vec<_> = c.lines.iter().map(|l| (l.number, l.hits)).collect();
    assert_eq!(method_lines, expected);
    assert_eq!(class_lines, expected);

    let c = &p.classes[1];
    assert_eq!(c.name, "Type1");
    assert_eq!(c.filename, "testdata/func2.go");
    let methods: Vec<_> = c.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, ["Inc", "Dec", "Count"]);
}

#[test]
fn convert_set_mode_matches_reference() {
    let converter = Converter::new(common::testdata_resolver()).with_ignore(fixture_ignore());
    let xml = convert(&converter, PROFILE).unwrap();
    common::assert_same_shape(&xml, REFERENCE);
}

#[test]
fn convert_without_ignore_keeps_every_file() {
    let converter = Converter::new(common::testdata_resolver());
    let doc = converter.build(&mut &PROFILE[..]).unwrap();

    let files: Vec<_> = doc.packages[0]
        .classes
        .iter()
        .map(|c| c.filename.as_str())
        .collect();
    assert_eq!(
        files,
        [
            "testdata/func1.go",
            "testdata/func2.go",
            "testdata/func3.go",
            "testdata/func4.go",
            "testdata/func5.go",
        ]
    );
}

#[test]
fn convert_lines_are_ordered_and_rates_consistent() {
    let converter = Converter::new(common::testdata_resolver());
    let doc = converter.build(&mut &PROFILE[..]).unwrap();

    for class in doc.packages.iter().flat_map(|p| &p.classes) {
        assert!(class.lines.windows(2).all(|w| w[0].number < w[1].number));
        for method in &class.methods {
            assert!(method.lines.windows(2).all(|w| w[0].number < w[1].number));
        }

        let covered = class.lines.iter().filter(|l| l.hits > 0).count();
        let expected = if class.lines.is_empty() {
            0.0
        } else {
            covered as f64 / class.lines.len() as f64
        };
        assert!((0.0..=1.0).contains(&class.line_rate));
        assert_eq!(class.line_rate, expected);
        assert_eq!(class.branch_rate, 1.0);
    }
}

#[test]
fn convert_empty() {
    let converter = Converter::new(StaticResolver::default());
    let xml = convert(&converter, b"mode: set").unwrap();
    let text = String::from_utf8(xml.clone()).unwrap();

    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(text.contains(
        "<!DOCTYPE coverage SYSTEM \"http://cobertura.sourceforge.net/xml/coverage-04.dtd\">"
    ));

    let names: Vec<_> = common::elements(&xml)
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, ["coverage", "sources", "packages"]);
}

#[test]
fn convert_parse_error() {
    let converter = Converter::new(StaticResolver::default());
    let err = convert(&converter, b"invalid data").unwrap_err();
    assert_eq!(err.to_string(), "bad mode line: invalid data");
}

#[test]
fn convert_output_error() {
    let converter = Converter::new(StaticResolver::default());
    let err = converter.convert(&b"mode: set"[..], ClosedPipe).unwrap_err();
    assert!(matches!(err, ConvertError::Output(_)));
    assert_eq!(err.to_string(), "io: read/write on closed pipe");
}

#[test]
fn convert_output_error_with_packages() {
    let converter = Converter::new(common::testdata_resolver());
    let err = converter.convert(PROFILE, ClosedPipe).unwrap_err();
    assert_eq!(err.to_string(), "io: read/write on closed pipe");
}

#[test]
fn convert_unresolved_package() {
    let converter = Converter::new(StaticResolver::default());
    let err = convert(&converter, PROFILE).unwrap_err();
    assert!(err
        .to_string()
        .contains("package required when using go modules"));
}

#[test]
fn convert_package_without_module() {
    let resolver = StaticResolver::new(vec![GoPackage {
        import_path: common::PACKAGE.to_string(),
        module: None,
        go_files: vec![],
    }]);
    let err = convert(&Converter::new(resolver), PROFILE).unwrap_err();
    assert!(matches!(err, ConvertError::PackageRequired));
}

#[test]
fn convert_source_does_not_exist() {
    let resolver = StaticResolver::new(vec![GoPackage {
        import_path: String::new(),
        module: Some(GoModule {
            path: String::new(),
            dir: Default::default(),
        }),
        go_files: vec![],
    }]);
    let err = convert(
        &Converter::new(resolver),
        b"mode: set\ndoes-not-exist:1.1,2.2 1 1\n",
    )
    .unwrap_err();

    match err {
        ConvertError::SourceRead(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
        other => panic!("expected a read error, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn convert_source_permission_denied() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not-readable.go");
    std::fs::write(&path, "package p\n\nfunc F() {}\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::read(&path).is_ok() {
        // Privileged users bypass file modes.
        return;
    }

    let dir_name = dir.path().display().to_string();
    let resolver = StaticResolver::new(vec![GoPackage {
        import_path: dir_name.clone(),
        module: Some(GoModule {
            path: dir_name,
            dir: dir.path().to_path_buf(),
        }),
        go_files: vec![path.clone()],
    }]);
    let profile = format!("mode: set\n{}:3.10,3.12 0 1\n", path.display());
    let err = convert(&Converter::new(resolver), profile.as_bytes()).unwrap_err();

    assert!(matches!(err, ConvertError::SourceRead(ref e) if e.kind() == io::ErrorKind::PermissionDenied));
    assert!(err.to_string().contains("Permission denied"));
}

#[test]
fn convert_dirs_ignore() {
    let ignore = Ignore::new().dirs("^testdata$").unwrap();
    let converter = Converter::new(common::testdata_resolver()).with_ignore(ignore);
    let doc = converter.build(&mut &PROFILE[..]).unwrap();
    assert!(doc.packages.is_empty());
    assert!(doc.sources.is_empty());
}

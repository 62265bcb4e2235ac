//! In-memory Cobertura document. The aggregator builds it bottom-up, computing
//! every rate once at construction; the emitter only reads it.

/// Compute a coverage rate, returning 0.0 when the total is zero.
#[must_use]
pub fn rate(covered: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        covered as f64 / total as f64
    }
}

/// Go profiles carry no branch data, so every branch rate is reported as full.
pub const BRANCH_RATE: f64 = 1.0;

/// Complexity is not measured; Cobertura consumers expect a value anyway.
pub const COMPLEXITY: f64 = 1.0;

/// A single instrumented source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub number: u32,
    pub hits: u64,
}

/// Number of lines executed at least once.
#[must_use]
pub fn covered_lines(lines: &[Line]) -> u64 {
    lines.iter().filter(|l| l.hits > 0).count() as u64
}

fn line_rate(lines: &[Line]) -> f64 {
    rate(covered_lines(lines), lines.len() as u64)
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub signature: String,
    pub lines: Vec<Line>,
    pub line_rate: f64,
    pub branch_rate: f64,
    pub complexity: f64,
}

impl Method {
    /// `lines` must be in ascending line order without duplicates.
    pub fn new(name: String, lines: Vec<Line>) -> Self {
        Self {
            name,
            signature: String::new(),
            line_rate: line_rate(&lines),
            lines,
            branch_rate: BRANCH_RATE,
            complexity: COMPLEXITY,
        }
    }
}

/// One class per retained source file.
#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    /// Path relative to the module root.
    pub filename: String,
    pub methods: Vec<Method>,
    pub lines: Vec<Line>,
    pub line_rate: f64,
    pub branch_rate: f64,
    pub complexity: f64,
}

impl Class {
    pub fn new(name: String, filename: String, methods: Vec<Method>, lines: Vec<Line>) -> Self {
        Self {
            name,
            filename,
            methods,
            line_rate: line_rate(&lines),
            lines,
            branch_rate: BRANCH_RATE,
            complexity: COMPLEXITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub classes: Vec<Class>,
    pub line_rate: f64,
    pub branch_rate: f64,
    pub complexity: f64,
}

impl Package {
    pub fn new(name: String, classes: Vec<Class>) -> Self {
        let (covered, total) = totals(&classes);
        Self {
            name,
            classes,
            line_rate: rate(covered, total),
            branch_rate: BRANCH_RATE,
            complexity: COMPLEXITY,
        }
    }

    #[must_use]
    pub fn lines_covered(&self) -> u64 {
        totals(&self.classes).0
    }

    #[must_use]
    pub fn lines_valid(&self) -> u64 {
        totals(&self.classes).1
    }
}

fn totals(classes: &[Class]) -> (u64, u64) {
    classes.iter().fold((0, 0), |(covered, total), class| {
        (
            covered + covered_lines(&class.lines),
            total + class.lines.len() as u64,
        )
    })
}

/// Document root.
#[derive(Debug, Clone)]
pub struct Coverage {
    pub sources: Vec<String>,
    pub packages: Vec<Package>,
    pub line_rate: f64,
    pub branch_rate: f64,
    pub lines_covered: u64,
    pub lines_valid: u64,
    pub branches_covered: u64,
    pub branches_valid: u64,
    pub complexity: f64,
    pub version: String,
    /// Milliseconds since the Unix epoch, or 0 when not stamped.
    pub timestamp: u64,
}

impl Coverage {
    pub fn new(sources: Vec<String>, packages: Vec<Package>, timestamp: u64) -> Self {
        let lines_covered = packages.iter().map(Package::lines_covered).sum();
        let lines_valid = packages.iter().map(Package::lines_valid).sum();
        Self {
            sources,
            packages,
            line_rate: rate(lines_covered, lines_valid),
            branch_rate: BRANCH_RATE,
            lines_covered,
            lines_valid,
            branches_covered: 0,
            branches_valid: 0,
            complexity: COMPLEXITY,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
        }
    }
}

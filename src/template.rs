//! Example input files offered for download.

use std::io::{self, Write};

use clap::ValueEnum;

/// Grouping column plus value column.
pub const LONG_CSV: &str = "\
group,value
A,23.5
A,24.1
A,22.9
A,23.8
B,25.3
B,22.8
B,26.1
B,25.7
";

/// One column per group.
pub const WIDE_CSV: &str = "\
before,after
23.5,25.3
24.1,22.8
22.9,26.1
23.8,25.7
";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Layout {
    /// `group,value` rows
    #[default]
    Long,
    /// one column per group
    Wide,
}

impl Layout {
    pub fn contents(self) -> &'static str {
        match self {
            Layout::Long => LONG_CSV,
            Layout::Wide => WIDE_CSV,
        }
    }
}

pub fn write_template(layout: Layout, out: &mut impl Write) -> io::Result<()> {
    out.write_all(layout.contents().as_bytes())
}

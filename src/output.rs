//! Writer for the placement file:
//!
//! ```text
//! <number of caches used>
//! <cache id> <video id> <video id> ...
//! ```

use crate::types::Placement;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub fn write_placement<W: Write>(placement: &Placement, mut out: W) -> io::Result<()> {
    writeln!(out, "{}", placement.len())?;
    for (cache, videos) in &placement.caches {
        write!(out, "{cache}")?;
        for video in videos {
            write!(out, " {video}")?;
        }
        writeln!(out)?;
    }
    out.flush()
}

pub fn write_placement_file(placement: &Placement, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_placement(placement, BufWriter::new(file))
}

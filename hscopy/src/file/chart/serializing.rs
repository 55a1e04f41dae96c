use std::io::{self, Write};

use super::{ChartSections, Section};

/// Write every present section in canonical order.
///
/// Each section but the version one is preceded by a blank line and its header. Every line ends with CRLF.
pub(crate) fn serialize_sections<W: Write>(chart: &ChartSections, writer: &mut W) -> io::Result<()> {
	// BTreeMap iterates in the declaration order of `Section`
	for (section, lines) in &chart.sections {
		if *section != Section::Version {
			write!(writer, "\r\n[{section}]\r\n")?;
		}

		for line in lines {
			write!(writer, "{line}\r\n")?;
		}
	}

	Ok(())
}

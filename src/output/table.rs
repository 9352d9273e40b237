#![forbid(unsafe_code)]

use std::io;

/// Column table for batch summaries. Columns have fixed minimum widths and
/// only grow, never reflow; padding measures visible width so ANSI styling
/// inside a cell does not break alignment.
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    min_widths: Vec<usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let min_widths = vec![0; headers.len()];
        Self {
            headers,
            min_widths,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_min_widths(mut self, widths: impl IntoIterator<Item = usize>) -> Self {
        self.min_widths = widths.into_iter().collect();
        self.min_widths.resize(self.headers.len(), 0);
        self
    }

    pub fn row(&mut self, cols: impl IntoIterator<Item = impl Into<String>>) {
        self.rows.push(cols.into_iter().map(Into::into).collect());
    }

    pub fn print(&self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        self.write_to(&mut out)
    }

    pub fn write_csv(&self) -> io::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout().lock());
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            let plain: Vec<String> = row.iter().map(|c| strip_ansi(c)).collect();
            wtr.write_record(&plain)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_to(&self, mut out: impl io::Write) -> io::Result<()> {
        let mut widths = self.min_widths.clone();
        for (i, h) in self.headers.iter().enumerate() {
            widths[i] = widths[i].max(visible_width(h));
        }
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i >= widths.len() {
                    widths.push(0);
                }
                widths[i] = widths[i].max(visible_width(cell));
            }
        }

        let total: usize = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
        writeln!(&mut out, "{}", format_row(&self.headers, &widths))?;
        writeln!(&mut out, "{}", "-".repeat(total))?;
        for row in &self.rows {
            writeln!(&mut out, "{}", format_row(row, &widths))?;
        }
        Ok(())
    }
}

/// Display width of a cell with CSI escape sequences removed. Chars are
/// assumed to be one column wide; wide glyphs may still over-pad slightly.
#[must_use]
pub fn visible_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/// Removes `ESC [ ... <final>` sequences, keeping everything else.
#[must_use]
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            for t in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&t) {
                    break;
                }
            }
        }
    }
    out
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    let mut out = String::new();
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push_str(" | ");
        }
        let w = widths
            .get(i)
            .copied()
            .unwrap_or_else(|| visible_width(cell));
        out.push_str(cell);
        let pad = w.saturating_sub(visible_width(cell));
        for _ in 0..pad {
            out.push(' ');
        }
    }
    out
}

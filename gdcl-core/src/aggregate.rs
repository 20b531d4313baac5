use std::io::{self, Write};

/// Accumulates the rendered search output while mirroring every piece to an
/// immediate sink, so interactive callers see results as they stream and
/// still get the full buffer back for paging or logging.
pub struct ResultAggregator<W: Write> {
    sink: W,
    buffer: String,
    header_footer: bool,
}

impl<W: Write> ResultAggregator<W> {
    pub fn new(sink: W, header_footer: bool) -> ResultAggregator<W> {
        ResultAggregator {
            sink,
            buffer: String::new(),
            header_footer,
        }
    }

    fn push(&mut self, piece: &str) -> io::Result<()> {
        self.buffer.push_str(piece);
        self.sink.write_all(piece.as_bytes())
    }

    pub fn dictionary_header(&mut self, name: &str) -> io::Result<()> {
        if !self.header_footer {
            return Ok(());
        }
        self.push(&format!("== {} ==\n", name))
    }

    pub fn entry_line(&mut self, line: &str) -> io::Result<()> {
        self.push(line)?;
        self.push("\n")
    }

    pub fn dictionary_footer(&mut self, name: &str, count: usize) -> io::Result<()> {
        if !self.header_footer {
            return Ok(());
        }
        let noun = if count == 1 { "result" } else { "results" };
        self.push(&format!("\n{} {} found in [{}]\n\n\n", count, noun, name))
    }

    pub fn group_summary(&mut self, total: usize, group: &str, keyword: &str) -> io::Result<()> {
        if !self.header_footer {
            return Ok(());
        }
        self.push(&format!(
            "A total of {} result(s) found in [{}] for the term \"{}\".\n",
            total, group, keyword
        ))
    }

    /// The complete accumulated output.
    pub fn into_buffer(self) -> String {
        self.buffer
    }
}

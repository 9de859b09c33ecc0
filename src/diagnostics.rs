use std::io::Write;

/// Append-only sink for recoverable problems. Reporting never fails.
pub trait Diagnostics {
    fn report(&mut self, message: String);
}

impl Diagnostics for Vec<String> {
    fn report(&mut self, message: String) {
        self.push(message);
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Diagnostics for Silent {
    fn report(&mut self, _message: String) {}
}

/// Writes one line per message; write errors are ignored.
pub struct WriteDiagnostics<W: Write> {
    writer: W,
}

impl<W: Write> WriteDiagnostics<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Diagnostics for WriteDiagnostics<W> {
    fn report(&mut self, message: String) {
        let _ = writeln!(self.writer, "{}", message);
    }
}

/// Forwards every message as a `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&mut self, message: String) {
        tracing::warn!("{}", message);
    }
}

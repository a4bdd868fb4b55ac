//! Primary output: one line per matching host on stdout.

use std::io::{self, Write};

use console::Term;
use gmf_core::{Hit, Reporter};
use tracing::warn;

use super::spinner;

pub const BODY_SEPARATOR: &str = "_______________";

pub struct StdoutReporter {
    show_body: bool,
    /// Mirror addresses to stderr so a redirected run can still be watched.
    mirror: bool,
}

impl StdoutReporter {
    pub fn new(show_body: bool) -> Self {
        Self {
            show_body,
            mirror: !Term::stdout().is_term(),
        }
    }

    fn write_hit(&self, hit: &Hit) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(render(hit, self.show_body).as_bytes())?;
        out.flush()
    }
}

impl Reporter for StdoutReporter {
    fn report(&self, hit: &Hit) {
        let result: io::Result<()> = match spinner::active() {
            Some(handle) => handle.suspend(|| self.write_hit(hit)),
            None => self.write_hit(hit),
        };
        if let Err(err) = result {
            warn!("failed to write {}: {err}", hit.addr);
        }

        if self.mirror
            && let Err(err) = mirror(&mut spinner::LogWriter, hit)
        {
            warn!("failed to mirror {} to stderr: {err}", hit.addr);
        }
    }
}

/// One write, so the spinner is suspended once per hit.
fn mirror<W: Write>(out: &mut W, hit: &Hit) -> io::Result<()> {
    let line: String = format!("{}\n", hit.addr);
    out.write_all(line.as_bytes())
}

/// The exact bytes written for one hit.
pub fn render(hit: &Hit, show_body: bool) -> String {
    if show_body {
        format!("{}\n{}\n{BODY_SEPARATOR}\n", hit.addr, hit.body)
    } else {
        format!("{}\n", hit.addr)
    }
}

//! Terminal rendering for command results
//!
//! Every command prints one of a few line shapes: a status line (`ok` or
//! `fail` followed by a subject), an interception verdict, a heading, or
//! plain text. `NO_COLOR` wins over `--color`.

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Width of the status and verdict badge column
const BADGE_WIDTH: usize = 6;

/// Color choice for `--color`, after `NO_COLOR`
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Line-shaped writer over a color-capable stream
pub struct StyledOutput<W: WriteColor = StandardStream> {
    out: W,
}

impl StyledOutput {
    /// Writer on stdout
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            out: StandardStream::stdout(choice),
        }
    }
}

impl<W: WriteColor> StyledOutput<W> {
    fn paint(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let _ = self.out.set_color(ColorSpec::new().set_fg(color).set_bold(bold));
        let _ = write!(self.out, "{}", text);
        let _ = self.out.reset();
    }

    fn badge(&mut self, label: &str, color: Color) {
        self.paint(label, Some(color), true);
        let pad = BADGE_WIDTH.saturating_sub(label.len());
        let _ = write!(self.out, "{:pad$}", "", pad = pad);
    }

    /// `ok    subject` or `fail  subject`
    pub fn status(&mut self, ok: bool, subject: &str) {
        if ok {
            self.badge("ok", Color::Green);
        } else {
            self.badge("fail", Color::Red);
        }
        self.line(subject);
    }

    /// `YES operation` or `NO  operation (reason)`
    pub fn verdict(&mut self, operation: &str, excluded_because: Option<&str>) {
        match excluded_because {
            None => {
                self.paint("YES", Some(Color::Green), true);
                self.line(&format!(" {}", operation));
            }
            Some(reason) => {
                self.paint("NO ", Some(Color::Red), true);
                let _ = write!(self.out, " {}", operation);
                self.paint(&format!(" ({})", reason), Some(Color::Cyan), false);
                let _ = writeln!(self.out);
            }
        }
    }

    /// `subject: detail` with the subject in bold
    pub fn heading(&mut self, subject: &str, detail: &str) {
        self.paint(subject, None, true);
        self.line(&format!(": {}", detail));
    }

    /// Highlighted notice followed by a plain hint on the same line
    pub fn notice(&mut self, text: &str, hint: &str) {
        self.paint(text, Some(Color::Yellow), true);
        self.line(hint);
    }

    /// Plain line
    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

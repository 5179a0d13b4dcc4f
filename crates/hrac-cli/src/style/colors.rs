//! Semantic color palette for terminal output.

use owo_colors::{OwoColorize, Style};

fn allowed_style() -> Style {
    Style::new().green().bold()
}

fn denied_style() -> Style {
    Style::new().red().bold()
}

fn warning_style() -> Style {
    Style::new().yellow()
}

fn muted_style() -> Style {
    Style::new().dimmed()
}

fn header_style() -> Style {
    Style::new().bold()
}

fn code_style() -> Style {
    Style::new().blue()
}

/// Semantic styles, ignored when colors are disabled.
pub trait SemanticStyle {
    /// Granted access and successful writes (green bold).
    fn allowed(&self) -> String;
    /// Denied access and errors (red bold).
    fn denied(&self) -> String;
    fn warning(&self) -> String;
    fn muted(&self) -> String;
    fn header(&self) -> String;
    /// Identifiers: capability names, SQL, paths (blue).
    fn code(&self) -> String;
}

fn styled<T: std::fmt::Display + ?Sized>(value: &T, style: Style) -> String {
    if super::no_color() {
        value.to_string()
    } else {
        value.style(style).to_string()
    }
}

impl<T: std::fmt::Display + ?Sized> SemanticStyle for T {
    fn allowed(&self) -> String {
        styled(self, allowed_style())
    }

    fn denied(&self) -> String {
        styled(self, denied_style())
    }

    fn warning(&self) -> String {
        styled(self, warning_style())
    }

    fn muted(&self) -> String {
        styled(self, muted_style())
    }

    fn header(&self) -> String {
        styled(self, header_style())
    }

    fn code(&self) -> String {
        styled(self, code_style())
    }
}

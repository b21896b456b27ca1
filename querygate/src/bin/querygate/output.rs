use anyhow::Result;
use clap::ValueEnum;
use colored::{Color, Colorize};
use comfy_table::{Attribute, Cell, Table, presets};
use serde::Serialize;

/// How command results are rendered
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// One line per result
    Compact,
}

#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Results that can be rendered in every [`OutputFormat`].
pub trait TableDisplay {
    fn to_table(&self, manager: &OutputManager) -> Table;
    fn to_compact(&self) -> String;
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    pub fn is_json(&self) -> bool {
        self.options.output_format == OutputFormat::Json
    }

    /// Render a result in the configured format.
    pub fn render<T>(&self, data: &T) -> Result<String>
    where
        T: Serialize + TableDisplay,
    {
        Ok(match self.options.output_format {
            OutputFormat::Json => serde_json::to_string_pretty(data)?,
            OutputFormat::Table => data.to_table(self).to_string(),
            OutputFormat::Compact => data.to_compact(),
        })
    }

    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if !self.options.quiet {
            println!("{}", self.render(data)?);
        }
        Ok(())
    }

    pub fn success(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.paint("✓", message, Color::Green));
        }
    }

    /// Errors are printed even in quiet mode.
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.paint("✗", message, Color::Red));
    }

    pub fn warning(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.paint("!", message, Color::Yellow));
        }
    }

    pub fn info(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.paint("i", message, Color::Blue));
        }
    }

    pub fn verbose(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            eprintln!("{}", self.paint("→", message, Color::BrightBlack));
        }
    }

    pub fn heading(&self, text: &str) {
        if self.options.quiet {
            return;
        }
        if self.options.no_color {
            println!("{text}\n{}", "=".repeat(text.chars().count()));
        } else {
            println!("{}", text.bold());
        }
    }

    pub fn bullet(&self, text: &str) {
        if !self.options.quiet {
            println!("  • {text}");
        }
    }

    /// Table with a bold header row; plain ASCII borders when color is off.
    pub fn create_table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(if self.options.no_color {
            presets::ASCII_FULL
        } else {
            presets::UTF8_FULL_CONDENSED
        });
        table.set_header(headers.iter().map(|h| Cell::new(h).add_attribute(Attribute::Bold)));
        table
    }

    fn paint(&self, icon: &str, message: &str, color: Color) -> String {
        if self.options.no_color {
            format!("{icon} {message}")
        } else {
            format!("{} {}", icon.color(color), message.color(color))
        }
    }
}

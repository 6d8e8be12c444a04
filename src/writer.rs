use crate::cluster_status::ResourceStatus;
use crate::envelope::{Envelope, Record};
use eyre::{Result, WrapErr};
use std::error::Error as _;
use std::fmt::Debug;
use std::str::FromStr;
use term_table::row::Row;
use term_table::table_cell::TableCell;
use term_table::{Table, TableStyle};
use termcolor::{Color, ColorSpec, WriteColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(Self::Table),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown output format {}", other)),
        }
    }
}

/// Renders envelopes to a colour-capable stream.
pub struct Writer<W> {
    inner: W,
    format: OutputFormat,
    width: Option<usize>,
}

impl<W> Writer<W>
where
    W: WriteColor,
{
    pub fn new(inner: W, format: OutputFormat) -> Self {
        Self {
            inner,
            format,
            width: term_size::dimensions().map(|(w, _)| w),
        }
    }

    pub fn with_width(mut self, width: Option<usize>) -> Self {
        self.width = width;
        self
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    #[tracing::instrument(skip(self, envelope))]
    pub fn render<T: Record>(&mut self, envelope: &Envelope<T>) -> Result<()> {
        let items = envelope.items();
        if !items.is_empty() {
            match self.format {
                OutputFormat::Table => self.print_table(items)?,
                OutputFormat::Text => self.print_text(items)?,
            }
        }

        match envelope {
            Envelope::Items {
                next_token: Some(token),
                ..
            } => {
                writeln!(self.inner, "NextToken: {}", token).wrap_err("printing next token")?;
            }
            Envelope::Items {
                limit_reached: true,
                ..
            } => {
                writeln!(
                    self.inner,
                    "More results available; the last page was cut at the item limit and has no NextToken"
                )
                .wrap_err("printing limit notice")?;
            }
            Envelope::Items { .. } => {}
            Envelope::Partial { error, .. } => {
                let cause = error.source().map(|s| s.to_string());
                self.print_error(&error.to_string(), cause.as_deref())?;
            }
            Envelope::Error(error) => {
                self.print_error(&error.to_string(), None)?;
            }
        }

        Ok(())
    }

    fn print_table<T: Record>(&mut self, items: &[T]) -> Result<()> {
        let headers = T::headers();
        let mut table = Table::new();
        table.style = TableStyle::thin();
        if let Some(width) = self.width {
            table.max_column_width = (width / headers.len()).max(10);
        }

        table.add_row(Row::new(
            headers.iter().map(|h| TableCell::new(h)).collect::<Vec<_>>(),
        ));
        for item in items {
            let cells: Vec<_> = item.cells().into_iter().map(TableCell::new).collect();
            table.add_row(Row::new(cells));
        }

        write!(self.inner, "{}", table.render()).wrap_err("printing table")?;
        writeln!(self.inner).wrap_err("printing end of table")?;
        Ok(())
    }

    fn print_text<T: Record>(&mut self, items: &[T]) -> Result<()> {
        let status_column = T::status_column();
        for item in items {
            for (i, cell) in item.cells().iter().enumerate() {
                if i > 0 {
                    write!(self.inner, "\t").wrap_err("printing separator")?;
                }

                let spec = if status_column == Some(i) {
                    ResourceStatus::from(cell.as_str()).color_spec()
                } else {
                    None
                };
                match spec {
                    Some(spec) => {
                        self.inner.set_color(&spec).wrap_err("setting color")?;
                        write!(self.inner, "{}", cell).wrap_err("printing status")?;
                        self.inner.reset().wrap_err("resetting colour")?;
                    }
                    None => write!(self.inner, "{}", cell).wrap_err("printing cell")?,
                }
            }
            writeln!(self.inner).wrap_err("printing end of row")?;
        }
        Ok(())
    }

    fn print_error(&mut self, message: &str, cause: Option<&str>) -> Result<()> {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);
        self.inner.set_color(&spec).wrap_err("setting color")?;
        write!(self.inner, "error:").wrap_err("printing error prefix")?;
        self.inner.reset().wrap_err("resetting colour")?;

        let written = match cause {
            Some(cause) => writeln!(self.inner, " {} ({})", message, cause),
            None => writeln!(self.inner, " {}", message),
        };
        written.wrap_err("printing error")
    }
}

impl<W> Debug for Writer<W> {
    fn fmt(&self, w: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        w.write_str("writer")
    }
}

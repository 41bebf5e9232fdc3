use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::counts::Counts;
use crate::datetime::{DisplayZone, created_label, format_timestamp};
use crate::filter::{CategoryFilter, FilterState, StatusFilter};
use crate::notify::{NotificationKind, Notifier};
use crate::task::{Category, Task};

pub const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    zone: DisplayZone,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true) && io::stdout().is_terminal();
        let zone = cfg.display_zone()?;
        Ok(Self { color, zone })
    }

    pub fn plain(zone: DisplayZone) -> Self {
        Self { color: false, zone }
    }

    #[tracing::instrument(skip_all, fields(count = tasks.len()))]
    pub fn print_task_table(
        &self,
        tasks: &[&Task],
        filter: &FilterState,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.write_task_table(io::stdout().lock(), tasks, filter, now)
    }

    pub fn write_task_table<W: Write>(
        &self,
        mut out: W,
        tasks: &[&Task],
        filter: &FilterState,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "No tasks found.")?;
            if filter.is_default() {
                writeln!(out, "Your task list is empty. Add your first task to get started!")?;
            } else {
                writeln!(
                    out,
                    "No tasks match your current filters. Try changing your filter settings or add a new task."
                )?;
            }
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Category".to_string(),
            "Title".to_string(),
            "Created".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(&short_id(task.id.as_str()), "33");
            let done = if task.completed { "[x]" } else { "[ ]" }.to_string();
            let category = self.paint(task.category.label(), category_color(task.category));
            let title = if task.completed {
                self.paint(&task.title, "2")
            } else {
                task.title.clone()
            };
            let created = created_label(task.created_at, now, self.zone);

            rows.push(vec![id, done, category, title, created]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn print_task_info(&self, task: &Task) -> anyhow::Result<()> {
        self.write_task_info(io::stdout().lock(), task)
    }

    pub fn write_task_info<W: Write>(&self, mut out: W, task: &Task) -> anyhow::Result<()> {
        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        writeln!(
            out,
            "description {}",
            task.description.clone().unwrap_or_default()
        )?;
        writeln!(
            out,
            "status      {}",
            if task.completed { "completed" } else { "active" }
        )?;
        writeln!(out, "category    {}", task.category.label())?;
        writeln!(out, "created     {}", format_timestamp(task.created_at))?;
        Ok(())
    }

    pub fn print_counts(&self, counts: &Counts) -> anyhow::Result<()> {
        self.write_counts(io::stdout().lock(), counts)
    }

    pub fn write_counts<W: Write>(&self, mut out: W, counts: &Counts) -> anyhow::Result<()> {
        let status_rows = StatusFilter::ALL
            .into_iter()
            .map(|status| vec![status.as_str().to_string(), counts.status.get(status).to_string()])
            .collect();
        write_table(
            &mut out,
            vec!["Status".to_string(), "Tasks".to_string()],
            status_rows,
        )?;
        writeln!(out)?;

        let mut category_rows = vec![vec![
            "all".to_string(),
            counts.category(CategoryFilter::All).to_string(),
        ]];
        for (category, count) in counts.per_category() {
            category_rows.push(vec![category.as_str().to_string(), count.to_string()]);
        }
        write_table(
            &mut out,
            vec!["Category".to_string(), "Tasks".to_string()],
            category_rows,
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Prints notifications to the terminal: successes on stdout, errors on
/// stderr. `quiet` drops successes.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) -> anyhow::Result<()> {
        match kind {
            NotificationKind::Success => {
                if !self.quiet {
                    writeln!(io::stdout().lock(), "{message}")?;
                }
            }
            NotificationKind::Error => {
                writeln!(io::stderr().lock(), "{message}")?;
            }
        }
        Ok(())
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

fn category_color(category: Category) -> &'static str {
    match category {
        Category::Personal => "34",
        Category::Work => "31",
        Category::Shopping => "32",
        Category::Health => "35",
        Category::Other => "33",
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Renderer, short_id, strip_ansi};
    use crate::counts::Counts;
    use crate::datetime::DisplayZone;
    use crate::filter::{FilterPatch, FilterState, StatusFilter};
    use crate::task::{Category, Task, TaskId};

    fn renderer() -> Renderer {
        Renderer::plain(DisplayZone::resolve(Some("UTC")).expect("utc"))
    }

    fn render_to_string(f: impl FnOnce(&mut Vec<u8>)) -> String {
        let mut buf = Vec::new();
        f(&mut buf);
        String::from_utf8(buf).expect("utf8 output")
    }

    #[test]
    fn table_lists_tasks_in_given_order() {
        let now = Utc
            .with_ymd_and_hms(2026, 10, 18, 12, 0, 0)
            .single()
            .expect("valid now");
        let mut done = Task::new(
            TaskId::new("0123456789abcdef"),
            "File taxes".to_string(),
            None,
            Category::Work,
            now - Duration::days(1),
        );
        done.completed = true;
        let fresh = Task::new(
            TaskId::new("fedcba98"),
            "Buy milk".to_string(),
            None,
            Category::Shopping,
            now,
        );

        let output = render_to_string(|buf| {
            renderer()
                .write_task_table(buf, &[&fresh, &done], &FilterState::default(), now)
                .expect("render table");
        });
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("fedcba98"));
        assert!(lines[2].contains("[ ]"));
        assert!(lines[2].contains("Shopping"));
        assert!(lines[2].contains("Today"));
        assert!(lines[3].contains("01234567 "));
        assert!(!lines[3].contains("89abcdef"));
        assert!(lines[3].contains("[x]"));
        assert!(lines[3].contains("Yesterday"));
    }

    #[test]
    fn empty_table_message_depends_on_filter() {
        let now = Utc::now();
        let unfiltered = render_to_string(|buf| {
            renderer()
                .write_task_table(buf, &[], &FilterState::default(), now)
                .expect("render");
        });
        assert!(unfiltered.contains("Your task list is empty"));

        let mut filter = FilterState::default();
        filter.merge(FilterPatch::default().status(StatusFilter::Completed));
        let filtered = render_to_string(|buf| {
            renderer()
                .write_task_table(buf, &[], &filter, now)
                .expect("render");
        });
        assert!(filtered.contains("No tasks match your current filters"));
    }

    #[test]
    fn counts_show_zero_categories() {
        let task = Task::new(
            TaskId::new("a"),
            "Run".to_string(),
            None,
            Category::Health,
            Utc::now(),
        );
        let counts = Counts::tally(&[task]);
        let output = render_to_string(|buf| {
            renderer().write_counts(buf, &counts).expect("render counts");
        });

        assert!(output.contains("health   1"));
        assert!(output.contains("shopping 0"));
        assert!(output.contains("active    1"));
    }

    #[test]
    fn helpers_trim_ids_and_escape_codes() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789"), "01234567");
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}

use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::task::{Priority, Task};
use crate::theme::Theme;
use crate::view::{ListView, TaskView};

pub const EMPTY_INDICATOR: &str = "No tasks here.";

#[derive(Debug, Clone, Copy)]
struct Palette {
    id: &'static str,
    done: &'static str,
    low: &'static str,
    medium: &'static str,
    high: &'static str,
    muted: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                id: "33",
                done: "2;9",
                low: "32",
                medium: "33",
                high: "31",
                muted: "90",
            },
            Theme::Dark => Self {
                id: "93",
                done: "2;9",
                low: "92",
                medium: "93",
                high: "91",
                muted: "37",
            },
        }
    }

    fn priority(&self, priority: Priority) -> &'static str {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
        }
    }
}

/// Terminal presentation of [`ListView`] snapshots.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    palette: Palette,
}

impl Renderer {
    pub fn new(cfg: &Config, theme: Theme) -> Self {
        let color = cfg.get_bool("color").unwrap_or(true);

        Self {
            color: color && io::stdout().is_terminal(),
            palette: Palette::for_theme(theme),
        }
    }

    pub fn plain() -> Self {
        Self {
            color: false,
            palette: Palette::for_theme(Theme::Light),
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.palette = Palette::for_theme(theme);
    }

    /// Full redraw: the indicator or the table, then the summary line.
    #[tracing::instrument(skip(self, out, view), fields(items = view.items.len()))]
    pub fn write_list<W: Write>(&self, mut out: W, view: &ListView) -> anyhow::Result<()> {
        if view.empty {
            writeln!(out, "{}", self.paint(EMPTY_INDICATOR, self.palette.muted))?;
        } else {
            let headers = vec![
                "ID".to_string(),
                "Done".to_string(),
                "Task".to_string(),
                "Date".to_string(),
                "Priority".to_string(),
            ];
            let rows = view.items.iter().map(|item| self.row(item)).collect();
            write_table(&mut out, headers, rows)?;
        }

        writeln!(out)?;
        writeln!(out, "{}  [{}]", view.summary, view.filter)?;
        Ok(())
    }

    pub fn write_created<W: Write>(&self, mut out: W, task: &Task) -> anyhow::Result<()> {
        writeln!(
            out,
            "Created task {}.",
            self.paint(&task.id.to_string(), self.palette.id)
        )?;
        Ok(())
    }

    pub fn write_theme<W: Write>(&self, mut out: W, theme: Theme) -> anyhow::Result<()> {
        writeln!(out, "Theme: {theme}")?;
        Ok(())
    }

    fn row(&self, item: &TaskView) -> Vec<String> {
        let done = if item.completed { "[x]" } else { "[ ]" };
        let text = if item.completed {
            self.paint(&item.text, self.palette.done)
        } else {
            item.text.clone()
        };

        vec![
            self.paint(&item.id.to_string(), self.palette.id),
            done.to_string(),
            text,
            item.date_label.clone().unwrap_or_default(),
            self.paint(item.priority_label, self.palette.priority(item.priority)),
        ]
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
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
        for (idx, cell) in row.iter().enumerate().take(column_count) {
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
    use chrono::{NaiveDate, Utc};

    use super::{EMPTY_INDICATOR, Renderer, strip_ansi};
    use crate::config::Config;
    use crate::filter::FilterMode;
    use crate::theme::Theme;
    use crate::task::{Priority, Task, TaskId};
    use crate::view::build;

    fn render(tasks: &[Task], mode: FilterMode) -> String {
        let today = NaiveDate::from_ymd_opt(2025, 9, 10).expect("valid date");
        let view = build(tasks, mode, today);
        let mut buf = Vec::new();
        Renderer::plain()
            .write_list(&mut buf, &view)
            .expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn empty_view_prints_indicator_and_summary() {
        let out = render(&[], FilterMode::All);
        assert!(out.starts_with(EMPTY_INDICATOR));
        assert!(out.contains("0 task(s) remaining"));
        assert!(!out.contains("Priority"));
    }

    #[test]
    fn table_lists_each_visible_task() {
        let now = Utc::now();
        let tasks = vec![
            Task::new_pending(
                TaskId(11),
                "Média check".to_string(),
                Priority::Medium,
                NaiveDate::from_ymd_opt(2025, 9, 10),
                now,
            ),
            Task::new_pending(TaskId(10), "Done".to_string(), Priority::High, None, now)
                .with_completed(true),
        ];

        let out = render(&tasks, FilterMode::All);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("[ ]"));
        assert!(lines[2].contains("Today - 10/09/2025"));
        assert!(lines[2].contains("Média"));
        assert!(lines[3].contains("[x]"));
        assert!(lines[3].contains("Alta"));
        assert!(out.contains("1 task(s) remaining  [all]"));
    }

    #[test]
    fn color_setting_uses_config_booleans() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("color".to_string(), "n".to_string())]);
        assert!(!Renderer::new(&cfg, Theme::Dark).color);

        cfg.apply_overrides(vec![("rc.color".to_string(), "y".to_string())]);
        assert_eq!(cfg.get_bool("color"), Some(true));
        let renderer = Renderer::new(&cfg, Theme::Dark);

        let mut buf = Vec::new();
        renderer
            .write_theme(&mut buf, Theme::Dark)
            .expect("write theme");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "Theme: dark\n");
    }

    #[test]
    fn created_message_names_the_id() {
        let task = Task::new_pending(
            TaskId(42),
            "x".to_string(),
            Priority::Low,
            None,
            Utc::now(),
        );
        let mut buf = Vec::new();
        Renderer::plain()
            .write_created(&mut buf, &task)
            .expect("write created");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "Created task 42.\n");
    }

    #[test]
    fn strips_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[31mAlta\x1b[0m"), "Alta");
    }
}

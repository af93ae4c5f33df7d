//! Live multi-line progress display.
//!
//! Output has two parts: a scrolling list of item lines (each optionally
//! followed by indented detail lines) and one ephemeral status line at the
//! bottom. Items keep the position they were given at creation, so workers
//! can update them in any order; every redraw walks the cursor up from the
//! status line by the number of rows below the target and back down again.
//!
//! The cursor position is never stored. It is recomputed from item heights
//! on every operation, and the cursor always rests at column 0 of the status
//! row between operations.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::bar::{BarStyle, format_progress};
use crate::error::{Error, Result};
use crate::term::{self, CR, Tone};

const INTERRUPTED: &str = "Interrupted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub bar: BarStyle,
    /// Prefix for every detail line.
    pub indent: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            bar: BarStyle::default(),
            indent: "    ".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct DetailLine {
    indent: String,
    tone: Tone,
    text: String,
}

impl DetailLine {
    fn render(&self) -> String {
        format!("{}{}\n", self.indent, term::paint(self.tone, &self.text))
    }
}

#[derive(Debug)]
struct ItemState {
    label: String,
    tone: Tone,
    updated: bool,
    failed: bool,
    hidden: bool,
    details: Vec<DetailLine>,
}

impl ItemState {
    // An empty label only reserves an ordinal slot, so it never occupies a row.
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            tone: Tone::Pending,
            updated: false,
            failed: false,
            hidden: label.is_empty(),
            details: Vec::new(),
        }
    }

    fn height(&self) -> usize {
        usize::from(!self.hidden) + self.details.len()
    }

    fn render(&self) -> String {
        term::paint(self.tone, &self.label)
    }
}

struct Screen {
    sink: Box<dyn Write + Send>,
    options: DisplayOptions,
    items: Vec<ItemState>,
    /// Columns occupied by the status text currently on screen.
    status_width: Option<usize>,
    current: usize,
    total: usize,
    finished: bool,
}

impl Screen {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.sink.write_all(text.as_bytes())
    }

    fn write_flush(&mut self, text: &str) -> io::Result<()> {
        self.write(text)?;
        self.sink.flush()
    }

    fn status(&mut self, message: &str) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.clear()?;
        if !message.is_empty() {
            self.write_flush(&format!("{CR}{message}{CR}"))?;
            self.status_width = Some(message.trim_end().width());
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if let Some(width) = self.status_width.take() {
            self.write_flush(&format!("{CR}{}{CR}", " ".repeat(width)))?;
        }
        Ok(())
    }

    fn progress(&mut self) -> Result<()> {
        let line = format_progress(self.current, self.total, &self.options.bar);
        self.status(&line)
    }

    fn finish(&mut self, message: &str) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.clear()?;
        self.finished = true;
        if !message.is_empty() {
            self.write_flush(&format!("{message}\n"))?;
        }
        Ok(())
    }

    fn add_item(&mut self, label: &str) -> Result<usize> {
        let index = self.items.len();
        self.items.push(ItemState::new(label));
        if !label.is_empty() {
            self.clear()?;
            self.draw_item(index, "", "\n")?;
            self.sink.flush()?;
        }
        self.current += 1;
        self.progress()?;
        Ok(index)
    }

    fn draw_item(&mut self, index: usize, prefix: &str, suffix: &str) -> io::Result<()> {
        let item = &self.items[index];
        if self.finished || item.hidden {
            return Ok(());
        }
        let line = format!("{prefix}{}{suffix}", item.render());
        self.write(&line)
    }

    /// Rows between the status line and the first row of `items[index]`.
    fn rows_from(&self, index: usize) -> usize {
        self.items
            .get(index..)
            .map_or(0, |rest| rest.iter().map(ItemState::height).sum())
    }

    fn redraw_item(&mut self, index: usize) -> Result<()> {
        let rows = self.rows_from(index);
        if rows == 0 {
            self.draw_item(index, "", "")?;
        } else {
            let up = format!("{CR}{}", term::cursor_up(rows));
            let down = format!("{CR}{}", term::cursor_down(rows));
            self.draw_item(index, &up, &down)?;
        }
        self.sink.flush()?;
        Ok(())
    }

    fn update(&mut self, index: usize, suffix: &str, failed: bool) -> Result<()> {
        let item = &mut self.items[index];
        if item.hidden {
            return Ok(());
        }
        item.updated = true;
        if failed {
            item.failed = true;
            item.tone = Tone::Failure;
        } else if !item.failed {
            item.tone = Tone::Success;
        }
        item.label.push_str(suffix);
        self.redraw_item(index)
    }

    fn extra_info(&mut self, index: usize, text: &str, tone: Tone) -> Result<()> {
        let indent = self.options.indent.clone();
        let lines: Vec<DetailLine> = split_lines(text)
            .into_iter()
            .map(|line| DetailLine {
                indent: indent.clone(),
                tone,
                text: line.to_string(),
            })
            .collect();
        if lines.is_empty() || self.finished {
            return Ok(());
        }
        if self.items[index].hidden {
            return Err(Error::HiddenItem { index });
        }
        self.items[index].details.extend(lines.iter().cloned());

        let below = self.rows_from(index + 1);
        let mut out = String::new();
        if below > 0 {
            out.push_str(&term::cursor_up(below));
        }
        out.push_str(&term::insert_lines(lines.len()));
        for line in &lines {
            out.push_str(&line.render());
        }
        // The insertion shifted every later row down and may have pushed the
        // bottom of the list off screen, so everything below gets reprinted.
        for item in &self.items[index + 1..] {
            if !item.hidden {
                out.push_str(&item.render());
                out.push('\n');
            }
            for detail in &item.details {
                out.push_str(&detail.render());
            }
        }
        self.write(&out)?;
        self.progress()
    }

    fn hide(&mut self, index: usize) -> Result<()> {
        let item = &self.items[index];
        if !item.details.is_empty() {
            return Err(Error::HideWithDetail {
                index,
                lines: item.details.len(),
            });
        }
        if self.finished || item.hidden {
            return Ok(());
        }
        self.items[index].hidden = true;
        let below = self.rows_from(index);
        let mut out = term::cursor_up(below + 1);
        out.push_str(&term::delete_lines(1));
        if below > 0 {
            out.push_str(&term::cursor_down(below));
        }
        self.write_flush(&out)?;
        Ok(())
    }

    fn finish_item(&mut self, index: usize, hide: bool) -> Result<()> {
        let item = &mut self.items[index];
        if item.hidden {
            return Ok(());
        }
        if !item.updated && !item.failed {
            item.tone = Tone::Neutral;
        }
        if hide {
            self.hide(index)
        } else {
            self.redraw_item(index)
        }
    }
}

/// Split on `\n`, `\r\n` and bare `\r`. A trailing terminator does not yield
/// an empty last line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\r', '\n']) {
            Some(end) => {
                lines.push(&rest[..end]);
                let skip = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[end + skip..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

fn lock(screen: &Mutex<Screen>) -> MutexGuard<'_, Screen> {
    screen.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to the terminal display. Cloning yields another handle to
/// the same screen; all rendering is serialized by one lock.
#[derive(Clone)]
pub struct Display {
    screen: Arc<Mutex<Screen>>,
}

impl Display {
    pub fn new<W>(sink: W, options: DisplayOptions) -> Self
    where
        W: Write + Send + 'static,
    {
        let screen = Screen {
            sink: Box::new(sink),
            options,
            items: Vec::new(),
            status_width: None,
            current: 0,
            total: 0,
            finished: false,
        };
        Self {
            screen: Arc::new(Mutex::new(screen)),
        }
    }

    pub fn stdout(options: DisplayOptions) -> Self {
        Self::new(io::stdout(), options)
    }

    /// Replace the status line with `message`. An empty message just clears it.
    pub fn status(&self, message: &str) -> Result<()> {
        lock(&self.screen).status(message)
    }

    /// Erase the status line. A second call without a new status is a no-op.
    pub fn clear(&self) -> Result<()> {
        lock(&self.screen).clear()
    }

    /// Print a new item line below the existing ones and advance the bar.
    ///
    /// The returned handle addresses this line for the rest of the run. An
    /// empty label reserves a slot (it still counts toward progress) without
    /// printing anything.
    pub fn item(&self, label: &str) -> Result<Item> {
        let index = lock(&self.screen).add_item(label)?;
        Ok(Item {
            screen: Arc::clone(&self.screen),
            index,
        })
    }

    /// Set the number of items expected in total and redraw the bar.
    pub fn set_limit(&self, total: usize) -> Result<()> {
        let mut screen = lock(&self.screen);
        screen.total = total;
        screen.progress()
    }

    pub fn progress(&self) -> Result<()> {
        lock(&self.screen).progress()
    }

    /// Clear the status line and print a final message on its own line.
    ///
    /// Nothing is written to the terminal after this, by any handle.
    pub fn finish(&self, message: &str) -> Result<()> {
        lock(&self.screen).finish(message)
    }

    pub fn is_finished(&self) -> bool {
        lock(&self.screen).finished
    }

    /// Rows currently occupied by items and their detail lines.
    pub fn height(&self) -> usize {
        lock(&self.screen).rows_from(0)
    }

    pub fn len(&self) -> usize {
        lock(&self.screen).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `body` with the status line cleared on every way out.
    ///
    /// An interruption anywhere in the returned error chain is rendered as a
    /// final `Interrupted` line and swallowed here, yielding `Ok(None)`. Any
    /// other error is passed through untouched.
    pub fn scope<T, F>(&self, body: F) -> anyhow::Result<Option<T>>
    where
        F: FnOnce(&Display) -> anyhow::Result<T>,
    {
        let _guard = ClearOnDrop(self);
        match body(self) {
            Ok(value) => {
                self.clear()?;
                Ok(Some(value))
            }
            Err(err) if is_interrupted(&err) => {
                self.clear()?;
                self.finish(INTERRUPTED)?;
                Ok(None)
            }
            Err(err) => {
                let _ = self.clear();
                Err(err)
            }
        }
    }
}

fn is_interrupted(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<Error>().is_some_and(Error::is_interrupted))
}

struct ClearOnDrop<'a>(&'a Display);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        let _ = self.0.clear();
    }
}

/// One line of the display, owned by the task that reports on it.
pub struct Item {
    screen: Arc<Mutex<Screen>>,
    index: usize,
}

impl Item {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Append `suffix` to the label and recolor the line: red once any update
    /// failed (that sticks), green otherwise. Ignored once the item is hidden.
    pub fn update(&self, suffix: &str, failed: bool) -> Result<()> {
        lock(&self.screen).update(self.index, suffix, failed)
    }

    /// Insert indented detail lines directly below this item.
    ///
    /// Fails with [`Error::HiddenItem`] if the item has been hidden.
    pub fn extra_info(&self, text: &str, tone: Tone) -> Result<()> {
        lock(&self.screen).extra_info(self.index, text, tone)
    }

    pub fn error_info(&self, text: &str) -> Result<()> {
        self.extra_info(text, Tone::Failure)
    }

    /// Mark the item done. A line that was never updated loses its pending
    /// color; with `hide` it is removed from the screen instead.
    pub fn finished(&self, hide: bool) -> Result<()> {
        lock(&self.screen).finish_item(self.index, hide)
    }

    /// Remove the line from the screen for good, collapsing the rows below.
    ///
    /// Fails with [`Error::HideWithDetail`] while detail lines are attached.
    pub fn hide(&self) -> Result<()> {
        lock(&self.screen).hide(self.index)
    }

    pub fn label(&self) -> String {
        lock(&self.screen).items[self.index].label.clone()
    }

    pub fn is_hidden(&self) -> bool {
        lock(&self.screen).items[self.index].hidden
    }

    pub fn is_updated(&self) -> bool {
        lock(&self.screen).items[self.index].updated
    }

    pub fn is_failed(&self) -> bool {
        lock(&self.screen).items[self.index].failed
    }

    pub fn detail_lines(&self) -> Vec<String> {
        lock(&self.screen).items[self.index]
            .details
            .iter()
            .map(|detail| format!("{}{}", detail.indent, detail.text))
            .collect()
    }
}

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use taskboard::{Display, DisplayOptions};

/// In-memory sink that can be inspected while a `Display` still owns a clone.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.bytes.lock().unwrap().clone()).unwrap()
    }

    /// Everything written since the last call.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.bytes.lock().unwrap());
        String::from_utf8(bytes).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn display() -> (Display, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let display = Display::new(buffer.clone(), DisplayOptions::default());
    (display, buffer)
}

/// Readable rendering of escape sequences for assertion failures, e.g.
/// `{up1}{ins1}    {red}oops{reset}\n`.
pub fn show_ansi(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' if chars.next_if_eq(&'[').is_some() => {
                let mut digits = String::new();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    digits.push(d);
                }
                let token = match (chars.next(), digits.as_str()) {
                    (Some('A'), n) => format!("up{n}"),
                    (Some('B'), n) => format!("down{n}"),
                    (Some('L'), n) => format!("ins{n}"),
                    (Some('M'), n) => format!("del{n}"),
                    (Some('m'), "") => "reset".to_string(),
                    (Some('m'), "31") => "red".to_string(),
                    (Some('m'), "32") => "green".to_string(),
                    (Some('m'), "33") => "brown".to_string(),
                    (other, n) => format!("esc[{n}{}", other.unwrap_or('?')),
                };
                out.push('{');
                out.push_str(&token);
                out.push('}');
            }
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n\n"),
            c => out.push(c),
        }
    }
    out
}

/// Minimal terminal: relative cursor movement, line insert/delete, scrolling
/// at the bottom and wrapping at the right margin. Colors are dropped.
pub struct Terminal {
    width: usize,
    height: usize,
    rows: Vec<Vec<char>>,
    x: usize,
    y: usize,
}

impl Terminal {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rows: vec![Vec::new(); height],
            x: 0,
            y: 0,
        }
    }

    pub fn cursor_row(&self) -> usize {
        self.y
    }

    pub fn row(&self, index: usize) -> String {
        self.rows[index].iter().collect::<String>().trim_end().to_string()
    }

    pub fn feed(&mut self, text: &str) {
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\x1b' => {
                    assert_eq!(chars.next(), Some('['), "unsupported escape");
                    let mut digits = String::new();
                    while let Some(d) = chars.next_if(char::is_ascii_digit) {
                        digits.push(d);
                    }
                    let command = chars.next().expect("truncated escape sequence");
                    let n = digits.parse::<usize>().unwrap_or(1);
                    self.control(command, n);
                }
                '\r' => self.x = 0,
                '\n' => self.newline(),
                c => self.put_char(c),
            }
        }
    }

    fn control(&mut self, command: char, n: usize) {
        match command {
            'A' => self.y = self.y.saturating_sub(n),
            'B' => self.y = (self.y + n).min(self.height - 1),
            'L' => {
                for _ in 0..n {
                    self.rows.insert(self.y, Vec::new());
                }
                self.rows.truncate(self.height);
            }
            'M' => {
                for _ in 0..n.min(self.height - self.y) {
                    self.rows.remove(self.y);
                    self.rows.push(Vec::new());
                }
            }
            'm' => {}
            other => panic!("unsupported control sequence {other:?}"),
        }
    }

    fn newline(&mut self) {
        self.x = 0;
        if self.y + 1 == self.height {
            self.rows.remove(0);
            self.rows.push(Vec::new());
        } else {
            self.y += 1;
        }
    }

    fn put_char(&mut self, c: char) {
        if self.x >= self.width {
            self.newline();
        }
        let row = &mut self.rows[self.y];
        if row.len() <= self.x {
            row.resize(self.x + 1, ' ');
        }
        row[self.x] = c;
        self.x += 1;
    }
}

impl std::fmt::Display for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rows: Vec<String> = (0..self.height).map(|i| self.row(i)).collect();
        write!(f, "{}", rows.join("\n").trim_end())
    }
}

pub fn render(output: &str) -> Terminal {
    let mut terminal = Terminal::new(400, 200);
    terminal.feed(output);
    terminal
}

use serde::{Deserialize, Serialize};

/// Appearance of the bottom progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarStyle {
    pub width: usize,
    pub fill: char,
    pub empty: char,
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            width: 20,
            fill: '#',
            empty: '.',
        }
    }
}

impl BarStyle {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.width == 0 {
            anyhow::bail!("bar width must be at least 1");
        }
        if self.fill == self.empty {
            anyhow::bail!("bar fill and empty characters must differ");
        }
        Ok(())
    }

    pub fn render(&self, current: usize, total: usize) -> String {
        bar(current, total, self.width, self.fill, self.empty)
    }
}

/// Fixed-width bar with `floor(width * current / max(total, 1))` filled cells,
/// clamped to `width`. Partial cells are never drawn.
pub fn bar(current: usize, total: usize, width: usize, fill: char, empty: char) -> String {
    let scaled = width as u128 * current as u128 / total.max(1) as u128;
    let filled = scaled.min(width as u128) as usize;
    let mut out = String::with_capacity(width);
    out.extend(std::iter::repeat_n(fill, filled));
    out.extend(std::iter::repeat_n(empty, width - filled));
    out
}

/// Status line text: `[bar] current/total`.
pub fn format_progress(current: usize, total: usize, style: &BarStyle) -> String {
    format!("[{}] {current}/{total}", style.render(current, total))
}

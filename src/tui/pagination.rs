use ratatui::layout::Rect;
use std::ops::RangeInclusive;

/// Gap between two page buttons
const GAP: u16 = 1;

/// Page numbers that get a control: exactly 1..=total_pages
pub fn pagination_controls(total_pages: u64) -> RangeInclusive<u32> {
    1..=clamp_total(total_pages)
}

fn clamp_total(total_pages: u64) -> u32 {
    u32::try_from(total_pages).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Page,
    /// Shows the window before the visible one
    Previous,
    /// Shows the window after the visible one
    Next,
}

/// One clickable control, positioned relative to the bar's inner area.
/// `number` is the page it activates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageButton {
    pub number: u32,
    pub kind: ButtonKind,
    pub current: bool,
    pub x: u16,
    pub row: u16,
    pub width: u16,
}

impl PageButton {
    pub fn label(&self) -> String {
        match self.kind {
            ButtonKind::Page => format!(" {} ", self.number),
            ButtonKind::Previous => " ‹ ".to_string(),
            ButtonKind::Next => " › ".to_string(),
        }
    }

    /// Screen rectangle of the button inside `inner`
    pub fn rect(&self, inner: Rect) -> Rect {
        Rect {
            x: inner.x + self.x,
            y: inner.y + self.row,
            width: self.width,
            height: 1,
        }
    }
}

/// Lay the controls out on a grid of `width` x `max_rows` cells.
///
/// When every page fits, all of 1..=total_pages are shown. Otherwise the
/// pages are split into fixed windows and only the window holding `current`
/// is laid out, framed by `‹`/`›` controls that jump to the neighbouring
/// windows. Only the visible window is ever materialised.
pub fn layout_pagination(total_pages: u64, current: u32, width: u16, max_rows: u16) -> Vec<PageButton> {
    let total = clamp_total(total_pages);
    if total == 0 {
        return Vec::new();
    }

    let slot = total.to_string().len() as u16 + 2;
    let per_row = ((width.saturating_add(GAP)) / (slot + GAP)).max(1);
    let slots = u32::from(per_row) * u32::from(max_rows.max(1));

    let (start, end) = if total <= slots {
        (1, total)
    } else {
        let capacity = slots.saturating_sub(2).max(1);
        let current = current.clamp(1, total);
        let start = (current - 1) / capacity * capacity + 1;
        (start, start.saturating_add(capacity - 1).min(total))
    };

    let mut items = Vec::new();
    if start > 1 {
        items.push((start - 1, ButtonKind::Previous));
    }
    items.extend((start..=end).map(|n| (n, ButtonKind::Page)));
    if end < total {
        items.push((end + 1, ButtonKind::Next));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, (number, kind))| {
            let i = i as u16;
            let mut button = PageButton {
                number,
                kind,
                current: kind == ButtonKind::Page && number == current,
                x: (i % per_row) * (slot + GAP),
                row: i / per_row,
                width: 0,
            };
            button.width = button.label().chars().count() as u16;
            button
        })
        .collect()
}

/// Number of rows the laid out bar occupies
pub fn rows_needed(buttons: &[PageButton]) -> u16 {
    buttons.last().map(|b| b.row + 1).unwrap_or(1)
}

use crate::cache::{PageKey, QueryView};
use crate::claim::{ClaimResult, ClaimStatus, Claims};
use crate::clipboard::Clipboard;
use crate::error::Result;
use crate::model::User;
use crate::query::{Outcome, QueryClient};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{layout::Position, prelude::*, Terminal};
use std::io::{self, stdout};
use std::time::Duration;

use super::pagination::PageButton;
use super::ui;

/// Width reserved for the copy column, border included
pub const COPY_COLUMN_WIDTH: u16 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusLine {
    fn info(text: impl Into<String>) -> Self {
        StatusLine { text: text.into(), kind: StatusKind::Info }
    }

    fn success(text: impl Into<String>) -> Self {
        StatusLine { text: text.into(), kind: StatusKind::Success }
    }

    fn error(text: impl Into<String>) -> Self {
        StatusLine { text: text.into(), kind: StatusKind::Error }
    }
}

/// Directory view state
pub struct App {
    pub(super) client: QueryClient,
    clipboard: Box<dyn Clipboard>,
    pub(super) claims: Claims,
    pub(super) page: u32,
    pub(super) selected_row: usize,
    pub(super) status: Option<StatusLine>,
    /// Animation frame counter for the loading screen
    pub(super) tick: u64,
    running: bool,

    // Hit boxes from the last render, for mouse handling
    table_area: Rect,
    table_offset: usize,
    pagination_inner: Rect,
    pagination_buttons: Vec<PageButton>,
}

impl App {
    pub fn new(client: QueryClient, clipboard: Box<dyn Clipboard>, start_page: u32) -> Self {
        let mut app = App {
            client,
            clipboard,
            claims: Claims::new(),
            page: start_page.max(1),
            selected_row: 0,
            status: None,
            tick: 0,
            running: true,
            table_area: Rect::default(),
            table_offset: 0,
            pagination_inner: Rect::default(),
            pagination_buttons: Vec::new(),
        };
        let key = app.key();
        app.client.query(key);
        app
    }

    pub fn key(&self) -> PageKey {
        PageKey::users(self.page)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        while self.running {
            if event::poll(Duration::from_millis(50))? {
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind == KeyEventKind::Press {
                            self.handle_key(key.code, key.modifiers);
                        }
                    }
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::Down(MouseButton::Left) => {
                            self.handle_click(mouse.column, mouse.row);
                        }
                        MouseEventKind::ScrollUp => self.move_selection(-1),
                        MouseEventKind::ScrollDown => self.move_selection(1),
                        _ => {}
                    },
                    _ => {}
                }
            }

            // Completions land before the frame that depends on them
            self.sync();
            self.tick = self.tick.wrapping_add(1);

            terminal.draw(|frame| {
                ui::render(frame, self);
            })?;
        }

        Ok(())
    }

    /// Apply finished requests to the cache and the status line
    pub fn sync(&mut self) {
        let outcomes = self.client.poll();
        self.handle_outcomes(outcomes);
    }

    fn handle_outcomes(&mut self, outcomes: Vec<Outcome>) {
        for outcome in outcomes {
            if let Some(result) = self.claims.finish(&outcome) {
                self.status = Some(match result {
                    ClaimResult::Locked { id } => StatusLine::success(format!("Locked {}", id)),
                    ClaimResult::Rejected { id, error } => {
                        StatusLine::error(format!("Lock failed for {}: {}", id, error))
                    }
                });
                continue;
            }
            if let Outcome::FetchFailed { key, error } = outcome
                && key == self.key()
            {
                self.status = Some(StatusLine::error(format!(
                    "Page {} failed to load: {}",
                    key.page, error
                )));
            }
        }
        self.clamp_page();
    }

    /// Pull the current page back inside 1..=total_pages once the server has
    /// told us how many pages there are
    fn clamp_page(&mut self) {
        let key = self.key();
        if let Some(total) = self.client.cache().get(key).map(|p| p.total_pages)
            && total > 0
            && u64::from(self.page) > total
        {
            let last = u32::try_from(total).unwrap_or(u32::MAX);
            tracing::debug!(page = self.page, total, "page past the end");
            self.status = Some(StatusLine::info(format!(
                "Page {} is past the last page, showing page {}",
                self.page, last
            )));
            self.set_page(last);
        }
    }

    pub(super) fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);

        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if ctrl => self.running = false,

            // Rows
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') => self.selected_row = 0,
            KeyCode::Char('G') => {
                self.selected_row = self.row_count().saturating_sub(1);
            }

            // Claim
            KeyCode::Enter | KeyCode::Char('c') | KeyCode::Char(' ') => self.claim_selected(),

            // Pagination
            KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => {
                self.activate_relative(1);
            }
            KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => {
                self.activate_relative(-1);
            }
            KeyCode::Home => self.set_page(1),
            KeyCode::End => {
                if let Some(last) = self.total_pages() {
                    self.set_page(last);
                }
            }

            KeyCode::Char('r') => {
                let key = self.key();
                if self.client.refetch(key) {
                    self.status = Some(StatusLine::info(format!("Refreshing page {}", self.page)));
                }
            }

            _ => {}
        }
    }

    /// Activate page control `number`
    pub fn set_page(&mut self, number: u32) {
        if number != self.page {
            self.page = number;
            self.selected_row = 0;
        }
        let key = self.key();
        self.client.query(key);
    }

    /// Activate the neighbouring control, if there is one
    fn activate_relative(&mut self, delta: i64) {
        let Some(total) = self.total_pages() else {
            return;
        };
        let target = i64::from(self.page) + delta;
        if target >= 1 && target <= i64::from(total) {
            self.set_page(target as u32);
        }
    }

    /// Page count of whatever the view shows, so navigation keeps working
    /// while the current page is loading or failed
    fn total_pages(&self) -> Option<u32> {
        self.client
            .cache()
            .shown_data(self.key())
            .map(|p| u32::try_from(p.total_pages).unwrap_or(u32::MAX))
            .filter(|&n| n > 0)
    }

    fn row_count(&self) -> usize {
        self.client
            .cache()
            .get(self.key())
            .map(|p| p.users.len())
            .unwrap_or(0)
    }

    fn move_selection(&mut self, delta: i32) {
        let new_row = if delta >= 0 {
            self.selected_row.saturating_add(delta as usize)
        } else {
            self.selected_row.saturating_sub((-delta) as usize)
        };
        self.selected_row = new_row.min(self.row_count().saturating_sub(1));
    }

    /// The user under the cursor, if the current page's own data is shown
    fn selected_user(&mut self) -> Option<User> {
        let row = self.selected_row;
        let key = self.key();
        match self.client.view(key) {
            QueryView::Ready {
                data,
                placeholder: false,
            } => data.users.get(row).cloned(),
            _ => None,
        }
    }

    pub fn claim_selected(&mut self) {
        let Some(user) = self.selected_user() else {
            return;
        };
        let key = self.key();

        match self
            .claims
            .start(&user, key, self.clipboard.as_mut(), &mut self.client)
        {
            Ok(ClaimStatus::Dispatched) => {
                self.status = Some(StatusLine::info(format!(
                    "Copied {} to clipboard, locking...",
                    user.full_name
                )));
            }
            Ok(ClaimStatus::AlreadyLocked) => {}
            Ok(ClaimStatus::InFlight) => {
                self.status = Some(StatusLine::info(format!(
                    "Lock for {} is still in flight",
                    user.full_name
                )));
            }
            Err(e) => {
                tracing::warn!(id = %user.id, error = %e, "claim aborted");
                self.status = Some(StatusLine::error(e.to_string()));
            }
        }
    }

    pub(super) fn handle_click(&mut self, x: u16, y: u16) {
        let position = Position { x, y };
        if self.pagination_inner.contains(position) {
            if let Some(number) = self
                .pagination_buttons
                .iter()
                .find(|b| b.rect(self.pagination_inner).contains(position))
                .map(|b| b.number)
            {
                self.set_page(number);
            }
            return;
        }

        let area = self.table_area;
        if !area.contains(position) {
            return;
        }

        // Border (1) + header (1) before the first data row
        let table_header_offset = 2u16;
        if y < area.y + table_header_offset || y >= area.bottom().saturating_sub(1) {
            return;
        }
        let clicked = self.table_offset + (y - area.y - table_header_offset) as usize;
        if clicked >= self.row_count() {
            return;
        }

        self.selected_row = clicked;
        if x >= area.right().saturating_sub(COPY_COLUMN_WIDTH) {
            self.claim_selected();
        }
    }

    pub(super) fn set_hit_areas(
        &mut self,
        table_area: Rect,
        table_offset: usize,
        pagination_inner: Rect,
        pagination_buttons: Vec<PageButton>,
    ) {
        self.table_area = table_area;
        self.table_offset = table_offset;
        self.pagination_inner = pagination_inner;
        self.pagination_buttons = pagination_buttons;
    }

    pub(super) fn clear_hit_areas(&mut self) {
        self.set_hit_areas(Rect::default(), 0, Rect::default(), Vec::new());
    }

    /// Page controls drawn in the last frame
    pub(super) fn pagination_buttons(&self) -> &[PageButton] {
        &self.pagination_buttons
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockDirectoryApi, RecordingClipboard, page, user};
    use std::sync::Arc;
    use tokio::runtime::Handle;

    fn alice_and_bob(total_pages: u64) -> MockDirectoryApi {
        MockDirectoryApi::new().with_page(
            1,
            page(
                vec![
                    user("a", "Alice", "Smith", "Metro", false),
                    user("b", "Bob", "Jones", "Gotham", true),
                ],
                total_pages,
            ),
        )
    }

    async fn app(api: &MockDirectoryApi, clipboard: &RecordingClipboard) -> App {
        let client = QueryClient::new(
            Arc::new(api.clone()),
            Handle::current(),
            Duration::from_secs(60),
        );
        let mut app = App::new(client, Box::new(clipboard.clone()), 1);
        settle(&mut app).await;
        app
    }

    async fn settle(app: &mut App) {
        let outcomes = app.client.settle_all().await;
        app.handle_outcomes(outcomes);
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    #[tokio::test]
    async fn test_first_render_queries_start_page() {
        let api = alice_and_bob(1);
        let clipboard = RecordingClipboard::new();
        let app = app(&api, &clipboard).await;
        assert_eq!(api.fetches(), vec![1]);
        assert_eq!(app.page(), 1);
    }

    #[tokio::test]
    async fn test_claim_unlocked_then_locked() {
        let api = alice_and_bob(1);
        let clipboard = RecordingClipboard::new();
        let mut app = app(&api, &clipboard).await;

        press(&mut app, KeyCode::Enter);
        assert_eq!(
            clipboard.writes(),
            vec!["Full Name: Alice Smith\nFirst Name: Alice\nLast Name: Smith\nCity: Metro"]
        );
        settle(&mut app).await;

        let data = app.client.cache().get(app.key()).unwrap();
        assert!(data.users[0].locked);
        assert_eq!(data.active_count(), 0);
        assert_eq!(
            app.status,
            Some(StatusLine::success("Locked a"))
        );

        // Bob is locked: nothing happens
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;
        assert_eq!(clipboard.writes().len(), 1);
        assert_eq!(api.locks(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_claimed_row_cannot_be_claimed_again() {
        let api = alice_and_bob(1);
        let clipboard = RecordingClipboard::new();
        let mut app = app(&api, &clipboard).await;

        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        assert_eq!(api.locks(), vec!["a"]);
        assert_eq!(clipboard.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_lock_sets_error_status() {
        let api = alice_and_bob(1);
        api.reject_lock("a");
        let clipboard = RecordingClipboard::new();
        let mut app = app(&api, &clipboard).await;

        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        assert!(matches!(
            app.status,
            Some(StatusLine { kind: StatusKind::Error, .. })
        ));
        assert!(!app.client.cache().get(app.key()).unwrap().users[0].locked);
    }

    #[tokio::test]
    async fn test_clipboard_failure_reports_and_skips_lock() {
        let api = alice_and_bob(1);
        let clipboard = RecordingClipboard::broken();
        let mut app = app(&api, &clipboard).await;

        press(&mut app, KeyCode::Enter);
        assert!(matches!(
            app.status,
            Some(StatusLine { kind: StatusKind::Error, .. })
        ));
        settle(&mut app).await;
        assert!(api.locks().is_empty());
    }

    #[tokio::test]
    async fn test_set_page_queries_new_key() {
        let api = alice_and_bob(5).with_page(3, page(vec![user("c", "Cara", "Lee", "Star", false)], 5));
        let clipboard = RecordingClipboard::new();
        let mut app = app(&api, &clipboard).await;

        app.set_page(3);
        assert_eq!(app.page(), 3);
        assert_eq!(app.key(), PageKey::users(3));
        settle(&mut app).await;
        assert_eq!(api.fetches(), vec![1, 3]);

        // Back to a fresh page: served from cache
        app.set_page(1);
        settle(&mut app).await;
        assert_eq!(api.fetches(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_arrow_keys_stay_in_range() {
        let api = alice_and_bob(2);
        let clipboard = RecordingClipboard::new();
        let mut app = app(&api, &clipboard).await;

        press(&mut app, KeyCode::Left);
        assert_eq!(app.page(), 1);

        press(&mut app, KeyCode::Right);
        assert_eq!(app.page(), 2);
        settle(&mut app).await;

        // Page 2 is empty in the mock, total_pages 0 there: no controls
        press(&mut app, KeyCode::Right);
        assert_eq!(app.page(), 2);
    }

    #[tokio::test]
    async fn test_no_claim_on_placeholder_data() {
        let api = alice_and_bob(5);
        let clipboard = RecordingClipboard::new();
        let mut app = app(&api, &clipboard).await;
        let key = app.key();
        let _ = app.client.view(key);

        app.set_page(4);
        press(&mut app, KeyCode::Enter);
        assert!(clipboard.writes().is_empty());
        settle(&mut app).await;
    }

    #[tokio::test]
    async fn test_failed_fetch_sets_status_and_retry() {
        let api = alice_and_bob(1);
        api.fail_page(1);
        let clipboard = RecordingClipboard::new();
        let mut app = app(&api, &clipboard).await;
        assert!(matches!(
            app.status,
            Some(StatusLine { kind: StatusKind::Error, .. })
        ));

        api.heal_page(1);
        press(&mut app, KeyCode::Char('r'));
        settle(&mut app).await;
        assert!(app.client.cache().get(app.key()).is_some());
    }

    #[tokio::test]
    async fn test_start_page_past_the_end_is_clamped() {
        let api = alice_and_bob(5)
            .with_page(9, page(vec![], 5))
            .with_page(5, page(vec![user("e", "Eve", "Ng", "Metro", false)], 5));
        let clipboard = RecordingClipboard::new();
        let client = QueryClient::new(
            Arc::new(api.clone()),
            Handle::current(),
            Duration::from_secs(60),
        );
        let mut app = App::new(client, Box::new(clipboard), 9);

        settle(&mut app).await;
        assert_eq!(app.page(), 5);
        assert!(matches!(
            app.status,
            Some(StatusLine { kind: StatusKind::Info, .. })
        ));

        settle(&mut app).await;
        assert_eq!(api.fetches(), vec![9, 5]);
        assert_eq!(app.client.cache().get(app.key()).unwrap().users[0].id, "e");
    }

    #[tokio::test]
    async fn test_navigation_survives_failed_page() {
        let api = alice_and_bob(5);
        api.fail_page(2);
        let clipboard = RecordingClipboard::new();
        let mut app = app(&api, &clipboard).await;
        let key = app.key();
        let _ = app.client.view(key);

        press(&mut app, KeyCode::Right);
        settle(&mut app).await;
        assert_eq!(app.page(), 2);
        assert!(matches!(app.client.view(PageKey::users(2)), QueryView::Failed { .. }));

        press(&mut app, KeyCode::Right);
        assert_eq!(app.page(), 3);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.page(), 2);
        press(&mut app, KeyCode::End);
        assert_eq!(app.page(), 5);
    }

    #[tokio::test]
    async fn test_quit() {
        let api = alice_and_bob(1);
        let clipboard = RecordingClipboard::new();
        let mut app = app(&api, &clipboard).await;
        assert!(app.is_running());
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.is_running());
    }
}

mod app;
mod pagination;
mod ui;

use crate::clipboard::Clipboard;
use crate::error::Result;
use crate::query::QueryClient;

pub use app::App;
pub use pagination::pagination_controls;

/// Run the interactive directory view
pub fn run(client: QueryClient, clipboard: Box<dyn Clipboard>, start_page: u32) -> Result<()> {
    let mut app = App::new(client, clipboard, start_page);
    app.run()
}

use {
    super::layout::{render_layout, ViewState},
    crate::{
        chain::ChainConnector,
        scan_core::{ScanController, ScanOutcome, ScanPhase},
    },
    crossterm::event::{Event, KeyCode, KeyEventKind},
    ratatui::{backend::CrosstermBackend, Terminal},
    std::{sync::Arc, time::Duration},
    tokio::task::JoinHandle,
};

fn spawn_scan<K>(controller: &Arc<ScanController<K>>, rpc_url: &str, address: &str) -> JoinHandle<()>
where
    K: ChainConnector + 'static,
{
    let controller = Arc::clone(controller);
    let rpc_url = rpc_url.to_string();
    let address = address.to_string();

    tokio::spawn(async move {
        match controller.start(&rpc_url, &address).await {
            Ok(ScanOutcome::Completed(report)) => {
                log::info!("Scan finished with {} counterparties", report.entries.len());
            }
            Ok(ScanOutcome::Cancelled(_)) => log::info!("Scan cancelled"),
            Err(e) => log::error!("❌ Scan rejected: {}", e),
        }
    })
}

/// Run the TUI: starts a scan immediately, then handles keys until quit.
///
/// Keys: ↑/↓ select, Enter/Space expand, `c` cancel, `r` rescan, `q`/Esc quit.
pub async fn run_ui<K>(
    controller: Arc<ScanController<K>>,
    rpc_url: &str,
    address: &str,
) -> Result<(), Box<dyn std::error::Error>>
where
    K: ChainConnector + 'static,
{
    let stdout = std::io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    crossterm::terminal::enable_raw_mode()?;
    let _restore = RestoreGuard {
        restore: restore_terminal,
    };

    // Logs stay on stderr; the alternate screen keeps them off the table.
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;

    terminal.clear()?;

    let mut view = ViewState::new(address, rpc_url);
    let mut scan = Some(spawn_scan(&controller, rpc_url, address));
    let mut shown_result = false;

    let result: Result<(), Box<dyn std::error::Error>> = async {
        loop {
            view.phase = Some(controller.phase());
            view.status = controller.status();

            if !shown_result && view.phase == Some(ScanPhase::Completed) {
                if let Some(entries) = controller.result() {
                    view.set_entries(entries);
                    shown_result = true;
                }
            }

            terminal.draw(|f| {
                let area = f.size();
                render_layout(f, area, &view);
            })?;

            if !crossterm::event::poll(Duration::from_millis(200))? {
                tokio::task::yield_now().await;
                continue;
            }

            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        controller.cancel();
                        break;
                    }
                    KeyCode::Char('c') => controller.cancel(),
                    KeyCode::Char('r') => {
                        view.set_entries(Vec::new());
                        shown_result = false;
                        scan = Some(spawn_scan(&controller, rpc_url, address));
                    }
                    KeyCode::Up => view.select_previous(),
                    KeyCode::Down => view.select_next(),
                    KeyCode::Enter | KeyCode::Char(' ') => view.toggle_selected(),
                    _ => {}
                }
            }
        }
        Ok(())
    }
    .await;

    if let Some(handle) = scan {
        handle.abort();
    }

    result
}

/// Runs `restore` on drop, so every exit path after raw mode undoes it.
struct RestoreGuard<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> Drop for RestoreGuard<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

/// Leave the alternate screen and raw mode. Best effort: runs on error paths.
fn restore_terminal() {
    if let Err(e) = crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    ) {
        log::error!("Failed to leave alternate screen: {}", e);
    }
    if let Err(e) = crossterm::terminal::disable_raw_mode() {
        log::error!("Failed to disable raw mode: {}", e);
    }
}

use {
    super::renderer::{explorer_url, format_block_time, format_sol},
    crate::scan_core::{LedgerEntry, ScanPhase},
    ratatui::{
        layout::{Constraint, Layout as RatLayout, Rect},
        style::{Color, Modifier, Style},
        text::{Line, Span},
        widgets::{Block, Borders, Paragraph, Row, Table, TableState},
        Frame,
    },
    std::collections::HashSet,
};

/// Everything the screen shows. The drill-down `expanded` set lives here,
/// not in the ledger.
#[derive(Debug, Default)]
pub struct ViewState {
    pub address: String,
    pub rpc_url: String,
    pub phase: Option<ScanPhase>,
    pub status: String,
    pub entries: Vec<LedgerEntry>,
    pub expanded: HashSet<String>,
    pub selected: usize,
}

impl ViewState {
    pub fn new(address: &str, rpc_url: &str) -> Self {
        Self {
            address: address.to_string(),
            rpc_url: rpc_url.to_string(),
            ..Self::default()
        }
    }

    pub fn set_entries(&mut self, entries: Vec<LedgerEntry>) {
        self.entries = entries;
        self.expanded.clear();
        self.selected = 0;
    }

    pub fn toggle_selected(&mut self) {
        if let Some(entry) = self.entries.get(self.selected) {
            if !self.expanded.remove(&entry.address) {
                self.expanded.insert(entry.address.clone());
            }
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn is_expanded(&self, address: &str) -> bool {
        self.expanded.contains(address)
    }

    /// Table row index of the selected entry, counting drill-down rows of
    /// expanded entries above it.
    fn selected_row(&self) -> usize {
        self.entries
            .iter()
            .take(self.selected)
            .map(|e| {
                if self.is_expanded(&e.address) {
                    1 + e.transactions.len()
                } else {
                    1
                }
            })
            .sum()
    }
}

pub fn render_layout(f: &mut Frame, area: Rect, view: &ViewState) {
    let chunks = RatLayout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header
            Constraint::Min(0),    // Ledger table
            Constraint::Length(3), // Status
        ])
        .split(area);

    render_header(f, chunks[0], view);
    render_ledger_table(f, chunks[1], view);
    render_footer(f, chunks[2], view);
}

fn render_header(f: &mut Frame, area: Rect, view: &ViewState) {
    let header = Block::default()
        .borders(Borders::ALL)
        .title("rugtrace - Counterparty Flow");

    let text = vec![
        Line::from(vec![
            Span::styled("Address: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(view.address.clone()),
            Span::raw("   "),
            Span::styled("RPC: ", Style::default().fg(Color::Cyan)),
            Span::raw(view.rpc_url.clone()),
        ]),
        Line::from(vec![Span::raw(
            "↑/↓ select | Enter expand | c cancel | r rescan | q quit",
        )]),
    ];

    f.render_widget(Paragraph::new(text).block(header), area);
}

fn render_ledger_table(f: &mut Frame, area: Rect, view: &ViewState) {
    let header = Row::new(vec!["", "Address", "SOL Moved", "Txs"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let mut rows: Vec<Row> = Vec::new();

    for entry in &view.entries {
        let expanded = view.is_expanded(&entry.address);
        let total_color = if entry.total > 0 { Color::White } else { Color::Red };

        rows.push(
            Row::new(vec![
                if expanded { "▲" } else { "▼" }.to_string(),
                entry.address.clone(),
                format_sol(entry.total),
                entry.transactions.len().to_string(),
            ])
            .style(Style::default().fg(total_color)),
        );

        if expanded {
            for tx in &entry.transactions {
                rows.push(
                    Row::new(vec![
                        String::new(),
                        format!("  {}", explorer_url(&tx.signature)),
                        format_sol(tx.amount),
                        format_block_time(tx.block_time),
                    ])
                    .style(Style::default().fg(Color::Gray)),
                );
            }
        }
    }

    let widths = [
        Constraint::Length(3),
        Constraint::Min(48),
        Constraint::Length(18),
        Constraint::Length(20),
    ];

    let title = format!("Counterparties ({})", view.entries.len());
    let table = Table::new(rows, widths)
        .header(header)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .block(Block::default().borders(Borders::ALL).title(title));

    let mut state = TableState::default();
    if !view.entries.is_empty() {
        state.select(Some(view.selected_row()));
    }

    f.render_stateful_widget(table, area, &mut state);
}

fn render_footer(f: &mut Frame, area: Rect, view: &ViewState) {
    let (label, color) = match view.phase {
        Some(ScanPhase::Scanning) => ("Scanning", Color::Yellow),
        Some(ScanPhase::Completed) => ("Done", Color::Green),
        Some(ScanPhase::Cancelled) => ("Cancelled", Color::Red),
        Some(ScanPhase::Idle) | None => ("Idle", Color::Gray),
    };

    let text = vec![Line::from(vec![
        Span::styled(format!("{}: ", label), Style::default().fg(color)),
        Span::raw(view.status.clone()),
    ])];

    let footer = Block::default().borders(Borders::ALL).title("Status");

    f.render_widget(Paragraph::new(text).block(footer), area);
}

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use payment_recovery::{
    balance_bucket, balance_bucket_label, format_currency, schema_for, CanonicalRecord,
    DistributionBucket, LoadStatus, RecoveryState, Source,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Data,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Dashboard => Page::Data,
            Page::Data => Page::Dashboard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Collect,
}

pub struct App {
    pub state: RecoveryState,
    pub data_dir: PathBuf,
    pub view: Vec<CanonicalRecord>,
    pub table_state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub input_mode: InputMode,
    pub input: String,
    /// Last status message and whether it is an error
    pub message: Option<(String, bool)>,
}

impl App {
    pub fn new(state: RecoveryState, data_dir: PathBuf) -> Self {
        let mut app = Self {
            state,
            data_dir,
            view: Vec::new(),
            table_state: TableState::default(),
            current_page: Page::Dashboard,
            show_detail: false,
            input_mode: InputMode::Normal,
            input: String::new(),
            message: None,
        };
        app.refresh_view();
        app
    }

    /// Re-derive the table after any state change, keeping the selection in range
    pub fn refresh_view(&mut self) {
        self.view = self.state.view();

        if self.view.is_empty() {
            self.table_state.select(None);
        } else {
            let i = self.table_state.selected().unwrap_or(0).min(self.view.len() - 1);
            self.table_state.select(Some(i));
        }
    }

    pub fn selected_record(&self) -> Option<&CanonicalRecord> {
        self.table_state.selected().and_then(|i| self.view.get(i))
    }

    pub fn switch_source(&mut self, source: Source) {
        if source == self.state.source() && self.state.status() == &LoadStatus::Loaded {
            return;
        }

        self.state.load_from_dir(source, &self.data_dir);
        self.table_state.select(Some(0));
        self.show_detail = false;
        self.message = match self.state.status() {
            LoadStatus::NoData { expected } => Some((
                format!("No data found. Please ensure {} exists.", expected),
                true,
            )),
            _ => None,
        };
        self.refresh_view();
    }

    pub fn cycle_year(&mut self) {
        if !schema_for(self.state.source()).supports_year_filter() {
            self.message = Some((format!("{} has no payment dates", self.state.source()), true));
            return;
        }

        let years = self.state.filter_controls().available_years;
        let next = self.state.criteria().year.cycle(&years);
        self.state.set_year(next);
        self.refresh_view();
    }

    /// Move the lower (or upper) edge of the balance range a tenth of the span inward
    pub fn narrow_range(&mut self, raise_min: bool) {
        let bounds = self.state.bounds();
        let current = self.state.criteria().balance_range;
        let step = ((bounds.max - bounds.min) / 10.0).max(1.0);

        let (min, max) = if raise_min {
            ((current.min + step).min(current.max), current.max)
        } else {
            (current.min, (current.max - step).max(current.min))
        };

        if let Err(e) = self.state.set_balance_range(min, max) {
            self.message = Some((e.to_string(), true));
        }
        self.refresh_view();
    }

    pub fn cycle_sort(&mut self) {
        self.state.cycle_sort();
        self.refresh_view();
    }

    pub fn flip_sort(&mut self) {
        self.state.flip_sort_direction();
        self.refresh_view();
    }

    pub fn reset_range(&mut self) {
        self.state.reset_balance_range();
        self.refresh_view();
    }

    pub fn begin_input(&mut self, mode: InputMode) {
        if mode == InputMode::Collect && self.selected_record().is_none() {
            self.message = Some(("Select a record first".to_string(), true));
            return;
        }
        self.input_mode = mode;
        self.input = if mode == InputMode::Search {
            self.state.criteria().search.clone()
        } else {
            String::new()
        };
    }

    pub fn submit_input(&mut self) {
        match self.input_mode {
            InputMode::Search => {
                self.state.set_search(&self.input);
                self.input_mode = InputMode::Normal;
                self.refresh_view();
            }
            InputMode::Collect => {
                let Some(index) = self.selected_record().map(|r| r.original_index) else {
                    self.input_mode = InputMode::Normal;
                    return;
                };

                match self.state.collect(index, &self.input) {
                    Ok(receipt) => {
                        self.message = Some((
                            format!(
                                "Collected {} on record {}, balance now {}",
                                format_currency(receipt.amount),
                                index,
                                format_currency(receipt.new_balance)
                            ),
                            false,
                        ));
                        self.input_mode = InputMode::Normal;
                        self.input.clear();
                        self.refresh_view();
                    }
                    // Stay in the prompt so the user can correct the amount
                    Err(e) => self.message = Some((e.to_string(), true)),
                }
            }
            InputMode::Normal => {}
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input.clear();
    }

    pub fn next(&mut self) {
        let len = self.view.len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i < len - 1 => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.view.len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.view.len();
        if len == 0 {
            return;
        }
        let i = self.table_state.selected().map_or(0, |i| (i + 20).min(len - 1));
        self.table_state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.table_state.selected().map_or(0, |i| i.saturating_sub(20));
        self.table_state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if app.input_mode != InputMode::Normal {
            match key.code {
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Enter => app.submit_input(),
                KeyCode::Backspace => {
                    app.input.pop();
                }
                KeyCode::Char(c) => app.input.push(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Tab | KeyCode::BackTab => app.current_page = app.current_page.next(),
            KeyCode::Char('1') => app.switch_source(Source::Captira),
            KeyCode::Char('2') => app.switch_source(Source::Simply),
            KeyCode::Char('3') => app.switch_source(Source::Joint),
            KeyCode::Char('y') => app.cycle_year(),
            KeyCode::Char('/') => {
                app.current_page = Page::Data;
                app.begin_input(InputMode::Search);
            }
            KeyCode::Char('c') if app.current_page == Page::Data => {
                app.begin_input(InputMode::Collect)
            }
            KeyCode::Char('>') => app.narrow_range(true),
            KeyCode::Char('<') => app.narrow_range(false),
            KeyCode::Char('r') => app.reset_range(),
            KeyCode::Char('s') => app.cycle_sort(),
            KeyCode::Char('S') => app.flip_sort(),
            KeyCode::Enter if app.current_page == Page::Data => {
                app.show_detail = !app.show_detail
            }
            KeyCode::Down | KeyCode::Char('j') => app.next(),
            KeyCode::Up | KeyCode::Char('k') => app.previous(),
            KeyCode::PageDown => app.page_down(),
            KeyCode::PageUp => app.page_up(),
            KeyCode::Home => app.table_state.select(Some(0)),
            KeyCode::End => {
                if !app.view.is_empty() {
                    app.table_state.select(Some(app.view.len() - 1));
                }
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.message = None
            }
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let notice = match app.state.status() {
        LoadStatus::Loading => Some(("Loading data...".to_string(), Color::Yellow)),
        LoadStatus::NoData { expected } => Some((
            format!(
                "No data found for {}. Please ensure {} exists in {}.",
                app.state.source(),
                expected,
                app.data_dir.display()
            ),
            Color::Red,
        )),
        _ => None,
    };

    if let Some((text, color)) = notice {
        render_notice(f, chunks[1], &text, color);
    } else if app.current_page == Page::Dashboard {
        render_dashboard(f, chunks[1], app);
    } else if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(60), // Record list
                Constraint::Percentage(40), // Detail panel
            ])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        " Payment Recovery ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw(" │ "));

    for (i, (page, name)) in [(Page::Dashboard, "Dashboard"), (Page::Data, "Data")]
        .iter()
        .enumerate()
    {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(*name, style));
    }

    spans.push(Span::raw("  |  "));
    for (i, source) in Source::ALL.iter().enumerate() {
        let style = if *source == app.state.source() {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!(" {} {} ", i + 1, source.name()), style));
        spans.push(Span::raw(" "));
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_notice(f: &mut Frame, area: Rect, text: &str, color: Color) {
    let notice = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(
        format!("  {}", text),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))])
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(notice, area);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let dashboard = app.state.dashboard();
    let schema = schema_for(app.state.source());

    let has_aging = !dashboard.payment_aging.is_empty();
    let has_locations = schema.has_location_chart();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    // Stat cards
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(rows[0]);

    let summary = &dashboard.summary;
    let card_values = [
        ("Total Records", summary.total_records.to_string(), Color::Blue),
        (schema.total_balance_label(), format_currency(summary.total_balance), Color::Green),
        (schema.current_balance_label(), format_currency(summary.current_balance), Color::Yellow),
        ("% Paid", format!("{:.1}%", summary.percentage_paid), Color::Magenta),
    ];

    for (card, (title, value, color)) in cards.iter().zip(card_values) {
        let widget = Paragraph::new(Line::from(Span::styled(
            format!(" {}", value),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(format!(" {} ", title)),
        );
        f.render_widget(widget, *card);
    }

    // Charts
    let chart_count = 1 + usize::from(has_aging) + usize::from(has_locations);
    let constraints = vec![Constraint::Ratio(1, chart_count as u32); chart_count];
    let charts = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(rows[1]);

    render_distribution(
        f,
        charts[0],
        " Balance Distribution ",
        &dashboard.balance_distribution,
        Color::Blue,
    );
    if has_aging {
        render_distribution(
            f,
            charts[1],
            " Days Since Last Payment ",
            &dashboard.payment_aging,
            Color::Red,
        );
    }
    if has_locations {
        render_distribution(
            f,
            charts[chart_count - 1],
            " Defendants by Location (Top 10 Cities) ",
            &dashboard.location_distribution,
            Color::Cyan,
        );
    }
}

fn render_distribution(
    f: &mut Frame,
    area: Rect,
    title: &str,
    buckets: &[DistributionBucket],
    color: Color,
) {
    let labels: Vec<String> = buckets.iter().map(|b| truncate(&b.label, 12)).collect();
    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(buckets)
        .map(|(label, bucket)| (label.as_str(), bucket.count as u64))
        .collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(data.as_slice())
        .bar_width(12)
        .bar_gap(2)
        .bar_style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color));

    f.render_widget(chart, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let columns = app.state.visible_columns();
    let sort = app.state.criteria().sort.clone();

    let mut header_names: Vec<String> = vec!["#".to_string()];
    header_names.extend(columns.iter().map(|column| match &sort {
        Some(order) if order.column == *column => format!("{} {}", column, order.direction.arrow()),
        _ => column.clone(),
    }));
    header_names.push("Collected".to_string());

    let header_cells = header_names.iter().map(|h| {
        Cell::from(h.clone()).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.view.iter().map(|record| {
        let color = match balance_bucket(record.canonical_balance) {
            0 => Color::Green,
            1 | 2 => Color::White,
            3 => Color::Yellow,
            _ => Color::Red,
        };

        let mut cells = vec![Cell::from(record.original_index.to_string())];
        for column in &columns {
            let mut cell = Cell::from(truncate(&record.display_value(column), 24));
            if record.balance_column.as_deref() == Some(column.as_str()) {
                cell = cell.style(Style::default().fg(color));
            }
            cells.push(cell);
        }
        cells.push(Cell::from(if record.collected_amount > 0.0 {
            format_currency(record.collected_amount)
        } else {
            "-".to_string()
        }));

        Row::new(cells).height(1)
    });

    let mut widths = vec![Constraint::Length(6)];
    widths.extend(columns.iter().map(|_| Constraint::Min(10)));
    widths.push(Constraint::Length(12));

    let title = format!(
        " Data - {} | Total records: {} ",
        app.state.source(),
        app.view.len()
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    match app.input_mode {
        InputMode::Search => {
            status_spans.push(Span::styled(" Search: ", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(format!("{}▏", app.input)));
        }
        InputMode::Collect => {
            let index = app.selected_record().map(|r| r.original_index).unwrap_or(0);
            status_spans.push(Span::styled(
                format!(" Amount collected for record {}: ", index),
                Style::default().fg(Color::Yellow),
            ));
            status_spans.push(Span::raw(format!("{}▏", app.input)));
        }
        InputMode::Normal => {
            let selected = app.table_state.selected().map(|i| i + 1).unwrap_or(0);
            status_spans.push(Span::styled(
                format!(" Row: {}/{} ", selected, app.view.len()),
                Style::default().fg(Color::Cyan),
            ));

            let criteria = app.state.criteria();
            status_spans.push(Span::raw(" | "));
            status_spans.push(Span::styled(
                format!(
                    "Year: {}  Balance: {}–{}",
                    criteria.year,
                    format_currency(criteria.balance_range.min),
                    format_currency(criteria.balance_range.max)
                ),
                Style::default().fg(Color::Green),
            ));
            if let Some(order) = &criteria.sort {
                status_spans.push(Span::styled(
                    format!("  Sort: {} {}", order.column, order.direction.arrow()),
                    Style::default().fg(Color::Green),
                ));
            }
            if !criteria.search.is_empty() {
                status_spans.push(Span::styled(
                    format!("  Search: \"{}\"", criteria.search),
                    Style::default().fg(Color::Green),
                ));
            }
        }
    }

    if let Some((message, is_error)) = &app.message {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            message.clone(),
            Style::default().fg(if *is_error { Color::Red } else { Color::Green }),
        ));
    }

    let hints = match app.input_mode {
        InputMode::Normal => {
            " 1-3 Source | Tab Page | / Search | y Year | </> Range | r Reset | s/S Sort | c Collect | q Quit"
        }
        _ => " Enter Confirm | Esc Cancel",
    };

    let status_bar = Paragraph::new(vec![
        Line::from(status_spans),
        Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray))),
    ]);

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let Some(record) = app.selected_record() else {
        let no_selection = Paragraph::new("No record selected").block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Defendant Details "),
        );
        f.render_widget(no_selection, area);
        return;
    };

    let label_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let schema = schema_for(app.state.source());

    let mut content = vec![Line::from("")];
    for (label, value) in schema.detail_fields(record) {
        content.push(Line::from(vec![
            Span::styled(format!("  {}: ", label), label_style),
            Span::raw(value),
        ]));
        content.push(Line::from(""));
    }

    content.push(Line::from("  ─────────────────────────────────────"));
    content.push(Line::from(""));
    content.push(Line::from(vec![
        Span::styled("  Balance: ", label_style),
        Span::styled(
            format_currency(record.canonical_balance),
            Style::default().fg(if record.canonical_balance < 0.0 { Color::Red } else { Color::Green }),
        ),
    ]));
    content.push(Line::from(vec![
        Span::styled("  Balance Range: ", label_style),
        Span::raw(balance_bucket_label(record.canonical_balance)),
    ]));
    content.push(Line::from(vec![
        Span::styled("  Original Due: ", label_style),
        Span::raw(format_currency(record.canonical_total_due)),
    ]));
    content.push(Line::from(vec![
        Span::styled("  Collected: ", label_style),
        Span::raw(format_currency(record.collected_amount)),
    ]));
    if let Some(date) = record.last_payment_date {
        content.push(Line::from(vec![
            Span::styled("  Last Payment: ", label_style),
            Span::raw(date.format("%m/%d/%Y").to_string()),
        ]));
    }
    if let Some(phone) = &record.contact_phone {
        content.push(Line::from(vec![
            Span::styled("  Call: ", label_style),
            Span::styled(phone.clone(), Style::default().fg(Color::Green)),
        ]));
    }
    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  c Collect | Enter Close",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Defendant Details "),
    );

    f.render_widget(detail_panel, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

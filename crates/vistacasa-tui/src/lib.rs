// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use vistacasa_app::{
    AppCommand, AppMode, AppState, FavoriteSet, FilterCriteria, Listing, TabKind,
};

/// Outcome of a listing refresh, as the view reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    /// Criteria could not form a valid query; collection untouched.
    Skipped,
    /// Collection replaced with this many listings.
    Replaced(usize),
    /// Fetch failed; collection cleared to an empty-results state.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoritesStatus {
    Replaced(usize),
    /// Fetch failed; the previous local set was kept untouched.
    KeptStale(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleStatus {
    Favorited,
    Unfavorited,
    /// The mutation failed or was rejected; the optimistic flip was
    /// rolled back.
    Reverted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Logout,
}

/// Everything the view needs from the application. All mutation funnels
/// through these named operations.
pub trait AppRuntime {
    fn user_id(&self) -> &str;
    fn listings(&self) -> &[Listing];
    fn favorites(&self) -> &FavoriteSet;
    fn refresh_listings(&mut self, criteria: &FilterCriteria) -> SearchStatus;
    fn refresh_favorites(&mut self) -> FavoritesStatus;
    fn toggle_favorite(&mut self, listing_id: &str) -> ToggleStatus;
    fn logout(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterField {
    City,
    MinPrice,
    MaxPrice,
    Bedrooms,
    Bathrooms,
}

impl FilterField {
    const ALL: [Self; 5] = [
        Self::City,
        Self::MinPrice,
        Self::MaxPrice,
        Self::Bedrooms,
        Self::Bathrooms,
    ];

    const fn label(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::MinPrice => "min price",
            Self::MaxPrice => "max price",
            Self::Bedrooms => "bedrooms",
            Self::Bathrooms => "bathrooms",
        }
    }
}

fn filter_field_value<'a>(criteria: &'a mut FilterCriteria, field: FilterField) -> &'a mut String {
    match field {
        FilterField::City => &mut criteria.city,
        FilterField::MinPrice => &mut criteria.min_price,
        FilterField::MaxPrice => &mut criteria.max_price,
        FilterField::Bedrooms => &mut criteria.bedrooms,
        FilterField::Bathrooms => &mut criteria.bathrooms,
    }
}

fn filter_field_display(criteria: &FilterCriteria, field: FilterField) -> &str {
    match field {
        FilterField::City => &criteria.city,
        FilterField::MinPrice => &criteria.min_price,
        FilterField::MaxPrice => &criteria.max_price,
        FilterField::Bedrooms => &criteria.bedrooms,
        FilterField::Bathrooms => &criteria.bathrooms,
    }
}

#[derive(Debug, Default)]
struct ViewData {
    criteria: FilterCriteria,
    filter_cursor: usize,
    listings_selected: usize,
    favorites_selected: usize,
    status_token: u64,
}

enum InternalEvent {
    ClearStatus { token: u64 },
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<Exit> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    // Favorites load once per session; listings wait for search terms.
    if let FavoritesStatus::KeptStale(reason) = runtime.refresh_favorites() {
        emit_status(
            state,
            &mut view_data,
            &internal_tx,
            format!("favorites unavailable: {reason}"),
        );
    }

    let mut exit = Exit::Quit;
    let mut result = Ok(());
    loop {
        process_internal_events(state, &view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data, runtime)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if let Some(requested) =
                        handle_key_event(state, runtime, &mut view_data, &internal_tx, key)
                    {
                        exit = requested;
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result.map(|()| exit)
}

fn process_internal_events(state: &mut AppState, view_data: &ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> Option<Exit> {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Exit::Quit);
    }

    match state.mode {
        AppMode::Filter => {
            handle_filter_key(state, runtime, view_data, internal_tx, key);
            None
        }
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> Option<Exit> {
    match key.code {
        KeyCode::Char('q') => return Some(Exit::Quit),
        KeyCode::Char('x') => {
            if let Err(error) = runtime.logout() {
                emit_status(state, view_data, internal_tx, format!("logout failed: {error}"));
                return None;
            }
            return Some(Exit::Logout);
        }
        KeyCode::Tab | KeyCode::Right => {
            state.dispatch(AppCommand::NextTab);
        }
        KeyCode::BackTab | KeyCode::Left => {
            state.dispatch(AppCommand::PrevTab);
        }
        KeyCode::Down | KeyCode::Char('j') => move_selection(state, view_data, runtime, 1),
        KeyCode::Up | KeyCode::Char('k') => move_selection(state, view_data, runtime, -1),
        KeyCode::Char('f') => {
            if state.active_tab == TabKind::Listings {
                state.dispatch(AppCommand::EnterFilterMode);
            } else {
                emit_status(state, view_data, internal_tx, "filters apply to listings");
            }
        }
        KeyCode::Char('r') => {
            refresh_all(state, runtime, view_data, internal_tx);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            toggle_selected(state, runtime, view_data, internal_tx);
        }
        _ => {}
    }
    None
}

fn handle_filter_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
            run_search(state, runtime, view_data, internal_tx);
        }
        KeyCode::Tab | KeyCode::Down => {
            view_data.filter_cursor = (view_data.filter_cursor + 1) % FilterField::ALL.len();
        }
        KeyCode::BackTab | KeyCode::Up => {
            view_data.filter_cursor =
                (view_data.filter_cursor + FilterField::ALL.len() - 1) % FilterField::ALL.len();
        }
        KeyCode::Backspace => {
            let field = FilterField::ALL[view_data.filter_cursor];
            filter_field_value(&mut view_data.criteria, field).pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let field = FilterField::ALL[view_data.filter_cursor];
            filter_field_value(&mut view_data.criteria, field).push(ch);
        }
        _ => {}
    }
}

fn run_search<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let status = runtime.refresh_listings(&view_data.criteria);
    clamp_selections(view_data, runtime);
    let message = match status {
        SearchStatus::Skipped => "add a city or a full price range to search".to_owned(),
        SearchStatus::Replaced(count) => format!("{count} listing(s) found"),
        SearchStatus::Failed(reason) => format!("search failed: {reason}"),
    };
    emit_status(state, view_data, internal_tx, message);
}

fn refresh_all<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if let FavoritesStatus::KeptStale(reason) = runtime.refresh_favorites() {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("favorites unavailable: {reason}"),
        );
    }
    run_search(state, runtime, view_data, internal_tx);
}

fn toggle_selected<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(listing_id) = selected_listing_id(state, view_data, runtime) else {
        emit_status(state, view_data, internal_tx, "nothing selected");
        return;
    };

    let status = runtime.toggle_favorite(&listing_id);
    clamp_selections(view_data, runtime);
    let message = match status {
        ToggleStatus::Favorited => "saved to favorites".to_owned(),
        ToggleStatus::Unfavorited => "removed from favorites".to_owned(),
        ToggleStatus::Reverted(reason) => format!("favorite not saved: {reason}"),
    };
    emit_status(state, view_data, internal_tx, message);
}

/// Positions (into the runtime's listing collection) visible on a tab.
fn visible_indices<R: AppRuntime>(tab: TabKind, runtime: &R) -> Vec<usize> {
    match tab {
        TabKind::Listings => (0..runtime.listings().len()).collect(),
        TabKind::Favorites => runtime
            .listings()
            .iter()
            .enumerate()
            .filter(|(_, listing)| runtime.favorites().contains(&listing.id))
            .map(|(index, _)| index)
            .collect(),
    }
}

fn selection_slot<'a>(state: &AppState, view_data: &'a mut ViewData) -> &'a mut usize {
    match state.active_tab {
        TabKind::Listings => &mut view_data.listings_selected,
        TabKind::Favorites => &mut view_data.favorites_selected,
    }
}

fn move_selection<R: AppRuntime>(
    state: &AppState,
    view_data: &mut ViewData,
    runtime: &R,
    delta: isize,
) {
    let visible = visible_indices(state.active_tab, runtime).len();
    if visible == 0 {
        return;
    }
    let slot = selection_slot(state, view_data);
    let current = (*slot).min(visible - 1) as isize;
    *slot = (current + delta).rem_euclid(visible as isize) as usize;
}

fn clamp_selections<R: AppRuntime>(view_data: &mut ViewData, runtime: &R) {
    let listings_visible = visible_indices(TabKind::Listings, runtime).len();
    let favorites_visible = visible_indices(TabKind::Favorites, runtime).len();
    view_data.listings_selected = view_data
        .listings_selected
        .min(listings_visible.saturating_sub(1));
    view_data.favorites_selected = view_data
        .favorites_selected
        .min(favorites_visible.saturating_sub(1));
}

fn selected_listing_id<R: AppRuntime>(
    state: &AppState,
    view_data: &ViewData,
    runtime: &R,
) -> Option<String> {
    let visible = visible_indices(state.active_tab, runtime);
    if visible.is_empty() {
        return None;
    }
    let slot = match state.active_tab {
        TabKind::Listings => view_data.listings_selected,
        TabKind::Favorites => view_data.favorites_selected,
    };
    let position = slot.min(visible.len() - 1);
    runtime
        .listings()
        .get(visible[position])
        .map(|listing| listing.id.clone())
}

fn render<R: AppRuntime>(
    frame: &mut ratatui::Frame<'_>,
    state: &AppState,
    view_data: &ViewData,
    runtime: &R,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = TabKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let listings_count = runtime.listings().len();
    let favorites_count = visible_indices(TabKind::Favorites, runtime).len();
    let tab_titles = TabKind::ALL
        .iter()
        .map(|tab| tab_title(*tab, listings_count, favorites_count))
        .collect::<Vec<String>>();

    let tabs = Tabs::new(tab_titles)
        .block(
            Block::default()
                .title(format!("vistacasa [{}]", runtime.user_id()))
                .borders(Borders::ALL),
        )
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    match state.active_tab {
        TabKind::Listings => {
            let body = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(7), Constraint::Min(1)])
                .split(layout[1]);

            let filter_block = Paragraph::new(render_filter_text(
                &view_data.criteria,
                view_data.filter_cursor,
                state.mode == AppMode::Filter,
            ))
            .block(Block::default().borders(Borders::ALL).title("filters"));
            frame.render_widget(filter_block, body[0]);

            render_cards(frame, body[1], state, view_data, runtime, "properties");
        }
        TabKind::Favorites => {
            render_cards(frame, layout[1], state, view_data, runtime, "favorites");
        }
    }

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);
}

fn render_cards<R: AppRuntime>(
    frame: &mut ratatui::Frame<'_>,
    area: ratatui::layout::Rect,
    state: &AppState,
    view_data: &ViewData,
    runtime: &R,
    title: &str,
) {
    let visible = visible_indices(state.active_tab, runtime);
    let selected = match state.active_tab {
        TabKind::Listings => view_data.listings_selected,
        TabKind::Favorites => view_data.favorites_selected,
    }
    .min(visible.len().saturating_sub(1));

    let text = render_cards_text(state, view_data, runtime, &visible, selected);

    // Keep the selected card in view.
    let viewport = area.height.saturating_sub(2) as usize;
    let card_top = selected * 3;
    let scroll = if viewport == 0 || card_top + 2 < viewport {
        0
    } else {
        (card_top + 3 - viewport) as u16
    };

    let cards = Paragraph::new(text)
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(title.to_owned()));
    frame.render_widget(cards, area);
}

fn render_cards_text<R: AppRuntime>(
    state: &AppState,
    view_data: &ViewData,
    runtime: &R,
    visible: &[usize],
    selected: usize,
) -> String {
    if visible.is_empty() {
        return empty_state_text(state, view_data).to_owned();
    }

    let mut lines = Vec::with_capacity(visible.len() * 3);
    for (position, index) in visible.iter().enumerate() {
        let Some(listing) = runtime.listings().get(*index) else {
            continue;
        };
        let favorite = runtime.favorites().contains(&listing.id);
        let [head, detail] = listing_card_lines(listing, favorite, position == selected);
        lines.push(head);
        lines.push(detail);
        lines.push(String::new());
    }
    lines.join("\n")
}

fn empty_state_text(state: &AppState, view_data: &ViewData) -> &'static str {
    match state.active_tab {
        TabKind::Listings => {
            if view_data.criteria.has_search_terms() {
                "no properties match your filters"
            } else {
                "enter a city or a full price range (press f), then enter to search"
            }
        }
        TabKind::Favorites => "no favorites yet -- press enter on a listing to save it",
    }
}

fn listing_card_lines(listing: &Listing, favorite: bool, selected: bool) -> [String; 2] {
    let marker = if selected { ">" } else { " " };
    let heart = if favorite { " [fav]" } else { "" };
    let badge = if listing.featured { " FEATURED" } else { "" };
    let head = format!(
        "{marker} {}  {}, {}{heart}{badge}",
        format_price(listing.price),
        listing.address,
        listing.city,
    );
    let detail = format!(
        "   {} bed | {} bath | {} sqft",
        listing.bedrooms,
        format_baths(listing.bathrooms),
        format_thousands(listing.sqft),
    );
    [head, detail]
}

fn render_filter_text(criteria: &FilterCriteria, cursor: usize, editing: bool) -> String {
    FilterField::ALL
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let marker = if editing && index == cursor { ">" } else { " " };
            format!(
                "{marker} {}: {}",
                field.label(),
                filter_field_display(criteria, *field)
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn tab_title(tab: TabKind, listings_count: usize, favorites_count: usize) -> String {
    match tab {
        TabKind::Listings => format!("{} ({listings_count})", tab.label()),
        TabKind::Favorites => format!("{} ({favorites_count})", tab.label()),
    }
}

fn status_text(state: &AppState) -> String {
    if let Some(status) = &state.status_line {
        return status.clone();
    }
    match state.mode {
        AppMode::Filter => "type to edit | tab next field | enter search | esc back".to_owned(),
        AppMode::Nav => {
            "tab switch | j/k select | enter favorite | f filter | r refresh | x logout | q quit"
                .to_owned()
        }
    }
}

fn format_price(price: f64) -> String {
    let whole = price.round().max(0.0) as i64;
    format!("${}", format_thousands(whole))
}

fn format_thousands(value: i64) -> String {
    let raw = value.to_string();
    let mut grouped = String::with_capacity(raw.len() + raw.len() / 3);
    let digits: Vec<char> = raw.chars().collect();
    for (index, ch) in digits.iter().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }
    grouped
}

fn format_baths(value: f64) -> String {
    if (value - value.trunc()).abs() < f64::EPSILON {
        format!("{}", value.trunc() as i64)
    } else {
        format!("{value:.1}")
    }
}

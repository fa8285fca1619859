use std::io::Stdout;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use unicode_segmentation::UnicodeSegmentation;

use manga_organizer::organize::{
    CollisionDecision, CollisionRequest, MatchRequest, Resolution, Resolver, file_size, sanitize_folder_name,
};
use manga_organizer::path_to_filename_string;

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Full screen dialog for ambiguous matches and name collisions.
///
/// The terminal is only taken over while a question is open,
/// so regular progress output stays visible between archives.
#[derive(Debug, Default)]
pub struct TuiResolver;

/// Text field with a cursor counted in grapheme clusters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EditBuffer {
    text: String,
    cursor: usize,
}

/// State for the match dialog
struct MatchState {
    /// Selected row: candidates first, then "Create new folder" and "Skip"
    selected: usize,
    /// Folder name being typed, if any
    editing: Option<EditBuffer>,
    /// Shown when the typed name is unusable
    message: Option<String>,
}

const COLLISION_OPTIONS: [(CollisionDecision, &str); 3] = [
    (CollisionDecision::Skip, "Skip this archive"),
    (CollisionDecision::KeepBoth, "Keep both, add a number to the new file"),
    (CollisionDecision::Replace, "Replace, move the existing file to trash"),
];

impl TuiResolver {
    pub const fn new() -> Self {
        Self
    }
}

impl Resolver for TuiResolver {
    fn resolve_match(&mut self, request: &MatchRequest<'_>) -> anyhow::Result<Resolution> {
        with_terminal(|terminal| match_dialog(terminal, request))
    }

    fn resolve_collision(&mut self, request: &CollisionRequest<'_>) -> anyhow::Result<CollisionDecision> {
        with_terminal(|terminal| collision_dialog(terminal, request))
    }
}

/// Run the dialog on the alternate screen and always restore the terminal afterwards.
fn with_terminal<T>(dialog: impl FnOnce(&mut CrosstermTerminal) -> anyhow::Result<T>) -> anyhow::Result<T> {
    let mut stdout = std::io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    enable_raw_mode()?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = dialog(&mut terminal);

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn match_dialog(terminal: &mut CrosstermTerminal, request: &MatchRequest<'_>) -> anyhow::Result<Resolution> {
    let mut state = MatchState::new();
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| render_match(frame, request, &state, &mut list_state))?;

        if let Event::Key(key_event) = event::read()?
            && let Some(resolution) = state.handle_key(key_event, request)
        {
            return Ok(resolution);
        }
        list_state.select(Some(state.selected));
    }
}

fn collision_dialog(
    terminal: &mut CrosstermTerminal,
    request: &CollisionRequest<'_>,
) -> anyhow::Result<CollisionDecision> {
    let mut selected = 0;
    let mut list_state = ListState::default();
    list_state.select(Some(selected));

    loop {
        terminal.draw(|frame| render_collision(frame, request, &mut list_state))?;

        if let Event::Key(key_event) = event::read()?
            && let Some(decision) = handle_collision_key(&mut selected, key_event)
        {
            return Ok(decision);
        }
        list_state.select(Some(selected));
    }
}

impl MatchState {
    const fn new() -> Self {
        Self {
            selected: 0,
            editing: None,
            message: None,
        }
    }

    /// Apply a key press. Returns the answer once the operator has made a choice.
    fn handle_key(&mut self, key_event: KeyEvent, request: &MatchRequest<'_>) -> Option<Resolution> {
        if key_event.kind != KeyEventKind::Press {
            return None;
        }
        let count = request.candidates.len();
        let create_row = count;
        let skip_row = count + 1;

        if let Some(buffer) = self.editing.as_mut() {
            match key_event.code {
                KeyCode::Esc => {
                    self.editing = None;
                    self.message = None;
                }
                KeyCode::Enter => {
                    let name = sanitize_folder_name(&buffer.text);
                    if name.is_empty() {
                        self.message = Some("Folder name cannot be empty".to_string());
                    } else {
                        return Some(Resolution::CreateFolder(name));
                    }
                }
                KeyCode::Backspace => buffer.delete_back(),
                KeyCode::Delete => buffer.delete_forward(),
                KeyCode::Left => buffer.move_left(),
                KeyCode::Right => buffer.move_right(),
                KeyCode::Home => buffer.cursor = 0,
                KeyCode::End => buffer.move_end(),
                KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Some(Resolution::Skip);
                }
                KeyCode::Char(c) => buffer.insert(c),
                _ => {}
            }
            return None;
        }

        match key_event.code {
            KeyCode::Char('q' | 's') | KeyCode::Esc => return Some(Resolution::Skip),
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(Resolution::Skip);
            }
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected < skip_row {
                    self.selected += 1;
                }
            }
            KeyCode::Char('n') => {
                self.selected = create_row;
                self.editing = Some(EditBuffer::new(&request.archive.title));
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < count {
                    return Some(Resolution::Select(index));
                }
            }
            KeyCode::Enter => {
                if self.selected < count {
                    return Some(Resolution::Select(self.selected));
                }
                if self.selected == create_row {
                    self.editing = Some(EditBuffer::new(&request.archive.title));
                } else {
                    return Some(Resolution::Skip);
                }
            }
            _ => {}
        }
        None
    }
}

fn handle_collision_key(selected: &mut usize, key_event: KeyEvent) -> Option<CollisionDecision> {
    if key_event.kind != KeyEventKind::Press {
        return None;
    }
    match key_event.code {
        KeyCode::Char('q' | 's') | KeyCode::Esc => Some(CollisionDecision::Skip),
        KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => Some(CollisionDecision::Skip),
        KeyCode::Char('k') => Some(CollisionDecision::KeepBoth),
        KeyCode::Char('r') => Some(CollisionDecision::Replace),
        KeyCode::Up => {
            *selected = selected.saturating_sub(1);
            None
        }
        KeyCode::Down => {
            if *selected + 1 < COLLISION_OPTIONS.len() {
                *selected += 1;
            }
            None
        }
        KeyCode::Enter => Some(COLLISION_OPTIONS[*selected].0),
        _ => None,
    }
}

impl EditBuffer {
    fn new(initial: &str) -> Self {
        Self {
            text: initial.to_string(),
            cursor: initial.graphemes(true).count(),
        }
    }

    fn len(&self) -> usize {
        self.text.graphemes(true).count()
    }

    /// Byte offset of the grapheme at `index`.
    fn byte_offset(&self, index: usize) -> usize {
        self.text
            .grapheme_indices(true)
            .nth(index)
            .map_or(self.text.len(), |(offset, _)| offset)
    }

    fn insert(&mut self, c: char) {
        let offset = self.byte_offset(self.cursor) + c.len_utf8();
        self.text.insert(offset - c.len_utf8(), c);
        // A combining mark joins the previous grapheme instead of adding one
        self.cursor = self.text[..offset].graphemes(true).count();
    }

    fn delete_back(&mut self) {
        if self.cursor > 0 {
            let start = self.byte_offset(self.cursor - 1);
            let end = self.byte_offset(self.cursor);
            self.text.replace_range(start..end, "");
            self.cursor -= 1;
        }
    }

    fn delete_forward(&mut self) {
        if self.cursor < self.len() {
            let start = self.byte_offset(self.cursor);
            let end = self.byte_offset(self.cursor + 1);
            self.text.replace_range(start..end, "");
        }
    }

    const fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    fn move_end(&mut self) {
        self.cursor = self.len();
    }

    /// Text before and after the cursor.
    fn split(&self) -> (&str, &str) {
        self.text.split_at(self.byte_offset(self.cursor))
    }
}

fn render_match(frame: &mut Frame, request: &MatchRequest<'_>, state: &MatchState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(6),    // Options
            Constraint::Length(3), // Status/Edit area
            Constraint::Length(3), // Help
        ])
        .split(frame.area());

    let header_text = format!(
        "Archive {}/{}: {}",
        request.position,
        request.total,
        request.archive.file_name()
    );
    let header = Paragraph::new(header_text)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title("Manga Sort"));
    frame.render_widget(header, chunks[0]);

    let mut items: Vec<ListItem> = request
        .candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            ListItem::new(format!(
                "{}. {}  ({:.2})",
                i + 1,
                candidate.folder.title,
                candidate.score
            ))
        })
        .collect();
    items.push(ListItem::new("+  Create new folder").style(Style::default().fg(Color::Green)));
    items.push(ListItem::new("-  Skip").style(Style::default().fg(Color::DarkGray)));

    let title = if request.candidates.is_empty() {
        format!("No matching folders for \"{}\"", request.archive.title)
    } else {
        format!("Candidates for \"{}\" (↑/↓ to select)", request.archive.title)
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("► ");
    frame.render_stateful_widget(list, chunks[1], list_state);

    let (status_content, status_style) = if let Some(buffer) = &state.editing {
        let (before_cursor, after_cursor) = buffer.split();
        (
            format!("New folder: {before_cursor}│{after_cursor}"),
            Style::default().fg(Color::Green),
        )
    } else if let Some(candidate) = request.candidates.get(state.selected) {
        (
            format!("Move to: {}", path_to_filename_string(&candidate.folder.path)),
            Style::default(),
        )
    } else {
        (String::new(), Style::default())
    };
    let status_content = match &state.message {
        Some(message) => format!("{status_content}  {message}"),
        None => status_content,
    };
    let status = Paragraph::new(status_content)
        .style(status_style)
        .block(Block::default().borders(Borders::ALL).title(if state.editing.is_some() {
            "Folder name (Enter to create, Esc to cancel)"
        } else {
            "Status"
        }));
    frame.render_widget(status, chunks[2]);

    let help_text = if state.editing.is_some() {
        "Type folder name | Enter: create | Esc: cancel"
    } else {
        "Enter/1-9: choose | n: new folder | s/q/Esc: skip"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, chunks[3]);
}

fn render_collision(frame: &mut Frame, request: &CollisionRequest<'_>, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(5), Constraint::Length(3)])
        .split(frame.area());

    let header = Paragraph::new(format!(
        "{}\nalready exists in {} with different content\nexisting {}, incoming {}",
        path_to_filename_string(request.existing),
        request
            .existing
            .parent()
            .map(path_to_filename_string)
            .unwrap_or_default(),
        file_size(request.existing),
        file_size(request.incoming)
    ))
    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    .block(Block::default().borders(Borders::ALL).title("Name taken"));
    frame.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = COLLISION_OPTIONS
        .iter()
        .map(|(_, label)| ListItem::new(*label))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Incoming: {}", request.archive.file_name())),
        )
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("► ");
    frame.render_stateful_widget(list, chunks[1], list_state);

    let help = Paragraph::new("Enter: choose | s: skip | k: keep both | r: replace")
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use manga_organizer::organize::{ArchiveFile, MatchCandidate, SeriesFolder};

    fn archive() -> ArchiveFile {
        ArchiveFile {
            path: PathBuf::from("/in/てすと第1巻.zip"),
            stem: "てすと第1巻".to_string(),
            title: "てすと".to_string(),
            suffix: "第1巻".to_string(),
            extension: "zip".to_string(),
            internal_root: None,
        }
    }

    fn candidates() -> Vec<MatchCandidate> {
        ["てすとフォルダ1", "てすとフォルダ2"]
            .iter()
            .map(|title| {
                MatchCandidate::new(
                    SeriesFolder::new(PathBuf::from("/library").join(title), (*title).to_string()),
                    0.71,
                    5,
                )
            })
            .collect()
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn run_keys(keys: &[KeyEvent], candidates: &[MatchCandidate]) -> Option<Resolution> {
        let archive = archive();
        let request = MatchRequest {
            archive: &archive,
            candidates,
            position: 1,
            total: 1,
        };
        let mut state = MatchState::new();
        keys.iter().find_map(|key| state.handle_key(*key, &request))
    }

    #[test]
    fn enter_selects_highlighted_candidate() {
        let keys = [press(KeyCode::Down), press(KeyCode::Enter)];
        assert_eq!(run_keys(&keys, &candidates()), Some(Resolution::Select(1)));
    }

    #[test]
    fn number_key_selects_candidate() {
        assert_eq!(run_keys(&[press(KeyCode::Char('1'))], &candidates()), Some(Resolution::Select(0)));
        assert_eq!(run_keys(&[press(KeyCode::Char('3'))], &candidates()), None);
    }

    #[test]
    fn closing_the_dialog_skips() {
        assert_eq!(run_keys(&[press(KeyCode::Esc)], &candidates()), Some(Resolution::Skip));
        assert_eq!(run_keys(&[press(KeyCode::Char('q'))], &candidates()), Some(Resolution::Skip));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(run_keys(&[ctrl_c], &candidates()), Some(Resolution::Skip));
    }

    #[test]
    fn create_folder_prefilled_with_title() {
        let keys = [
            press(KeyCode::Char('n')),
            press(KeyCode::Char('3')),
            press(KeyCode::Enter),
        ];
        assert_eq!(
            run_keys(&keys, &candidates()),
            Some(Resolution::CreateFolder("てすと3".to_string()))
        );
    }

    #[test]
    fn create_row_then_enter_starts_editing() {
        let keys = [
            press(KeyCode::Down),
            press(KeyCode::Down),
            press(KeyCode::Enter),
            press(KeyCode::Backspace),
            press(KeyCode::Enter),
        ];
        assert_eq!(
            run_keys(&keys, &candidates()),
            Some(Resolution::CreateFolder("てす".to_string()))
        );
    }

    #[test]
    fn skip_row_skips() {
        let keys = [press(KeyCode::Down), press(KeyCode::Enter)];
        assert_eq!(run_keys(&keys, &[]), Some(Resolution::Skip));
    }

    #[test]
    fn empty_folder_name_is_rejected() {
        let archive = archive();
        let request = MatchRequest {
            archive: &archive,
            candidates: &[],
            position: 1,
            total: 1,
        };
        let mut state = MatchState::new();
        assert_eq!(state.handle_key(press(KeyCode::Char('n')), &request), None);
        for _ in 0..3 {
            state.handle_key(press(KeyCode::Backspace), &request);
        }
        assert_eq!(state.handle_key(press(KeyCode::Enter), &request), None);
        assert!(state.message.is_some());
        assert!(state.editing.is_some());
    }

    #[test]
    fn escape_while_editing_returns_to_list() {
        let archive = archive();
        let candidates = candidates();
        let request = MatchRequest {
            archive: &archive,
            candidates: &candidates,
            position: 1,
            total: 1,
        };
        let mut state = MatchState::new();
        state.handle_key(press(KeyCode::Char('n')), &request);
        assert_eq!(state.handle_key(press(KeyCode::Esc), &request), None);
        assert!(state.editing.is_none());
        assert_eq!(state.handle_key(press(KeyCode::Esc), &request), Some(Resolution::Skip));
    }

    #[test]
    fn collision_keys() {
        let mut selected = 0;
        assert_eq!(
            handle_collision_key(&mut selected, press(KeyCode::Char('k'))),
            Some(CollisionDecision::KeepBoth)
        );
        assert_eq!(handle_collision_key(&mut selected, press(KeyCode::Esc)), Some(CollisionDecision::Skip));
        assert_eq!(handle_collision_key(&mut selected, press(KeyCode::Down)), None);
        assert_eq!(handle_collision_key(&mut selected, press(KeyCode::Down)), None);
        assert_eq!(handle_collision_key(&mut selected, press(KeyCode::Down)), None);
        assert_eq!(
            handle_collision_key(&mut selected, press(KeyCode::Enter)),
            Some(CollisionDecision::Replace)
        );
    }

    #[test]
    fn edit_buffer_moves_by_grapheme() {
        let mut buffer = EditBuffer::new("てすと");
        assert_eq!(buffer.cursor, 3);
        buffer.move_left();
        buffer.insert('x');
        assert_eq!(buffer.text, "てすxと");
        assert_eq!(buffer.split(), ("てすx", "と"));
        buffer.delete_forward();
        assert_eq!(buffer.text, "てすx");
        buffer.cursor = 0;
        buffer.delete_back();
        assert_eq!(buffer.text, "てすx");
        buffer.move_end();
        buffer.delete_back();
        assert_eq!(buffer.text, "てす");
    }

    #[test]
    fn edit_buffer_keeps_combining_marks_together() {
        let mut buffer = EditBuffer::new("か");
        buffer.insert('\u{3099}');
        assert_eq!(buffer.cursor, 1);
        buffer.delete_back();
        assert!(buffer.text.is_empty());
    }
}

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use markdown_scrollsync_config::Config;
use markdown_scrollsync_engine::{
    BlockKind, DocumentId, DocumentReadError, MemoryEditor, MemoryPreview, SourceCapabilities,
    SyncController, SyncHost, render_markdown,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::{
    env,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
    time::{Duration, Instant},
};

/// Redraw at least this often even when the controller has nothing scheduled
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// Supplies the file on disk as the document text and the editor pane as the source view
struct CliHost {
    path: PathBuf,
    editor: MemoryEditor,
}

impl SyncHost for CliHost {
    fn read_document(&self, _document: &DocumentId) -> Result<String, DocumentReadError> {
        std::fs::read_to_string(&self.path).map_err(|source| DocumentReadError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn active_source(&mut self) -> Option<SourceCapabilities> {
        Some(SourceCapabilities::with_editor(self.editor.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Source,
    Preview,
}

struct App {
    controller: SyncController<CliHost>,
    document: DocumentId,
    editor: MemoryEditor,
    preview: MemoryPreview,
    focus: Focus,
    /// Text width the preview was last rendered at
    preview_width: Option<usize>,
}

impl App {
    fn new(path: PathBuf, config: &Config) -> Result<Self> {
        let text = std::fs::read_to_string(&path)?;
        let editor = MemoryEditor::new(&text, 0);
        let preview = MemoryPreview::new(render_markdown(&text, None), 0);
        let document = DocumentId::new(path.display().to_string());

        let host = CliHost {
            path,
            editor: editor.clone(),
        };
        let now = Instant::now();
        let mut controller = SyncController::new(host, config.tuning);
        controller.set_enabled(config.sync_enabled, now);
        controller.initialize(Box::new(preview.clone()), document.clone(), now);

        Ok(Self {
            controller,
            document,
            editor,
            preview,
            focus: Focus::Source,
            preview_width: None,
        })
    }

    /// Match the in-memory views to the panes they are drawn into
    fn fit(&mut self, area: Rect) {
        let (source, preview) = pane_areas(area);
        self.editor.set_viewport_rows(inner_rows(source));
        self.preview.set_viewport_height(inner_rows(preview));

        let width = usize::from(preview.width.saturating_sub(2));
        if self.preview_width != Some(width) {
            self.preview_width = Some(width);
            self.rerender();
        }
    }

    /// Render the preview afresh and rebuild anchors against the new render
    fn rerender(&mut self) {
        let text = self.editor.text();
        self.preview
            .set_rendered(render_markdown(&text, self.preview_width));
        self.controller.refresh_anchors();
        log::debug!(
            "Rendered {} at width {:?}",
            self.document,
            self.preview_width
        );
    }

    fn page_rows(&self) -> isize {
        let rows = match self.focus {
            Focus::Source => self.editor.visible_lines().len(),
            Focus::Preview => self.preview.viewport_height(),
        };
        rows.max(1) as isize
    }

    fn move_focused(&mut self, delta: isize) {
        match self.focus {
            Focus::Source => self.editor.move_cursor_by(delta),
            Focus::Preview => self.preview.scroll_by(delta),
        }
    }

    fn toggle_sync(&mut self) {
        let enabled = !self.controller.is_enabled();
        self.controller.set_enabled(enabled, Instant::now());
    }

    /// Jump the source to the anchor at the top of the preview
    fn jump_to_visible(&mut self) {
        let element = self
            .controller
            .visible_line()
            .and_then(|line| self.controller.anchors().exact(line))
            .map(|anchor| anchor.element);
        match element {
            Some(element) => {
                self.controller
                    .handle_preview_click(element, Instant::now());
            }
            None => log::debug!("No anchor visible in preview"),
        }
    }

    /// Returns false when the app should quit
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Down | KeyCode::Char('j') => self.move_focused(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_focused(-1),
            KeyCode::PageDown => self.move_focused(self.page_rows()),
            KeyCode::PageUp => self.move_focused(-self.page_rows()),
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Source => Focus::Preview,
                    Focus::Preview => Focus::Source,
                };
            }
            KeyCode::Char('s') => self.toggle_sync(),
            KeyCode::Char('r') => self.rerender(),
            KeyCode::Enter if self.focus == Focus::Preview => self.jump_to_visible(),
            _ => {}
        }
        true
    }
}

fn init_logging() -> Result<PathBuf> {
    let log_path = env::temp_dir().join("markdown-scrollsync.log");
    let file = std::fs::File::create(&log_path)?;
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(log_path)
}

fn main() -> Result<()> {
    let log_path = init_logging()?;
    log::info!("markdown-scrollsync starting up, logging to {}", log_path.display());

    // Determine document from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let document_path = if args.len() == 2 {
        PathBuf::from(&args[1])
    } else if args.len() == 1 {
        match config.default_document.clone() {
            Some(path) => path,
            None => {
                eprintln!("Error: No document provided and no default_document configured");
                eprintln!("Usage: {} <document.md>", args[0]);
                eprintln!("Or set default_document in {}", config_path.display());
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [document.md]", args[0]);
        process::exit(1);
    };

    if !is_readable_file(&document_path) {
        eprintln!(
            "Error: Document '{}' does not exist or is not a file",
            document_path.display()
        );
        process::exit(1);
    }

    let mut app = App::new(document_path, &config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.controller.destroy();
    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn is_readable_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        let size = terminal.size()?;
        app.fit(Rect::new(0, 0, size.width, size.height));
        terminal.draw(|f| ui(f, app))?;

        let timeout = app
            .controller
            .next_deadline()
            .map_or(IDLE_WAIT, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            });
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && !app.handle_key(key.code)
        {
            return Ok(());
        }
        app.controller.pump(Instant::now());
    }
}

/// Source and preview pane areas, leaving the bottom row for help
fn pane_areas(area: Rect) -> (Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    (panes[0], panes[1])
}

fn inner_rows(pane: Rect) -> usize {
    usize::from(pane.height.saturating_sub(2))
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn preview_style(kind: BlockKind) -> Style {
    match kind {
        BlockKind::Heading(_) => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        BlockKind::CodeBlock => Style::default().fg(Color::Green),
        BlockKind::BlockQuote | BlockKind::Callout => {
            Style::default().add_modifier(Modifier::ITALIC)
        }
        BlockKind::Rule => Style::default().fg(Color::DarkGray),
        _ => Style::default(),
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let (source_area, preview_area) = pane_areas(f.area());

    let gutter = app.editor.text().lines().count().max(1).to_string().len();
    let source_lines: Vec<Line> = app
        .editor
        .visible_lines()
        .into_iter()
        .map(|(number, text, is_cursor)| {
            let style = if is_cursor {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(
                    format!("{:>gutter$} ", number + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(text, style),
            ])
        })
        .collect();
    let source_title = format!("Source: line {}", app.editor.cursor() + 1);
    f.render_widget(
        Paragraph::new(source_lines).block(pane_block(source_title, app.focus == Focus::Source)),
        source_area,
    );

    let preview_lines: Vec<Line> = app
        .preview
        .visible_rows()
        .into_iter()
        .map(|(kind, text)| Line::from(Span::styled(text, preview_style(kind))))
        .collect();
    let preview_title = format!("Preview [{:?}]", app.controller.state());
    f.render_widget(
        Paragraph::new(preview_lines)
            .block(pane_block(preview_title, app.focus == Focus::Preview)),
        preview_area,
    );

    let help = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("j/k ↑/↓ PgUp/PgDn: Move | "),
        Span::raw("Tab: Switch pane | "),
        Span::raw("s: Toggle sync | r: Re-render | Enter: Jump source"),
    ]);
    let bottom = Rect {
        y: f.area().bottom().saturating_sub(1),
        height: 1,
        ..f.area()
    };
    f.render_widget(Paragraph::new(help), bottom);
}

#[cfg(test)]
mod tests {
    use super::*;
    use markdown_scrollsync_engine::SyncState;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_document(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("doc.md");
        let text: String = (0..30)
            .map(|i| format!("## Heading {i}\n\nBody {i}.\n\n"))
            .collect();
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_host_reports_missing_file() {
        let mut host = CliHost {
            path: PathBuf::from("/nonexistent/doc.md"),
            editor: MemoryEditor::new("", 1),
        };

        let err = host.read_document(&DocumentId::from("doc")).unwrap_err();
        assert!(matches!(err, DocumentReadError::Io { .. }));
        assert!(host.active_source().is_some());
    }

    #[test]
    fn test_pane_areas_split_screen() {
        let (source, preview) = pane_areas(Rect::new(0, 0, 100, 31));

        assert_eq!(source.width + preview.width, 100);
        assert_eq!(source.height, 30);
        assert_eq!(inner_rows(preview), 28);
    }

    #[test]
    fn test_source_movement_scrolls_preview() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(write_document(&dir), &Config::default()).unwrap();
        app.fit(Rect::new(0, 0, 80, 21));
        assert_eq!(app.controller.state(), SyncState::Active);

        assert!(app.handle_key(KeyCode::PageDown));
        assert!(app.handle_key(KeyCode::PageDown));
        app.controller.pump(Instant::now());

        assert!(app.preview.current_top() > 0.0);
    }

    #[test]
    fn test_sync_toggle_and_quit() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(write_document(&dir), &Config::default()).unwrap();

        assert!(app.handle_key(KeyCode::Char('s')));
        assert_eq!(app.controller.state(), SyncState::Disabled);
        assert!(app.handle_key(KeyCode::Char('s')));
        assert_eq!(app.controller.state(), SyncState::Active);
        assert!(!app.handle_key(KeyCode::Char('q')));
    }
}

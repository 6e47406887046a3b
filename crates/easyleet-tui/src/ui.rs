use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use easyleet_core::render::{render as render_message, Rendered, Segment, INVALID_CONTENT};
use easyleet_core::{Message, Role};
use crate::app::{App, InputMode, LineInput};

const CODE_STYLE: Style = Style::new().fg(Color::White).bg(Color::Black);

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        if close == 0 {
            // "****" has nothing to embolden
            break;
        }

        if open > 0 {
            spans.push(Span::raw(rest[..open].to_string()));
        }
        spans.push(Span::styled(
            after_open[..close].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn prose_lines(text: &str, lines: &mut Vec<Line<'static>>) {
    for line in text.lines() {
        lines.push(parse_markdown_line(line));
    }
}

/// Code is shown verbatim with a gutter; the newline that usually follows an
/// opening fence and precedes a closing one is not drawn.
fn code_lines(code: &str, lines: &mut Vec<Line<'static>>) {
    let code = code.strip_prefix('\n').unwrap_or(code);
    let code = code.strip_suffix('\n').unwrap_or(code);

    for line in code.split('\n') {
        lines.push(Line::from(vec![
            Span::styled("│ ", Style::default().fg(Color::DarkGray)),
            Span::styled(line.to_string(), CODE_STYLE),
        ]));
    }
}

fn message_lines(message: &Message, lines: &mut Vec<Line<'static>>) {
    let label = match message.role {
        Role::User => Some(Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Role::Assistant => Some(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Role::Error => None,
    };
    if let Some(label) = label {
        lines.push(Line::from(label));
    }

    match render_message(message) {
        Rendered::Error { text } => {
            let error_style = Style::default().fg(Color::Red);
            for (i, line) in text.lines().enumerate() {
                let prefix = if i == 0 { "⚠ " } else { "  " };
                lines.push(Line::from(vec![
                    Span::styled(prefix, error_style.add_modifier(Modifier::BOLD)),
                    Span::styled(line.to_string(), error_style),
                ]));
            }
        }
        Rendered::File { name, uploaded_at } => {
            lines.push(Line::from(vec![
                Span::raw("📎 "),
                Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
            ]));
            lines.push(Line::from(Span::styled(
                format!("Uploaded at: {}", uploaded_at),
                Style::default().fg(Color::DarkGray),
            )));
        }
        Rendered::Segments(segments) => {
            for segment in segments {
                match segment {
                    Segment::Prose(text) => prose_lines(&text, lines),
                    Segment::Code(code) => code_lines(&code, lines),
                }
            }
        }
        Rendered::Text(text) => match message.role {
            Role::Assistant => prose_lines(&text, lines),
            _ => lines.extend(text.lines().map(|l| Line::from(l.to_string()))),
        },
        Rendered::Invalid => lines.push(Line::from(Span::styled(
            INVALID_CONTENT,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))),
    }

    lines.push(Line::default());
}

/// All lines of the chat pane, including the pending indicator.
fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for message in app.pipeline.conversation() {
        message_lines(message, &mut lines);
    }

    if app.pipeline.is_pending() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Rows the text occupies once word-wrapped the way the chat pane draws it.
fn wrapped_height(text: &Text<'_>, width: u16) -> u16 {
    let rows = Paragraph::new(text.clone())
        .wrap(Wrap { trim: false })
        .line_count(width);
    u16::try_from(rows).unwrap_or(u16::MAX)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_file_prompt {
        render_file_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Easy Leet ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("→ {}", app.endpoint_label()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");
    let inner = block.inner(area);

    let text = if app.pipeline.conversation().is_empty() && !app.pipeline.is_pending() {
        app.update_chat_geometry(0, inner.height);
        Text::from(Span::styled(
            "Type your question, or upload a PDF/JPG/PNG with Ctrl+O...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let text = Text::from(chat_lines(app));
        app.update_chat_geometry(wrapped_height(&text, inner.width), inner.height);
        text
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Visible slice of a text field and the cursor column within it.
fn visible_input(input: &LineInput, width: usize) -> (String, u16) {
    let scroll_offset = if width == 0 {
        0
    } else if input.cursor >= width {
        input.cursor - width + 1
    } else {
        0
    };

    let visible: String = input.text.chars().skip(scroll_offset).take(width).collect();
    let cursor_x = u16::try_from(input.cursor - scroll_offset).unwrap_or(u16::MAX);
    (visible, cursor_x)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.controls_enabled();
    let editing = app.input_mode == InputMode::Editing && !app.show_file_prompt;

    let (title, border_color) = if !enabled {
        (" Waiting for the solver... ", Color::DarkGray)
    } else if editing {
        (" Ask (Enter to send) ", Color::Yellow)
    } else {
        (" Ask (i to type) ", Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible, cursor_x) = visible_input(&app.query_input, inner_width);

    let text_style = if enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(visible).style(text_style).block(block);
    frame.render_widget(input, area);

    if editing && enabled {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = if app.show_file_prompt {
        (" UPLOAD ", Style::default().bg(Color::Magenta).fg(Color::White))
    } else {
        match app.input_mode {
            InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
            InputMode::Editing => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        }
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let hints: Vec<Span> = if app.show_file_prompt {
        [hint(" Enter ", " upload "), hint(" Esc ", " cancel ")].concat()
    } else {
        match app.input_mode {
            InputMode::Normal => [
                hint(" j/k ", " scroll "),
                hint(" g/G ", " top/bottom "),
                hint(" i ", " type "),
                hint(" u ", " upload "),
                hint(" q ", " quit "),
            ]
            .concat(),
            InputMode::Editing => [
                hint(" Enter ", " send "),
                hint(" Ctrl+O ", " upload "),
                hint(" PgUp/PgDn ", " scroll "),
                hint(" Esc ", " stop typing "),
            ]
            .concat(),
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

/// One-row slice of `inner` at `offset`, if the popup is tall enough for it.
fn popup_row(inner: Rect, offset: u16) -> Option<Rect> {
    (offset < inner.height).then(|| Rect::new(inner.x, inner.y + offset, inner.width, 1))
}

fn render_file_prompt(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered), never larger than the frame
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height);

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height).intersection(area);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Upload a file (PDF, JPG, PNG) ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    // Short terminals drop the instructions and keep the path field on top
    let (instructions_row, input_row, limit_row) = if inner.height >= 5 {
        (popup_row(inner, 0), popup_row(inner, 2), popup_row(inner, 4))
    } else {
        (None, popup_row(inner, 0), popup_row(inner, 1))
    };

    if let Some(row) = instructions_row {
        let instructions = Paragraph::new("Type or paste a path. Enter to upload, Esc to cancel.")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(instructions, row);
    }

    if let Some(row) = input_row {
        let (visible, cursor_x) = visible_input(&app.file_input, row.width as usize);
        frame.render_widget(
            Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
            row,
        );
        frame.set_cursor_position((row.x + cursor_x, row.y));
    }

    if let Some(row) = limit_row {
        let limit = format!(
            "Max size {:.1} MB",
            app.pipeline.max_upload_bytes() as f64 / (1024.0 * 1024.0)
        );
        frame.render_widget(
            Paragraph::new(limit).style(Style::default().fg(Color::DarkGray)),
            row,
        );
    }
}

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use std::time::Instant;

use crate::app::{App, InputMode, Overlay, Screen};
use crate::lifecycle::AlertLevel;
use crate::messages::Sender;
use crate::reminders::{render_reminder_list, ReminderDraft, ReminderListView};

const RULE: &str = "────────────────────────";
const FORM_LABEL_WIDTH: usize = 11;

/// Accumulates styled lines while walking the HTML subset produced by the
/// markdown converter.
#[derive(Default)]
struct HtmlLines {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    bold: usize,
    code: usize,
    heading: Option<u8>,
    // One entry per open <span>, true for class="bullet"
    span_stack: Vec<bool>,
    // Last flush closed a block element, so a following <br> adds nothing
    after_block: bool,
}

impl HtmlLines {
    fn style(&self) -> Style {
        let mut style = Style::default();
        if let Some(level) = self.heading {
            style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
            if level == 1 {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
        }
        if self.bold > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.code > 0 {
            style = style.fg(Color::Green);
        }
        if self.span_stack.iter().any(|b| *b) {
            style = style.fg(Color::Yellow);
        }
        style
    }

    fn text(&mut self, raw: &str) {
        let decoded = decode_entities(raw);
        for (i, piece) in decoded.split('\n').enumerate() {
            if i > 0 {
                self.flush();
            }
            if !piece.is_empty() {
                self.spans.push(Span::styled(piece.to_string(), self.style()));
                self.after_block = false;
            }
        }
    }

    fn flush(&mut self) {
        self.lines.push(Line::from(std::mem::take(&mut self.spans)));
    }

    /// End the current line at a block boundary
    fn break_block(&mut self) {
        if !self.spans.is_empty() {
            self.flush();
        }
        self.after_block = true;
    }

    fn tag(&mut self, name: &str, attrs: &str, closing: bool) {
        match name {
            "br" => {
                if self.spans.is_empty() && self.after_block {
                    self.after_block = false;
                } else {
                    self.flush();
                }
            }
            "hr" => {
                self.break_block();
                self.lines.push(Line::from(Span::styled(RULE, Style::default().fg(Color::DarkGray))));
            }
            "h1" | "h2" | "h3" => {
                self.break_block();
                self.heading = if closing { None } else { name[1..].parse().ok() };
            }
            "strong" | "b" => {
                self.bold = if closing { self.bold.saturating_sub(1) } else { self.bold + 1 };
            }
            "code" => {
                self.code = if closing { self.code.saturating_sub(1) } else { self.code + 1 };
            }
            "pre" => {
                self.break_block();
                self.code = if closing { self.code.saturating_sub(1) } else { self.code + 1 };
            }
            "li" => {
                self.break_block();
                if !closing {
                    self.spans.push(Span::raw("• "));
                }
            }
            "span" => {
                if closing {
                    self.span_stack.pop();
                } else {
                    self.span_stack.push(attrs.contains("bullet"));
                }
            }
            "ul" | "ol" | "p" | "div" => self.break_block(),
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if !self.spans.is_empty() {
            self.flush();
        }
        self.lines
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Render the HTML subset stored in assistant messages as terminal lines.
/// Unknown tags are dropped and their text kept.
pub fn html_to_lines(html: &str) -> Vec<Line<'static>> {
    let mut out = HtmlLines::default();
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        if start > 0 {
            out.text(&rest[..start]);
        }
        let Some(len) = rest[start..].find('>') else {
            // Unterminated tag, keep it as text
            out.text(&rest[start..]);
            rest = "";
            break;
        };

        let inner = &rest[start + 1..start + len];
        let closing = inner.starts_with('/');
        let body = inner.trim_start_matches('/').trim_end_matches('/').trim();
        let (name, attrs) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
        out.tag(&name.to_ascii_lowercase(), attrs, closing);

        rest = &rest[start + len + 1..];
    }
    if !rest.is_empty() {
        out.text(rest);
    }

    out.finish()
}

/// Rows `lines` occupy once wrapped to `width` columns
fn wrapped_height(lines: &[Line], width: u16) -> usize {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum()
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let popup_width = width.min(area.width.saturating_sub(4));
    let popup_height = height.min(area.height.saturating_sub(4));

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let alert_height = u16::from(!app.dashboard.alerts.is_empty());

    // Main layout: header, alert banner, body, footer
    let [header_area, alert_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(alert_height),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    if alert_height > 0 {
        render_alert(app, frame, alert_area);
    }

    match app.screen {
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::Reminders => render_reminders_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    match app.overlay() {
        Overlay::InteractionWarning => render_interaction_warning(app, frame, area),
        Overlay::ConfirmDelete => render_confirm_delete(app, frame, area),
        Overlay::UploadPrompt => render_upload_prompt(app, frame, area),
        Overlay::None => {}
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let active_style = Style::default().bg(Color::Blue).fg(Color::White).bold();
    let idle_style = Style::default().fg(Color::White);
    let highlight_style = Style::default().bg(Color::Yellow).fg(Color::Black).bold();

    let reminders_style = if app.screen == Screen::Reminders {
        active_style
    } else if app.dashboard.reminders_highlighted(Instant::now()) {
        highlight_style
    } else {
        idle_style
    };
    let chat_style = if app.screen == Screen::Chat { active_style } else { idle_style };

    let mut spans = vec![
        Span::styled(" healthdesk ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(" 1 Chat ", chat_style),
        Span::raw(" "),
        Span::styled(" 2 Reminders ", reminders_style),
        Span::raw("  "),
        Span::styled(
            format!("[{}] {}", app.session.initial(), app.session.username),
            Style::default().fg(Color::White),
        ),
    ];

    let pending = app.dashboard.in_flight();
    if pending > 0 {
        spans.push(Span::styled(
            format!("  {} pending", pending),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::DarkGray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_alert(app: &App, frame: &mut Frame, area: Rect) {
    let Some(alert) = app.dashboard.alerts.last() else {
        return;
    };
    let style = match alert.level {
        AlertLevel::Success => Style::default().bg(Color::Green).fg(Color::Black),
        AlertLevel::Danger => Style::default().bg(Color::Red).fg(Color::White),
        AlertLevel::Info => Style::default().bg(Color::Blue).fg(Color::White),
    };
    let banner = Paragraph::new(format!(" {}", alert.text)).style(style);
    frame.render_widget(banner, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Chat => " CHAT ",
        Screen::Reminders => " REMINDERS ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let hints: Vec<Span> = match (app.overlay(), app.screen, app.input_mode) {
        (Overlay::InteractionWarning, _, _) => [
            hint(" f ", " add anyway "),
            hint(" c ", " cancel "),
            hint(" p ", " ask a professional "),
        ]
        .concat(),
        (Overlay::ConfirmDelete, _, _) => {
            [hint(" y ", " delete "), hint(" n ", " keep ")].concat()
        }
        (Overlay::UploadPrompt, _, _) => {
            [hint(" Enter ", " upload "), hint(" Esc ", " cancel ")].concat()
        }
        (Overlay::None, Screen::Chat, InputMode::Normal) => [
            hint(" i ", " type "),
            hint(" u ", " upload report "),
            hint(" j/k ", " scroll "),
            hint(" G ", " bottom "),
            hint(" ^L ", " clear "),
            hint(" Tab ", " reminders "),
            hint(" q ", " quit "),
        ]
        .concat(),
        (Overlay::None, Screen::Chat, InputMode::Editing) => [
            hint(" Enter ", " send "),
            hint(" Esc ", " stop typing "),
            hint(" Tab ", " reminders "),
        ]
        .concat(),
        (Overlay::None, Screen::Reminders, InputMode::Normal) => [
            hint(" a ", " add "),
            hint(" j/k ", " nav "),
            hint(" d ", " delete "),
            hint(" r ", " refresh "),
            hint(" Tab ", " chat "),
            hint(" q ", " quit "),
        ]
        .concat(),
        (Overlay::None, Screen::Reminders, InputMode::Editing) => [
            hint(" Tab ", " next field "),
            hint(" Enter ", " save "),
            hint(" Esc ", " stop typing "),
        ]
        .concat(),
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

fn message_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.dashboard.log.iter() {
        match msg.sender {
            Sender::User => {
                lines.push(Line::from(Span::styled(
                    format!("[{}] You:", app.session.initial()),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Sender::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Assistant:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                if msg.is_loading() {
                    // Animated ellipsis: cycles through ".", "..", "..."
                    let dots = ".".repeat((app.animation_frame as usize) + 1);
                    lines.push(Line::from(Span::styled(
                        format!("Thinking{}", dots),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                }
                lines.extend(html_to_lines(&msg.content));
            }
        }
        lines.push(Line::default());
    }

    lines
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Inner size minus borders, used by the scroll keys
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let count = app.dashboard.log.len();
    let title = match &app.dashboard.last_agent {
        Some(agent) => format!(" Health Assistant · {} ({}) ", agent, count),
        None => format!(" Health Assistant ({}) ", count),
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title);

    let lines = if app.dashboard.log.is_empty() {
        vec![Line::from(Span::styled(
            "Ask about symptoms or medications, or press u to upload a report image.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        message_lines(app)
    };

    let total = wrapped_height(&lines, app.chat_width);
    let max_scroll = total.saturating_sub(app.chat_height as usize).min(u16::MAX as usize) as u16;
    if app.dashboard.log.take_scroll_request() {
        app.chat_scroll = max_scroll;
    }
    app.chat_scroll = app.chat_scroll.min(max_scroll);

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Message ");

    // Horizontal scroll keeps the cursor visible
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.chat_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .chat_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, input_area);

    if editing && app.overlay() == Overlay::None {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

fn render_reminders_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [form_area, list_area] = Layout::horizontal([
        Constraint::Percentage(40),
        Constraint::Percentage(60),
    ])
    .areas(area);

    render_reminder_form(app, frame, form_area);
    render_reminder_list_panel(app, frame, list_area);
}

fn render_reminder_form(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Add Reminder ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = ReminderDraft::FIELD_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let focused = editing && i == app.form_field;
            let label_style = if focused {
                Style::default().fg(Color::Yellow).bold()
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::from(vec![
                Span::styled(format!("{:<width$}", format!("{}:", label), width = FORM_LABEL_WIDTH), label_style),
                Span::styled(app.dashboard.draft.field(i).to_string(), Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    lines.push(Line::default());
    let status = if app.dashboard.is_in_flight(crate::lifecycle::OperationKind::AddReminder)
        || app.dashboard.is_in_flight(crate::lifecycle::OperationKind::ForceAddReminder)
    {
        "Saving..."
    } else if editing {
        "Enter saves, Tab moves between fields"
    } else {
        "Press a to fill in a new reminder"
    };
    lines.push(Line::from(Span::styled(status, Style::default().fg(Color::DarkGray))));

    frame.render_widget(Paragraph::new(lines), inner);

    if editing && app.overlay() == Overlay::None {
        let value_width = inner.width.saturating_sub(FORM_LABEL_WIDTH as u16);
        let cursor_x = (app.form_cursor as u16).min(value_width);
        frame.set_cursor_position((
            inner.x + FORM_LABEL_WIDTH as u16 + cursor_x,
            inner.y + app.form_field as u16,
        ));
    }
}

fn render_reminder_list_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    let highlighted = app.dashboard.reminders_highlighted(Instant::now());
    let border_color = if highlighted { Color::Yellow } else { Color::Cyan };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" My Reminders ({}) ", app.dashboard.reminders.len()));

    match render_reminder_list(&app.dashboard.reminders) {
        ReminderListView::Empty(text) => {
            let empty = Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray)))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(empty, area);
        }
        ReminderListView::Rows(rows) => {
            let items: Vec<ListItem> = rows
                .into_iter()
                .map(|row| {
                    let mut title = vec![Span::styled(row.title, Style::default().bold())];
                    if app.dashboard.deleting.contains(&row.delete_id) {
                        title.push(Span::styled(
                            "  deleting...",
                            Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
                        ));
                    }
                    ListItem::new(vec![
                        Line::from(title),
                        Line::from(Span::styled(row.details, Style::default().fg(Color::DarkGray))),
                    ])
                })
                .collect();

            let list = List::new(items)
                .block(block)
                .highlight_style(
                    Style::default()
                        .bg(Color::Blue)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("> ");

            frame.render_stateful_widget(list, area, &mut app.reminder_state);
        }
    }
}

fn render_interaction_warning(app: &App, frame: &mut Frame, area: Rect) {
    let Some(warning) = &app.dashboard.warning else {
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::raw("Adding "),
            Span::styled(warning.pending.medicine_name.clone(), Style::default().bold()),
            Span::raw(" may interact with your current medications."),
        ]),
        Line::from(vec![
            Span::raw("Conflicts with: "),
            Span::styled(
                warning.conflicting_drugs.join(", "),
                Style::default().fg(Color::Red).bold(),
            ),
        ]),
        Line::default(),
    ];
    lines.extend(html_to_lines(&warning.interaction_details));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "f add anyway   c cancel   p consult a professional",
        Style::default().fg(Color::DarkGray),
    )));

    let popup_width = 70;
    let body_height = wrapped_height(&lines, popup_width - 2) as u16;
    let popup = popup_area(area, popup_width, body_height + 2);

    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Drug Interaction Warning ");

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, popup);
}

fn render_confirm_delete(app: &App, frame: &mut Frame, area: Rect) {
    let Some(id) = app.dashboard.pending_delete else {
        return;
    };
    let name = app
        .dashboard
        .reminders
        .iter()
        .find(|r| r.id == id)
        .map(|r| r.medicine_name.as_str())
        .unwrap_or("this medication");

    let popup = popup_area(area, 50, 5);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Delete Reminder ");

    let text = vec![
        Line::from(vec![
            Span::raw("Delete the reminder for "),
            Span::styled(name.to_string(), Style::default().bold()),
            Span::raw("?"),
        ]),
        Line::default(),
        Line::from(Span::styled("y delete   n keep", Style::default().fg(Color::DarkGray))),
    ];

    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), popup);
}

fn render_upload_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let popup = popup_area(area, 60, 7);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Upload Medical Report ");

    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let instructions = Paragraph::new("Path to a report image. Enter to upload, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let width = input_area.width as usize;
    let scroll_offset = if width > 0 && app.upload_cursor >= width {
        app.upload_cursor - width + 1
    } else {
        0
    };
    let visible: String = app.upload_input.chars().skip(scroll_offset).take(width).collect();
    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(Color::Cyan)), input_area);

    let cursor_x = (app.upload_cursor - scroll_offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{CHAT_PLACEHOLDER, UPLOAD_PLACEHOLDER};
    use crate::markdown::{convert_markdown_to_html, format_interaction_details};

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_heading_and_list() {
        let html = convert_markdown_to_html("## Tips\n- **Rest** well\n- Drink water");
        let lines = html_to_lines(&html);

        assert_eq!(plain(&lines), vec!["Tips", "• Rest well", "• Drink water"]);
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Cyan));

        let rest = lines[1].spans.iter().find(|s| s.content == "Rest").unwrap();
        assert!(rest.style.add_modifier.contains(Modifier::BOLD));
        let well = lines[1].spans.iter().find(|s| s.content == " well").unwrap();
        assert!(!well.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_paragraph_break_keeps_blank_line() {
        let html = convert_markdown_to_html("First\n\nSecond");
        assert_eq!(plain(&html_to_lines(&html)), vec!["First", "", "Second"]);
    }

    #[test]
    fn test_rule_and_code() {
        let lines = html_to_lines("a<hr>use <code>ibuprofen</code>");
        assert_eq!(plain(&lines), vec!["a", RULE, "use ibuprofen"]);
        assert_eq!(lines[2].spans[1].style.fg, Some(Color::Green));
    }

    #[test]
    fn test_loading_placeholders() {
        assert!(html_to_lines(CHAT_PLACEHOLDER).is_empty());
        assert_eq!(
            plain(&html_to_lines(UPLOAD_PLACEHOLDER)),
            vec!["Analyzing your medical report..."]
        );
    }

    #[test]
    fn test_interaction_bullets() {
        let html = format_interaction_details("Risk of bleeding\n• Avoid NSAIDs");
        let lines = html_to_lines(&html);
        assert_eq!(plain(&lines), vec!["Risk of bleeding", "• Avoid NSAIDs"]);
        assert_eq!(lines[1].spans[0].style.fg, Some(Color::Yellow));
    }

    #[test]
    fn test_unknown_tags_and_entities() {
        let lines = html_to_lines("<em>5 &lt; 10</em> &amp; <unterminated");
        assert_eq!(plain(&lines), vec!["5 < 10 & <unterminated"]);
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("0123456789"), Line::default(), Line::from("abc")];
        assert_eq!(wrapped_height(&lines, 4), 3 + 1 + 1);
        assert_eq!(wrapped_height(&lines, 0), 10 + 1 + 3);
    }
}

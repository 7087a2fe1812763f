//! Text radar drawn to the terminal.

use std::fmt;
use std::io::{self, Stdout, Write};

use crossterm::QueueableCommand;
use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use radar_core::{Entity, Renderer, spatial};
use tracing::debug;

const HEALTH_BAR_WIDTH: usize = 10;
const NAME_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affiliation {
    Ally,
    Enemy,
}

impl fmt::Display for Affiliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Affiliation::Ally => f.pad("ALLY"),
            Affiliation::Enemy => f.pad("ENEMY"),
        }
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub affiliation: Option<Affiliation>,
    pub text: String,
}

impl Line {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            affiliation: None,
            text: text.into(),
        }
    }
}

/// `[######----]` for a ratio in [0, 1]
pub fn health_bar(ratio: f32, width: usize) -> String {
    let filled = ((ratio.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Build the rows for one frame.
pub fn layout(local_player: Option<&Entity>, entities: &[Entity], range: f32) -> Vec<Line> {
    let Some(local) = local_player else {
        return vec![Line::plain("Waiting for local player...")];
    };

    let nearby = spatial::nearby(local, entities, range);
    let mut lines = vec![
        Line::plain(format!(
            "Radar  range {:.0}  {} of {} in range",
            range,
            nearby.len(),
            entities.len().saturating_sub(1)
        )),
        Line::plain(format!(
            "You: {} at {}  HP {:.0}/{:.0}",
            local.name, local.position, local.health, local.max_health
        )),
        Line::plain(""),
    ];

    for entity in nearby {
        let affiliation = if entity.is_ally_of(local) {
            Affiliation::Ally
        } else {
            Affiliation::Enemy
        };
        lines.push(Line {
            affiliation: Some(affiliation),
            text: format!(
                "{:<5} {:<width$} {:>7.1}m {} {:>3.0}%",
                affiliation,
                truncate(&entity.name, NAME_WIDTH),
                local.distance_to(entity),
                health_bar(entity.health_ratio(), HEALTH_BAR_WIDTH),
                entity.health_ratio() * 100.0,
                width = NAME_WIDTH
            ),
        });
    }
    lines
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Renders frames to a terminal-like writer, redrawing from the top-left.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    range: f32,
}

impl ConsoleRenderer<Stdout> {
    pub fn stdout(range: f32) -> Self {
        Self::new(io::stdout(), range)
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, range: f32) -> Self {
        Self { out, range }
    }

    pub fn set_range(&mut self, range: f32) {
        self.range = range;
    }

    fn draw(&mut self, lines: &[Line]) -> io::Result<()> {
        self.out
            .queue(MoveTo(0, 0))?
            .queue(Clear(ClearType::All))?;
        for line in lines {
            match line.affiliation {
                Some(Affiliation::Ally) => {
                    self.out.queue(SetForegroundColor(Color::Green))?;
                }
                Some(Affiliation::Enemy) => {
                    self.out.queue(SetForegroundColor(Color::Red))?;
                }
                None => {}
            }
            self.out
                .queue(Print(&line.text))?
                .queue(ResetColor)?
                .queue(Print("\r\n"))?;
        }
        self.out.flush()
    }
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn render(&mut self, local_player: Option<&Entity>, entities: &[Entity]) {
        let lines = layout(local_player, entities, self.range);
        if let Err(e) = self.draw(&lines) {
            debug!("Failed to draw frame: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::Vector3;

    fn scene() -> (Entity, Vec<Entity>) {
        let local = Entity::new(0, "me", Vector3::ZERO).with_team(1);
        let entities = vec![
            local.clone(),
            Entity::new(1, "friend", Vector3::new(10.0, 0.0, 0.0)).with_team(1),
            Entity::new(2, "foe", Vector3::new(0.0, 5.0, 0.0))
                .with_team(2)
                .with_health(25.0, 100.0),
            Entity::new(3, "far", Vector3::new(0.0, 300.0, 0.0)).with_team(2),
        ];
        (local, entities)
    }

    #[test]
    fn test_health_bar() {
        assert_eq!(health_bar(1.0, 10), "[##########]");
        assert_eq!(health_bar(0.25, 4), "[#---]");
        assert_eq!(health_bar(0.0, 3), "[---]");
        assert_eq!(health_bar(7.0, 2), "[##]");
    }

    #[test]
    fn test_layout_waiting_without_local_player() {
        let (_, entities) = scene();
        let lines = layout(None, &entities, 100.0);
        assert_eq!(lines, vec![Line::plain("Waiting for local player...")]);
    }

    #[test]
    fn test_layout_orders_by_distance_and_tags() {
        let (local, entities) = scene();
        let lines = layout(Some(&local), &entities, 100.0);

        let rows: Vec<&Line> = lines.iter().filter(|l| l.affiliation.is_some()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].affiliation, Some(Affiliation::Enemy));
        assert!(rows[0].text.starts_with("ENEMY foe"));
        assert!(rows[0].text.contains("[###-------]"));
        assert_eq!(rows[1].affiliation, Some(Affiliation::Ally));
        assert!(rows[1].text.starts_with("ALLY  friend"));
        assert!(lines[0].text.contains("2 of 3 in range"));
    }

    #[test]
    fn test_render_writes_rows() {
        let (local, entities) = scene();
        let mut renderer = ConsoleRenderer::new(Vec::new(), 100.0);
        renderer.render(Some(&local), &entities);

        let output = String::from_utf8(renderer.out).unwrap();
        assert!(output.contains("You: me"));
        assert!(output.contains("friend"));
        assert!(!output.contains("far"));
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
    }
}

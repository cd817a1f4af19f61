use std::collections::HashMap;
use std::io::Write;

use blake3::Hash;

use crate::drag::GridGeometry;
use crate::entity::{Entity, EntityId};
use crate::error::Result;
use crate::geometry::{PixelOffset, PixelRect, Position, Rect, Size};
use crate::width::fit_to_width;

/// Everything a host needs to draw one card.
#[derive(Debug, Clone, Copy)]
pub struct RenderItem<'a> {
    pub id: &'a str,
    pub entity: &'a Entity,
    pub widget: &'a str,
    pub size: Size,
    pub position: Position,
    /// In-flight drag translation; `None` unless this card is being dragged.
    pub drag_offset: Option<PixelOffset>,
}

impl RenderItem<'_> {
    /// Pixel rectangle including the ephemeral drag translation.
    pub fn pixel_rect(&self, geometry: &GridGeometry) -> PixelRect {
        let rect = geometry.cell_rect(self.position, self.size);
        match self.drag_offset {
            Some(offset) => rect.translate(offset),
            None => rect,
        }
    }
}

/// Host callback producing a visual per item. The dashboard never inspects
/// the output.
pub trait ItemRenderer {
    type Output;

    fn render_item(&mut self, item: &RenderItem<'_>) -> Self::Output;
}

impl<F, O> ItemRenderer for F
where
    F: FnMut(&RenderItem<'_>) -> O,
{
    type Output = O;

    fn render_item(&mut self, item: &RenderItem<'_>) -> O {
        self(item)
    }
}

/// Plain-text card body: entity id, state, widget id.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardText;

impl ItemRenderer for CardText {
    type Output = Vec<String>;

    fn render_item(&mut self, item: &RenderItem<'_>) -> Vec<String> {
        let mut lines = vec![item.id.to_string()];
        if !item.entity.state.is_empty() {
            lines.push(item.entity.state.clone());
        }
        lines.push(format!("[{}]", item.widget));
        lines
    }
}

/// Renderer runtime parameters.
#[derive(Debug, Clone, Default)]
pub struct RendererSettings {
    pub restore_cursor: Option<(u16, u16)>,
}

#[derive(Debug, Clone, Copy)]
struct Painted {
    hash: Hash,
    area: Rect,
}

/// Paints text cards at their cell rectangles, treating one terminal cell
/// as one pixel. Cards whose area and text are unchanged since the last
/// pass are skipped.
pub struct AnsiRenderer {
    settings: RendererSettings,
    cards: CardText,
    painted: HashMap<EntityId, Painted>,
}

impl AnsiRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            cards: CardText,
            painted: HashMap::new(),
        }
    }

    pub fn with_default() -> Self {
        Self::new(RendererSettings::default())
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    /// Forget what is on screen so the next pass repaints everything.
    pub fn invalidate(&mut self) {
        self.painted.clear();
    }

    /// Returns the number of cards written.
    pub fn render(
        &mut self,
        writer: &mut impl Write,
        geometry: &GridGeometry,
        items: &[RenderItem<'_>],
    ) -> Result<usize> {
        let mut frames = Vec::with_capacity(items.len());
        for item in items {
            let area = terminal_area(item.pixel_rect(geometry));
            let lines = frame_lines(&self.cards.render_item(item), area);
            let hash = content_hash(area, &lines);
            frames.push((item.id, area, lines, hash));
        }

        // Areas vacated by moved or removed cards.
        let mut stale: Vec<Rect> = Vec::new();
        for (id, painted) in &self.painted {
            let current = frames.iter().find(|(fid, ..)| *fid == id.as_str());
            match current {
                Some((_, area, ..)) if *area == painted.area => {}
                _ => stale.push(painted.area),
            }
        }
        for area in &stale {
            blank(writer, *area)?;
        }

        let mut next = HashMap::with_capacity(frames.len());
        let mut written = 0;
        for (id, area, lines, hash) in frames {
            let unchanged = self
                .painted
                .get(id)
                .is_some_and(|prev| prev.hash == hash && prev.area == area);
            let erased = stale.iter().any(|gone| gone.intersects(&area));
            if !unchanged || erased {
                paint(writer, area, &lines)?;
                written += 1;
            }
            next.insert(id.to_string(), Painted { hash, area });
        }
        self.painted = next;

        if let Some((row, col)) = self.settings.restore_cursor {
            write!(writer, "\x1b[{};{}H", row + 1, col + 1)?;
        }
        writer.flush()?;
        Ok(written)
    }
}

impl Default for AnsiRenderer {
    fn default() -> Self {
        Self::with_default()
    }
}

fn terminal_area(rect: PixelRect) -> Rect {
    let clamp = |value: f32| value.round().clamp(0.0, f32::from(u16::MAX)) as u16;
    let x = clamp(rect.x);
    let y = clamp(rect.y);
    let right = clamp(rect.x + rect.width);
    let bottom = clamp(rect.y + rect.height);
    Rect::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
}

fn frame_lines(body: &[String], area: Rect) -> Vec<String> {
    let width = usize::from(area.width);
    (0..usize::from(area.height))
        .map(|row| fit_to_width(body.get(row).map(String::as_str).unwrap_or(""), width))
        .collect()
}

fn content_hash(area: Rect, lines: &[String]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for value in [area.x, area.y, area.width, area.height] {
        hasher.update(&value.to_le_bytes());
    }
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize()
}

fn paint(writer: &mut impl Write, area: Rect, lines: &[String]) -> Result<()> {
    for (offset, line) in lines.iter().enumerate() {
        let (row, column) = (usize::from(area.y) + offset + 1, usize::from(area.x) + 1);
        write!(writer, "\x1b[{row};{column}H{line}")?;
    }
    Ok(())
}

fn blank(writer: &mut impl Write, area: Rect) -> Result<()> {
    let spaces = " ".repeat(usize::from(area.width));
    let column = usize::from(area.x) + 1;
    for offset in 0..usize::from(area.height) {
        let row = usize::from(area.y) + offset + 1;
        write!(writer, "\x1b[{row};{column}H{spaces}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PixelSize;
    use crate::layout::GridDimensions;

    // 4x2 board of 10x3 terminal cells separated by a 1-cell gap.
    fn geometry() -> GridGeometry {
        GridGeometry::from_container(
            GridDimensions::new(4, 2).unwrap(),
            PixelSize::new(43.0, 7.0),
            1.0,
        )
    }

    fn item<'a>(entity: &'a Entity, position: Position) -> RenderItem<'a> {
        RenderItem {
            id: entity.id(),
            entity,
            widget: "light-card",
            size: Size::new(1, 1),
            position,
            drag_offset: None,
        }
    }

    #[test]
    fn card_text_lists_id_state_and_widget() {
        let entity = Entity::new("light.desk").with_state("on");
        let lines = CardText.render_item(&item(&entity, Position::ORIGIN));
        assert_eq!(lines, vec!["light.desk", "on", "[light-card]"]);
    }

    #[test]
    fn closures_are_item_renderers() {
        let entity = Entity::new("fan.attic");
        let mut renderer = |item: &RenderItem<'_>| item.position;
        assert_eq!(
            renderer.render_item(&item(&entity, Position::new(2, 1))),
            Position::new(2, 1)
        );
    }

    #[test]
    fn renderer_writes_cursor_sequences() {
        let entity = Entity::new("light.desk").with_state("on");
        let mut output = Vec::new();
        let mut renderer = AnsiRenderer::with_default();
        let written = renderer
            .render(&mut output, &geometry(), &[item(&entity, Position::new(1, 1))])
            .unwrap();

        assert_eq!(written, 1);
        let rendered = String::from_utf8(output).unwrap();
        assert!(rendered.contains("\u{1b}[5;12Hlight.desk"));
        assert!(rendered.contains("\u{1b}[6;12Hon        "));
    }

    #[test]
    fn unchanged_cards_are_skipped() {
        let entity = Entity::new("light.desk").with_state("on");
        let mut renderer = AnsiRenderer::with_default();
        let items = [item(&entity, Position::ORIGIN)];
        renderer.render(&mut Vec::new(), &geometry(), &items).unwrap();

        let mut output = Vec::new();
        assert_eq!(renderer.render(&mut output, &geometry(), &items).unwrap(), 0);
        assert!(!String::from_utf8(output).unwrap().contains("light.desk"));

        let toggled = Entity::new("light.desk").with_state("off");
        let changed = [item(&toggled, Position::ORIGIN)];
        assert_eq!(renderer.render(&mut Vec::new(), &geometry(), &changed).unwrap(), 1);
    }

    #[test]
    fn moved_cards_blank_their_old_area() {
        let entity = Entity::new("light.desk");
        let mut renderer = AnsiRenderer::with_default();
        renderer
            .render(&mut Vec::new(), &geometry(), &[item(&entity, Position::ORIGIN)])
            .unwrap();

        let mut output = Vec::new();
        let mut dragged = item(&entity, Position::ORIGIN);
        dragged.drag_offset = Some(PixelOffset::new(11.0, 0.0));
        renderer.render(&mut output, &geometry(), &[dragged]).unwrap();

        let rendered = String::from_utf8(output).unwrap();
        assert!(rendered.contains("\u{1b}[1;1H          "));
        assert!(rendered.contains("\u{1b}[1;12Hlight.desk"));
    }
}

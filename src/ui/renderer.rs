/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// World → terminal mapping: one 64-unit tile is one map cell, drawn as
/// `CELL_W` terminal columns by one row. World y points up, terminal rows
/// point down, so rows are counted from the top of the map.
///
/// The renderer only reads the world, except for `camera.width`, which it
/// sets from the terminal width every frame.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::actor::{Actor, PlayerId};
use crate::domain::layer::{LayerId, LevelObject, Rect, TILE};
use crate::sim::world::{GameState, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// gaps between rows match the cells on every terminal.
    const BASE_BG: Color = Color::Rgb { r: 16, g: 14, b: 28 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    /// Write a string centered on row `y`.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let x = self.width.saturating_sub(len) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Layer styles ──

/// Two-column glyph and colors for each layer's objects.
fn layer_style(id: LayerId) -> (&'static str, Color, Option<Color>) {
    let rgb = |r, g, b| Color::Rgb { r, g, b };
    match id {
        LayerId::Platforms        => ("██", rgb(120, 110, 140), None),
        LayerId::Walls            => ("▓▓", rgb(100, 90, 120), None),
        LayerId::Bridge           => ("══", rgb(170, 120, 60), None),
        LayerId::Water            => ("≈≈", rgb(80, 160, 255), Some(rgb(20, 50, 120))),
        LayerId::WaterFrozen
        | LayerId::WaterFrozen2
        | LayerId::WaterFrozen3   => ("▒▒", rgb(200, 240, 255), Some(rgb(90, 150, 190))),
        LayerId::Fire             => ("^^", rgb(255, 90, 30), Some(rgb(90, 20, 0))),
        LayerId::Fire2            => ("ww", rgb(255, 170, 40), None),
        LayerId::WaterWall        => ("││", rgb(80, 160, 255), Some(rgb(20, 50, 120))),
        LayerId::FireWall         => ("││", rgb(255, 120, 40), Some(rgb(110, 30, 0))),
        LayerId::Wall | LayerId::Wall2 => ("▓▓", rgb(150, 140, 130), None),
        LayerId::Plants
        | LayerId::Plants2
        | LayerId::Plants3        => ("\"\"", rgb(90, 200, 90), None),
        LayerId::WallPlants       => ("%%", rgb(60, 170, 60), Some(rgb(20, 60, 20))),
        LayerId::WallWater        => ("~~", rgb(120, 200, 255), Some(rgb(20, 60, 110))),
        LayerId::FireLever        => (" /", rgb(255, 140, 60), None),
        LayerId::FireLeverTurned  => (" \\", rgb(255, 140, 60), None),
        LayerId::WaterLever       => (" /", rgb(100, 180, 255), None),
        LayerId::WaterLeverTurned => (" \\", rgb(100, 180, 255), None),
        LayerId::Coins            => ("()", rgb(255, 220, 50), None),
        LayerId::Exit             => ("[]", rgb(255, 255, 255), Some(rgb(70, 60, 110))),
    }
}

/// Objects draw as the layer they were authored in, wherever they live now.
fn object_style(obj: &LevelObject) -> (&'static str, Color, Option<Color>) {
    layer_style(obj.origin)
}

fn actor_color(id: PlayerId) -> Color {
    match id {
        PlayerId::Fire => Color::Rgb { r: 255, g: 110, b: 50 },
        PlayerId::Water => Color::Rgb { r: 90, g: 190, b: 255 },
    }
}

// ── Renderer ──

/// Each map cell is 2 terminal columns wide.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 30, g: 24, b: 60 };
const TITLE_FG: Color = Color::Rgb { r: 255, g: 220, b: 50 };

/// Which screen is showing; a change forces a full repaint.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Screen {
    Interstitial,
    Playing,
    Ended,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<Screen>,
    keyboard_enhanced: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
            keyboard_enhanced: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the
    /// terminal will report key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            let flags = KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES;
            self.keyboard_enhanced = execute!(self.writer, PushKeyboardEnhancementFlags(flags)).is_ok();
        }
        tracing::info!(release_events = self.keyboard_enhanced, "terminal ready");

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(self.keyboard_enhanced)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Viewport width in world units for a terminal `term_w` columns wide.
    pub fn viewport_width(term_w: usize) -> f32 {
        (term_w / CELL_W).max(1) as f32 * TILE
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        world.camera.width = Self::viewport_width(self.term_w);

        let screen = if world.game_ended {
            Screen::Ended
        } else if world.between_levels {
            Screen::Interstitial
        } else {
            Screen::Playing
        };
        if self.last_screen != Some(screen) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(screen);
        }

        self.front.clear();
        match screen {
            Screen::Interstitial => self.compose_interstitial(world),
            Screen::Playing => self.compose_game(world),
            Screen::Ended => self.compose_game_complete(world),
        }
        if world.state == GameState::Paused {
            self.compose_pause_overlay(world);
        }
        self.compose_banners(world);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors, never ResetColor: the terminal default may
        // differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, w: &WorldState) {
        // ── HUD row ──
        let hud = format!(
            " {}   Score: {:<4}  {}: {:<6}  {}: {:<6}",
            w.level_name,
            w.score,
            PlayerId::Fire.label(), w.actor(PlayerId::Fire).state().name(),
            PlayerId::Water.label(), w.actor(PlayerId::Water).state().name(),
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map (camera viewport) ──
        let map_rows = (w.map_height / TILE).ceil() as usize;
        let view_cols = self.front.width / CELL_W;
        let (r, g, b) = w.background;
        let map_bg = Color::Rgb { r, g, b };
        for row in 0..map_rows {
            for col in 0..view_cols * CELL_W {
                self.front.set(col, MAP_ROW + row, Cell::new(' ', Color::White, map_bg));
            }
        }

        for (_, layer) in w.layers.iter() {
            for obj in layer.objects.iter().filter(|o| o.visible) {
                let (glyph, fg, bg) = object_style(obj);
                self.compose_rect(w, &obj.rect, glyph, fg, bg.unwrap_or(map_bg), map_rows);
            }
        }

        for actor in &w.actors {
            self.compose_actor(w, actor, map_bg, map_rows);
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + map_rows + 1;
        if !w.message.is_empty() {
            let bar = Color::Rgb { r: 200, g: 180, b: 50 };
            self.front.fill_row(msg_row, bar);
            self.front.put_str(0, msg_row, &format!(" {} ", w.message), Color::Black, bar);
        }

        // ── Help bar ──
        let help = " ←→↑ + RShift or /: Fire Knight   A D W + LShift or F: Water Priestess   \
                    P: Pause  Ctrl+S/L: Save/Load  Esc: Quit";
        self.front.put_str(0, msg_row + 2, help, Color::DarkGrey, Color::Reset);
    }

    /// Map cell (column, row from top) of a world point, if on screen.
    fn to_cell(&self, w: &WorldState, x: f32, y: f32, map_rows: usize) -> Option<(usize, usize)> {
        let col = ((x - w.camera.x) / TILE).floor();
        let row = ((w.map_height - y) / TILE).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        (col < self.front.width / CELL_W && row < map_rows).then_some((col, row))
    }

    fn compose_rect(&mut self, w: &WorldState, rect: &Rect, glyph: &str, fg: Color, bg: Color, map_rows: usize) {
        let cols = (rect.width / TILE).round().max(1.0) as usize;
        let rows = (rect.height / TILE).round().max(1.0) as usize;
        for c in 0..cols {
            for r in 0..rows {
                let x = rect.left + (c as f32 + 0.5) * TILE;
                let y = rect.top() - (r as f32 + 0.5) * TILE;
                if let Some((col, row)) = self.to_cell(w, x, y, map_rows) {
                    self.front.put_str(col * CELL_W, MAP_ROW + row, glyph, fg, bg);
                }
            }
        }
    }

    fn compose_actor(&mut self, w: &WorldState, actor: &Actor, map_bg: Color, map_rows: usize) {
        let Some((col, row)) = self.to_cell(w, actor.x, actor.y, map_rows) else {
            return;
        };
        let texture: String = actor.texture().chars().take(CELL_W).collect();
        let x = col * CELL_W;
        let y = MAP_ROW + row;
        // Keep the background of whatever the actor stands in front of.
        for (i, ch) in texture.chars().enumerate() {
            let under = self.front.get(x + i, y).bg;
            let bg = if under == Cell::BASE_BG { map_bg } else { under };
            self.front.set(x + i, y, Cell::new(ch, actor_color(actor.id), bg));
        }
    }

    fn compose_interstitial(&mut self, w: &WorldState) {
        let lines = w.intro.len();
        let top = self.front.height.saturating_sub(lines + 6) / 2;
        self.front.put_centered(top, &w.level_name, TITLE_FG, Color::Reset);
        for (i, line) in w.intro.iter().enumerate() {
            self.front.put_centered(top + 2 + i, line, Color::White, Color::Reset);
        }
        let prompt = Color::Rgb { r: 80, g: 255, b: 80 };
        self.front.put_centered(top + lines + 4, "Press ENTER to continue", prompt, Color::Reset);
    }

    fn compose_game_complete(&mut self, w: &WorldState) {
        let top = self.front.height.saturating_sub(5) / 2;
        self.front.put_centered(top, "The End", TITLE_FG, Color::Reset);
        self.front.put_centered(top + 2, "YOU SUCCESSFULLY COMPLETED THE GAME!", Color::White, Color::Reset);
        self.front.put_centered(top + 4, &format!("YOUR SCORE: {}", w.score), Color::White, Color::Reset);
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let map_rows = (w.map_height / TILE).ceil() as usize;
        let box_w = 30_usize.min(self.front.width);
        let box_h = 5_usize;
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + map_rows.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, dim));
            }
        }
        let label = "PAUSED";
        self.front.put_str(box_x + box_w.saturating_sub(label.len()) / 2, box_y + 1, label, TITLE_FG, dim);
        let hint = "P: Resume   Esc: Quit";
        self.front.put_str(box_x + box_w.saturating_sub(hint.len()) / 2, box_y + 3, hint, Color::Grey, dim);
    }

    /// SAVED / LOADED flashes, right-aligned on the HUD row.
    fn compose_banners(&mut self, w: &WorldState) {
        let banner = if w.save_banner > 0.0 {
            "SAVED"
        } else if w.load_banner > 0.0 {
            "LOADED"
        } else {
            return;
        };
        let x = self.front.width.saturating_sub(banner.len() + 1);
        self.front.put_str(x, HUD_ROW, banner, Color::Black, TITLE_FG);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::test_world;
    use crate::sim::step::step;

    #[test]
    fn bridge_keeps_its_look_after_becoming_platform() {
        let mut world = test_world();
        let priestess = world.actor_mut(PlayerId::Water);
        priestess.x = 22.0 * TILE + TILE / 2.0;
        priestess.set_bottom(2.0 * TILE);
        step(&mut world, 1.0 / 60.0).unwrap();

        assert!(world.layers.is_empty(LayerId::Bridge));
        let moved: Vec<_> = world
            .layers
            .get(LayerId::Platforms)
            .iter()
            .filter(|o| o.origin == LayerId::Bridge)
            .collect();
        assert_eq!(moved.len(), 8);
        for obj in moved {
            assert_eq!(object_style(obj).0, "══");
        }
        let floor = &world.layers.get(LayerId::Platforms)[0];
        assert_eq!(object_style(floor).0, "██");
    }
}

/// Named object layers and the collision query over them.
///
/// Every layer the game knows is a variant of `LayerId`; level data maps
/// glyphs onto these names and `LayerSet` stores one slot per variant.
/// A slot is `None` when the level never declared the layer, which is how
/// setup-time validation tells "empty" apart from "missing".
///
/// Object visibility is a render concern only. Hidden objects still
/// collide, exactly like alpha-0 sprites do.

/// Side of one tile in world units (16 px sprites at scale 4).
pub const TILE: f32 = 64.0;

/// Layer identifiers, declared in draw order (back to front).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LayerId {
    Platforms,
    Walls,
    Bridge,
    Water,
    WaterFrozen,
    WaterFrozen2,
    WaterFrozen3,
    Fire,
    Fire2,
    WaterWall,
    FireWall,
    Wall,
    Wall2,
    Plants,
    Plants2,
    Plants3,
    WallPlants,
    WallWater,
    FireLever,
    FireLeverTurned,
    WaterLever,
    WaterLeverTurned,
    Coins,
    Exit,
}

impl LayerId {
    pub const COUNT: usize = 24;

    pub const ALL: [LayerId; LayerId::COUNT] = [
        LayerId::Platforms,
        LayerId::Walls,
        LayerId::Bridge,
        LayerId::Water,
        LayerId::WaterFrozen,
        LayerId::WaterFrozen2,
        LayerId::WaterFrozen3,
        LayerId::Fire,
        LayerId::Fire2,
        LayerId::WaterWall,
        LayerId::FireWall,
        LayerId::Wall,
        LayerId::Wall2,
        LayerId::Plants,
        LayerId::Plants2,
        LayerId::Plants3,
        LayerId::WallPlants,
        LayerId::WallWater,
        LayerId::FireLever,
        LayerId::FireLeverTurned,
        LayerId::WaterLever,
        LayerId::WaterLeverTurned,
        LayerId::Coins,
        LayerId::Exit,
    ];

    /// Name as written in level files.
    pub fn name(self) -> &'static str {
        match self {
            LayerId::Platforms        => "Platforms",
            LayerId::Walls            => "Walls",
            LayerId::Bridge           => "Bridge",
            LayerId::Water            => "Water",
            LayerId::WaterFrozen      => "Water Frozen",
            LayerId::WaterFrozen2     => "Water Frozen2",
            LayerId::WaterFrozen3     => "Water Frozen3",
            LayerId::Fire             => "Fire",
            LayerId::Fire2            => "Fire2",
            LayerId::WaterWall        => "Water Wall",
            LayerId::FireWall         => "Fire Wall",
            LayerId::Wall             => "Wall",
            LayerId::Wall2            => "Wall2",
            LayerId::Plants           => "Plants",
            LayerId::Plants2          => "Plants2",
            LayerId::Plants3          => "Plants3",
            LayerId::WallPlants       => "Wall Plants",
            LayerId::WallWater        => "Wall Water",
            LayerId::FireLever        => "Fire Lever",
            LayerId::FireLeverTurned  => "Fire Lever Turned",
            LayerId::WaterLever       => "Water Lever",
            LayerId::WaterLeverTurned => "Water Lever Turned",
            LayerId::Coins            => "Coins",
            LayerId::Exit             => "Exit",
        }
    }

    pub fn from_name(name: &str) -> Option<LayerId> {
        LayerId::ALL.iter().copied().find(|l| l.name() == name)
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Axis-aligned rectangle, y pointing up.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Rect {
    pub left: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, bottom: f32, width: f32, height: f32) -> Self {
        Rect { left, bottom, width, height }
    }

    /// The tile at grid column `col`, counting rows up from the map bottom.
    pub fn tile(col: usize, row_from_bottom: usize) -> Self {
        Rect::new(col as f32 * TILE, row_from_bottom as f32 * TILE, TILE, TILE)
    }

    #[inline]
    pub fn right(&self) -> f32 { self.left + self.width }

    #[inline]
    pub fn top(&self) -> f32 { self.bottom + self.height }

    /// Strict overlap: rectangles that only share an edge do not overlap,
    /// so an actor resting on a platform is not "inside" it.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.bottom < other.top()
            && other.bottom < self.top()
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Rect {
        Rect { left: self.left + dx, bottom: self.bottom + dy, ..*self }
    }
}

#[derive(Clone, Debug)]
pub struct LevelObject {
    pub rect: Rect,
    pub visible: bool,
    /// Layer the object was authored in. Kept when the object moves to
    /// another layer so it still renders as what it is.
    pub origin: LayerId,
}

#[derive(Clone, Debug, Default)]
pub struct Layer {
    pub objects: Vec<LevelObject>,
}

/// Read-only overlap queries against named layers.
pub trait CollisionQuery {
    /// Rectangles of the objects in `layer` overlapping `rect`.
    fn overlapping(&self, rect: &Rect, layer: LayerId) -> Vec<Rect>;

    fn any_overlap(&self, rect: &Rect, layer: LayerId) -> bool {
        !self.overlapping(rect, layer).is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct LayerSet {
    slots: Vec<Option<Layer>>,
}

impl LayerSet {
    pub fn new() -> Self {
        LayerSet { slots: vec![None; LayerId::COUNT] }
    }

    /// Declare a layer (possibly empty). Idempotent.
    pub fn declare(&mut self, id: LayerId) {
        let slot = &mut self.slots[id.index()];
        if slot.is_none() {
            *slot = Some(Layer::default());
        }
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.slots[id.index()].is_some()
    }

    pub fn push(&mut self, id: LayerId, object: LevelObject) {
        self.declare(id);
        if let Some(layer) = &mut self.slots[id.index()] {
            layer.objects.push(object);
        }
    }

    /// Objects of a layer; undeclared layers read as empty.
    pub fn get(&self, id: LayerId) -> &[LevelObject] {
        match &self.slots[id.index()] {
            Some(layer) => &layer.objects,
            None => &[],
        }
    }

    pub fn is_empty(&self, id: LayerId) -> bool {
        self.get(id).is_empty()
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) {
        if let Some(layer) = &mut self.slots[id.index()] {
            for obj in &mut layer.objects {
                obj.visible = visible;
            }
        }
    }

    /// Remove every object of a layer. Returns how many were removed.
    pub fn clear(&mut self, id: LayerId) -> usize {
        match &mut self.slots[id.index()] {
            Some(layer) => std::mem::take(&mut layer.objects).len(),
            None => 0,
        }
    }

    /// Move every object of `from` into `to`, setting their visibility.
    /// Returns how many objects moved (0 once `from` is drained).
    pub fn move_into(&mut self, from: LayerId, to: LayerId, visible: bool) -> usize {
        let mut moved = match &mut self.slots[from.index()] {
            Some(layer) => std::mem::take(&mut layer.objects),
            None => return 0,
        };
        let count = moved.len();
        for obj in &mut moved {
            obj.visible = visible;
        }
        self.declare(to);
        if let Some(layer) = &mut self.slots[to.index()] {
            layer.objects.extend(moved);
        }
        count
    }

    /// Remove objects of `id` that overlap `rect`. Returns the count.
    pub fn remove_overlapping(&mut self, id: LayerId, rect: &Rect) -> usize {
        match &mut self.slots[id.index()] {
            Some(layer) => {
                let before = layer.objects.len();
                layer.objects.retain(|o| !o.rect.overlaps(rect));
                before - layer.objects.len()
            }
            None => 0,
        }
    }

    /// Declared layers in draw order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerId, &Layer)> {
        LayerId::ALL
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(id, slot)| slot.as_ref().map(|layer| (*id, layer)))
    }
}

impl Default for LayerSet {
    fn default() -> Self {
        LayerSet::new()
    }
}

impl CollisionQuery for LayerSet {
    fn overlapping(&self, rect: &Rect, layer: LayerId) -> Vec<Rect> {
        self.get(layer)
            .iter()
            .filter(|o| o.rect.overlaps(rect))
            .map(|o| o.rect)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_obj(col: usize, row: usize, origin: LayerId) -> LevelObject {
        LevelObject { rect: Rect::tile(col, row), visible: true, origin }
    }

    #[test]
    fn names_round_trip() {
        for id in LayerId::ALL {
            assert_eq!(LayerId::from_name(id.name()), Some(id));
        }
        assert_eq!(LayerId::from_name("Lava"), None);
    }

    #[test]
    fn all_is_in_index_order() {
        for (i, id) in LayerId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let floor = Rect::tile(0, 0);
        let standing = Rect::new(8.0, TILE, 48.0, 60.0);
        assert!(!standing.overlaps(&floor));
        assert!(standing.translated(0.0, -1.0).overlaps(&floor));
    }

    #[test]
    fn undeclared_layer_reads_empty() {
        let set = LayerSet::new();
        assert!(!set.contains(LayerId::Bridge));
        assert!(set.is_empty(LayerId::Bridge));
        assert!(set.overlapping(&Rect::tile(0, 0), LayerId::Bridge).is_empty());
    }

    #[test]
    fn declared_empty_layer_is_contained() {
        let mut set = LayerSet::new();
        set.declare(LayerId::Coins);
        assert!(set.contains(LayerId::Coins));
        assert!(set.is_empty(LayerId::Coins));
    }

    #[test]
    fn move_into_is_idempotent() {
        let mut set = LayerSet::new();
        set.declare(LayerId::Platforms);
        let mut hidden = tile_obj(3, 1, LayerId::Bridge);
        hidden.visible = false;
        set.push(LayerId::Bridge, hidden);
        set.push(LayerId::Bridge, tile_obj(4, 1, LayerId::Bridge));

        assert_eq!(set.move_into(LayerId::Bridge, LayerId::Platforms, true), 2);
        assert_eq!(set.move_into(LayerId::Bridge, LayerId::Platforms, true), 0);
        assert!(set.is_empty(LayerId::Bridge));
        assert_eq!(set.get(LayerId::Platforms).len(), 2);
        assert!(set.get(LayerId::Platforms).iter().all(|o| o.visible && o.origin == LayerId::Bridge));
    }

    #[test]
    fn clear_twice_removes_once() {
        let mut set = LayerSet::new();
        set.push(LayerId::Fire, tile_obj(0, 0, LayerId::Fire));
        assert_eq!(set.clear(LayerId::Fire), 1);
        assert_eq!(set.clear(LayerId::Fire), 0);
        assert!(set.contains(LayerId::Fire));
    }

    #[test]
    fn remove_overlapping_only_hits_overlaps() {
        let mut set = LayerSet::new();
        set.push(LayerId::Coins, tile_obj(0, 1, LayerId::Coins));
        set.push(LayerId::Coins, tile_obj(5, 1, LayerId::Coins));
        let probe = Rect::new(10.0, TILE + 2.0, 20.0, 20.0);
        assert_eq!(set.remove_overlapping(LayerId::Coins, &probe), 1);
        assert_eq!(set.get(LayerId::Coins).len(), 1);
    }
}

use crate::data::{Item, ItemId};

/// Screen box of a placed item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemRect {
    pub id: ItemId,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ItemRect {
    fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPoint {
    Before(ItemId),
    End,
}

/// Picks where a drop at `(x, y)` lands among `rects`.
pub fn insertion_point(rects: &[ItemRect], x: f64, y: f64) -> InsertionPoint {
    let mut closest: Option<(f64, ItemId)> = None;

    for rect in rects {
        let offset_y = y - rect.center_y();
        if offset_y.abs() >= rect.height {
            continue;
        }
        let offset_x = x - rect.center_x();
        if offset_x < 0.0 && closest.map_or(true, |(best, _)| offset_x > best) {
            closest = Some((offset_x, rect.id));
        }
    }

    match closest {
        Some((_, id)) => InsertionPoint::Before(id),
        None => InsertionPoint::End,
    }
}

/// Index in `tier` the dragged item should take, counted after it is lifted out.
pub fn target_position(tier: &[Item], dragged: ItemId, at: InsertionPoint) -> usize {
    let mut remaining = tier.iter().filter(|item| item.id != dragged);
    match at {
        InsertionPoint::Before(anchor) => remaining
            .position(|item| item.id == anchor)
            .unwrap_or_else(|| tier.iter().filter(|item| item.id != dragged).count()),
        InsertionPoint::End => remaining.count(),
    }
}

/// Stand-in shown where the dragged item would land.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub width: f64,
    pub height: f64,
    pub target: Option<(String, InsertionPoint)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging {
        item: ItemId,
        placeholder: Placeholder,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Grab {
        item: ItemId,
        width: f64,
        height: f64,
    },
    Hover {
        tier: String,
        x: f64,
        y: f64,
        rects: Vec<ItemRect>,
    },
    Drop {
        tier: String,
        x: f64,
        y: f64,
        rects: Vec<ItemRect>,
    },
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    Ignored,
    Started,
    Hovered,
    Dropped {
        item: ItemId,
        tier: String,
        at: InsertionPoint,
    },
    Cancelled,
}

/// Drag gesture state: idle, or dragging one item with a placeholder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DragMachine {
    phase: DragPhase,
}

impl DragMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn dragging(&self) -> Option<ItemId> {
        match &self.phase {
            DragPhase::Dragging { item, .. } => Some(*item),
            DragPhase::Idle => None,
        }
    }

    pub fn placeholder(&self) -> Option<&Placeholder> {
        match &self.phase {
            DragPhase::Dragging { placeholder, .. } => Some(placeholder),
            DragPhase::Idle => None,
        }
    }

    pub fn handle(&mut self, gesture: Gesture) -> DragOutcome {
        match gesture {
            Gesture::Grab {
                item,
                width,
                height,
            } => {
                self.phase = DragPhase::Dragging {
                    item,
                    placeholder: Placeholder {
                        width,
                        height,
                        target: None,
                    },
                };
                DragOutcome::Started
            }
            Gesture::Hover { tier, x, y, rects } => {
                let DragPhase::Dragging { item, placeholder } = &mut self.phase else {
                    return DragOutcome::Ignored;
                };
                let at = insertion_point(&without(&rects, *item), x, y);
                let target = Some((tier, at));
                if placeholder.target == target {
                    return DragOutcome::Ignored;
                }
                placeholder.target = target;
                DragOutcome::Hovered
            }
            Gesture::Drop { tier, x, y, rects } => {
                let Some(item) = self.dragging() else {
                    return DragOutcome::Ignored;
                };
                let at = insertion_point(&without(&rects, item), x, y);
                self.phase = DragPhase::Idle;
                DragOutcome::Dropped { item, tier, at }
            }
            Gesture::Cancel => match self.phase {
                DragPhase::Idle => DragOutcome::Ignored,
                DragPhase::Dragging { .. } => {
                    self.phase = DragPhase::Idle;
                    DragOutcome::Cancelled
                }
            },
        }
    }
}

fn without(rects: &[ItemRect], dragged: ItemId) -> Vec<ItemRect> {
    rects
        .iter()
        .filter(|rect| rect.id != dragged)
        .copied()
        .collect()
}

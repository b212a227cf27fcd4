use crate::data::{Item, ItemId};
use crate::storage::{BrowserStore, LocalTierStore, RawStore, SavedTierList};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankingError {
    UnknownTier(String),
    UnknownItem(ItemId),
    AlreadyPlaced(ItemId),
    NotPlaced(ItemId),
}

impl fmt::Display for RankingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingError::UnknownTier(tier) => write!(f, "unknown tier '{}'", tier),
            RankingError::UnknownItem(id) => write!(f, "item {} is not in the catalog", id),
            RankingError::AlreadyPlaced(id) => write!(f, "item {} is already placed", id),
            RankingError::NotPlaced(id) => write!(f, "item {} is not placed in any tier", id),
        }
    }
}

impl std::error::Error for RankingError {}

/// Items placed per tier, tiers kept in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierBoard {
    tiers: Vec<(String, Vec<Item>)>,
}

impl TierBoard {
    pub fn new(tier_ids: &[String]) -> Self {
        Self {
            tiers: tier_ids.iter().map(|id| (id.clone(), Vec::new())).collect(),
        }
    }

    /// Rebuilds a board from saved data. Unknown tiers and repeated ids are dropped.
    pub fn from_saved(tier_ids: &[String], saved: &SavedTierList) -> Self {
        let mut board = Self::new(tier_ids);
        let mut seen = HashSet::new();

        for (tier_id, items) in saved.tiers() {
            let Some(index) = board.tier_index(tier_id) else {
                debug!("Skipping saved tier '{}' with no matching tier", tier_id);
                continue;
            };
            for item in items {
                if !seen.insert(item.id) {
                    warn!("Dropping repeated saved item {} in '{}'", item.id, tier_id);
                    continue;
                }
                board.tiers[index].1.push(item.clone());
            }
        }

        board
    }

    pub fn to_saved(&self) -> SavedTierList {
        let mut saved = SavedTierList::new();
        for (tier_id, items) in &self.tiers {
            saved.push_tier(tier_id.clone(), items.clone());
        }
        saved
    }

    pub fn tier_ids(&self) -> impl Iterator<Item = &str> {
        self.tiers.iter().map(|(id, _)| id.as_str())
    }

    pub fn tier(&self, tier_id: &str) -> Option<&[Item]> {
        self.tier_index(tier_id)
            .map(|index| self.tiers[index].1.as_slice())
    }

    pub fn placed_count(&self) -> usize {
        self.tiers.iter().map(|(_, items)| items.len()).sum()
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.locate(item_id).is_some()
    }

    /// `(tier index, position)` of a placed item.
    pub fn locate(&self, item_id: ItemId) -> Option<(usize, usize)> {
        self.tiers.iter().enumerate().find_map(|(tier_index, (_, items))| {
            items
                .iter()
                .position(|item| item.id == item_id)
                .map(|position| (tier_index, position))
        })
    }

    pub fn tier_of(&self, item_id: ItemId) -> Option<&str> {
        self.locate(item_id)
            .map(|(tier_index, _)| self.tiers[tier_index].0.as_str())
    }

    pub fn append(&mut self, tier_id: &str, item: Item) -> Result<(), RankingError> {
        if self.contains(item.id) {
            return Err(RankingError::AlreadyPlaced(item.id));
        }
        let index = self
            .tier_index(tier_id)
            .ok_or_else(|| RankingError::UnknownTier(tier_id.to_owned()))?;
        self.tiers[index].1.push(item);
        Ok(())
    }

    /// Moves a placed item to `position` in `tier_id`, clamping the position.
    pub fn reorder(&mut self, item_id: ItemId, tier_id: &str, position: usize) -> Result<(), RankingError> {
        let target = self
            .tier_index(tier_id)
            .ok_or_else(|| RankingError::UnknownTier(tier_id.to_owned()))?;
        let (source, current) = self
            .locate(item_id)
            .ok_or(RankingError::NotPlaced(item_id))?;

        let item = self.tiers[source].1.remove(current);
        let items = &mut self.tiers[target].1;
        let position = position.min(items.len());
        items.insert(position, item);
        Ok(())
    }

    pub fn clear(&mut self) {
        for (_, items) in &mut self.tiers {
            items.clear();
        }
    }

    /// Items in display order across all tiers.
    pub fn flattened(&self) -> impl Iterator<Item = &Item> {
        self.tiers.iter().flat_map(|(_, items)| items.iter())
    }

    /// 1-based rank of every placed item, numbered across tiers in display order.
    pub fn global_ranks(&self) -> HashMap<ItemId, usize> {
        self.flattened()
            .enumerate()
            .map(|(index, item)| (item.id, index + 1))
            .collect()
    }

    fn tier_index(&self, tier_id: &str) -> Option<usize> {
        self.tiers.iter().position(|(id, _)| id == tier_id)
    }
}

/// One ranking session: the catalog, the board, the cursor, and where the board is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingSession<S: RawStore = BrowserStore> {
    catalog: Vec<Item>,
    board: TierBoard,
    cursor: usize,
    store: LocalTierStore<S>,
}

impl<S: RawStore> RankingSession<S> {
    pub fn new(catalog: Vec<Item>, tier_ids: &[String], store: LocalTierStore<S>) -> Self {
        Self {
            catalog,
            board: TierBoard::new(tier_ids),
            cursor: 0,
            store,
        }
    }

    /// Replaces the board with whatever the local store holds.
    pub fn restore(&mut self) {
        let tier_ids: Vec<String> = self.board.tier_ids().map(str::to_owned).collect();
        let board = match self.store.load() {
            Some(saved) => TierBoard::from_saved(&tier_ids, &saved),
            None => TierBoard::new(&tier_ids),
        };
        self.board = self.resolve_against_catalog(board);
        self.cursor = self.board.placed_count();
        debug!(
            "Restored {} placed items from '{}'",
            self.cursor,
            self.store.key()
        );
    }

    /// Stores a blob pulled from the server locally, then restores from it.
    pub fn rehydrate(&mut self, raw: &str) {
        self.store.hydrate(raw);
        self.restore();
    }

    pub fn catalog(&self) -> &[Item] {
        &self.catalog
    }

    pub fn board(&self) -> &TierBoard {
        &self.board
    }

    pub fn store(&self) -> &LocalTierStore<S> {
        &self.store
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// First unplaced catalog item at or after the cursor, else the first unplaced one before it.
    pub fn current(&self) -> Option<&Item> {
        let start = self.cursor.min(self.catalog.len());
        let (before, after) = self.catalog.split_at(start);
        after
            .iter()
            .chain(before.iter())
            .find(|item| !self.board.contains(item.id))
    }

    pub fn is_complete(&self) -> bool {
        self.current().is_none()
    }

    /// `(shown position, total)`, 1-based and capped at the total.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.catalog.len();
        ((self.cursor + 1).min(total), total)
    }

    /// Places an item at the end of a tier. `Ok(false)` once everything is ranked.
    pub fn assign(&mut self, item_id: ItemId, tier_id: &str) -> Result<bool, RankingError> {
        if self.is_complete() {
            return Ok(false);
        }
        let item = self
            .catalog
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
            .ok_or(RankingError::UnknownItem(item_id))?;

        self.board.append(tier_id, item)?;
        self.cursor += 1;
        self.save();
        Ok(true)
    }

    pub fn assign_current(&mut self, tier_id: &str) -> Result<bool, RankingError> {
        match self.current().map(|item| item.id) {
            Some(item_id) => self.assign(item_id, tier_id),
            None => Ok(false),
        }
    }

    pub fn reorder(&mut self, item_id: ItemId, tier_id: &str, position: usize) -> Result<(), RankingError> {
        self.board.reorder(item_id, tier_id, position)?;
        self.save();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.board.clear();
        self.cursor = 0;
        self.store.clear();
    }

    /// Writes the board again without changing it.
    pub fn resave(&self) {
        self.save();
    }

    pub fn global_ranks(&self) -> HashMap<ItemId, usize> {
        self.board.global_ranks()
    }

    pub fn rank_of(&self, item_id: ItemId) -> Option<usize> {
        self.board
            .flattened()
            .position(|item| item.id == item_id)
            .map(|index| index + 1)
    }

    fn save(&self) {
        self.store.save(&self.board.to_saved());
    }

    fn resolve_against_catalog(&self, mut board: TierBoard) -> TierBoard {
        let by_id: HashMap<ItemId, &Item> = self.catalog.iter().map(|item| (item.id, item)).collect();
        for (_, items) in &mut board.tiers {
            for item in items.iter_mut() {
                match by_id.get(&item.id) {
                    Some(known) => *item = (*known).clone(),
                    None => {
                        debug!("Saved item {} is not in the current catalog", item.id);
                        *item = item.clone().normalized();
                    }
                }
            }
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    fn tier_ids() -> Vec<String> {
        ["tier-S", "tier-A", "tier-B"]
            .iter()
            .map(|id| id.to_string())
            .collect()
    }

    fn starters() -> Vec<Item> {
        vec![
            Item::new(1, "Bulbasaur", "https://img/1.png"),
            Item::new(2, "Ivysaur", "https://img/2.png"),
            Item::new(3, "Venusaur", "https://img/3.png"),
        ]
    }

    fn session_with(backend: MemoryStore) -> RankingSession<MemoryStore> {
        RankingSession::new(starters(), &tier_ids(), LocalTierStore::new(backend, "1"))
    }

    fn names(session: &RankingSession<MemoryStore>, tier: &str) -> Vec<String> {
        session
            .board()
            .tier(tier)
            .unwrap()
            .iter()
            .map(|item| item.name.clone())
            .collect()
    }

    fn assert_contiguous(session: &RankingSession<MemoryStore>) {
        let ranks = session.global_ranks();
        let mut values: Vec<usize> = ranks.values().copied().collect();
        values.sort_unstable();
        let expected: Vec<usize> = (1..=session.board().placed_count()).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn starter_scenario() {
        let mut session = session_with(MemoryStore::default());

        assert_eq!(session.assign(1, "tier-S"), Ok(true));
        assert_eq!(session.cursor(), 1);
        assert_eq!(names(&session, "tier-S"), ["Bulbasaur"]);
        assert_eq!(session.rank_of(1), Some(1));

        assert_eq!(session.assign(2, "tier-A"), Ok(true));
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.rank_of(1), Some(1));
        assert_eq!(session.rank_of(2), Some(2));

        session.reorder(1, "tier-A", 0).unwrap();
        assert!(names(&session, "tier-S").is_empty());
        assert_eq!(names(&session, "tier-A"), ["Bulbasaur", "Ivysaur"]);
        assert_eq!(session.rank_of(1), Some(1));
        assert_eq!(session.rank_of(2), Some(2));
        assert_eq!(session.cursor(), 2);
    }

    #[test]
    fn assign_past_catalog_end_is_a_no_op() {
        let mut session = session_with(MemoryStore::default());
        for tier in ["tier-S", "tier-A", "tier-B"] {
            assert_eq!(session.assign_current(tier), Ok(true));
        }
        assert!(session.is_complete());
        let before = session.board().clone();

        assert_eq!(session.assign(1, "tier-S"), Ok(false));
        assert_eq!(session.assign_current("tier-S"), Ok(false));
        assert_eq!(session.board(), &before);
        assert_eq!(session.cursor(), 3);
    }

    #[test]
    fn ranks_follow_tier_order_not_assignment_order() {
        let mut session = session_with(MemoryStore::default());
        session.assign_current("tier-B").unwrap();
        session.assign_current("tier-S").unwrap();
        session.assign_current("tier-A").unwrap();

        assert_eq!(session.rank_of(2), Some(1));
        assert_eq!(session.rank_of(3), Some(2));
        assert_eq!(session.rank_of(1), Some(3));
        assert_contiguous(&session);
    }

    #[test]
    fn assign_rejects_contract_violations() {
        let mut session = session_with(MemoryStore::default());
        assert_eq!(
            session.assign(1, "tier-Z"),
            Err(RankingError::UnknownTier("tier-Z".to_owned()))
        );
        assert_eq!(session.assign(99, "tier-S"), Err(RankingError::UnknownItem(99)));
        session.assign(1, "tier-S").unwrap();
        assert_eq!(session.assign(1, "tier-A"), Err(RankingError::AlreadyPlaced(1)));
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn reorders_keep_every_item_once() {
        let mut session = session_with(MemoryStore::default());
        session.assign_current("tier-S").unwrap();
        session.assign_current("tier-S").unwrap();
        session.assign_current("tier-A").unwrap();

        let moves: &[(ItemId, &str, usize)] = &[
            (3, "tier-S", 0),
            (1, "tier-B", 10),
            (2, "tier-B", 0),
            (3, "tier-B", 1),
            (1, "tier-B", 1),
            (2, "tier-S", 5),
        ];
        for &(id, tier, position) in moves {
            session.reorder(id, tier, position).unwrap();
            assert_eq!(session.board().placed_count(), 3);
            let mut ids: Vec<ItemId> = session.board().flattened().map(|item| item.id).collect();
            ids.sort_unstable();
            assert_eq!(ids, [1, 2, 3]);
            assert_contiguous(&session);
        }
        assert_eq!(session.cursor(), 3);
    }

    #[test]
    fn reorder_clamps_position_and_rejects_unplaced() {
        let mut session = session_with(MemoryStore::default());
        session.assign_current("tier-S").unwrap();
        session.assign_current("tier-S").unwrap();

        session.reorder(1, "tier-S", 42).unwrap();
        assert_eq!(names(&session, "tier-S"), ["Ivysaur", "Bulbasaur"]);

        assert_eq!(session.reorder(3, "tier-S", 0), Err(RankingError::NotPlaced(3)));
        assert_eq!(
            session.reorder(1, "tier-X", 0),
            Err(RankingError::UnknownTier("tier-X".to_owned()))
        );
    }

    #[test]
    fn restore_out_of_catalog_order_still_offers_every_item() {
        let mut session = session_with(MemoryStore::default());
        session.rehydrate(r#"{"tier-S": [{"id": 2, "name": "Ivysaur", "sprite_url": "y"}]}"#);
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.current().map(|item| item.id), Some(3));

        assert_eq!(session.assign_current("tier-A"), Ok(true));
        assert_eq!(session.current().map(|item| item.id), Some(1));
        assert_eq!(session.assign_current("tier-B"), Ok(true));

        assert!(session.is_complete());
        assert_eq!(session.assign_current("tier-S"), Ok(false));
        assert_eq!(session.board().placed_count(), 3);
        assert_contiguous(&session);
    }

    #[test]
    fn resave_writes_the_unchanged_board() {
        let backend = MemoryStore::default();
        let mut session = session_with(backend.clone());
        session.assign_current("tier-S").unwrap();
        session.assign_current("tier-A").unwrap();
        session.store().clear();
        assert!(backend.get("tierlist_gen_1").is_none());

        session.resave();
        assert_eq!(session.store().load(), Some(session.board().to_saved()));
        let mut restored = session_with(backend);
        restored.restore();
        assert_eq!(restored.board(), session.board());
    }

    #[test]
    fn reorder_to_same_spot_still_saves() {
        let backend = MemoryStore::default();
        let mut session = session_with(backend.clone());
        session.assign_current("tier-S").unwrap();
        session.store().clear();

        session.reorder(1, "tier-S", 0).unwrap();
        assert_eq!(names(&session, "tier-S"), ["Bulbasaur"]);
        assert!(backend.get("tierlist_gen_1").is_some());
    }

    #[test]
    fn every_mutation_is_saved() {
        let backend = MemoryStore::default();
        let mut session = session_with(backend.clone());
        session.assign_current("tier-A").unwrap();
        session.assign_current("tier-S").unwrap();
        session.reorder(1, "tier-S", 1).unwrap();

        let mut restored = session_with(backend);
        restored.restore();
        assert_eq!(restored.board(), session.board());
        assert_eq!(restored.cursor(), 2);
    }

    #[test]
    fn reset_clears_board_cursor_and_store() {
        let backend = MemoryStore::default();
        let mut session = session_with(backend.clone());
        session.assign_current("tier-S").unwrap();
        session.assign_current("tier-A").unwrap();

        session.reset();
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.board().placed_count(), 0);
        assert!(session.board().tier_ids().all(|id| session.board().tier(id).unwrap().is_empty()));
        assert!(session.store().load().is_none());
        assert!(backend.get("tierlist_gen_1").is_none());
    }

    #[test]
    fn restore_from_nothing_or_garbage_is_empty() {
        let backend = MemoryStore::default();
        let mut session = session_with(backend.clone());
        session.restore();
        assert_eq!(session.cursor(), 0);

        session.rehydrate("definitely not json");
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.board().placed_count(), 0);
        assert_eq!(session.current().map(|item| item.id), Some(1));
    }

    #[test]
    fn restore_skips_unknown_tiers_and_repeats() {
        let mut session = session_with(MemoryStore::default());
        session.rehydrate(
            r#"{
                "tier-S": [{"id": 1, "name": "Bulbasaur", "sprite_url": "old"}],
                "tier-Q": [{"id": 3, "name": "Venusaur", "sprite_url": "x"}],
                "tier-A": [{"id": 1, "name": "Bulbasaur", "sprite_url": "old"},
                           {"id": 2, "name": "Ivysaur", "sprite_url": "y"}]
            }"#,
        );

        assert_eq!(names(&session, "tier-S"), ["Bulbasaur"]);
        assert_eq!(names(&session, "tier-A"), ["Ivysaur"]);
        assert_eq!(session.cursor(), 2);
        assert_eq!(session.current().map(|item| item.id), Some(3));
        // catalog data wins over what was saved
        assert_eq!(
            session.board().tier("tier-S").unwrap()[0].sprite_url,
            "https://img/1.png"
        );
    }

    #[test]
    fn progress_caps_at_total() {
        let mut session = session_with(MemoryStore::default());
        assert_eq!(session.progress(), (1, 3));
        for _ in 0..3 {
            session.assign_current("tier-B").unwrap();
        }
        assert_eq!(session.progress(), (3, 3));
    }

    #[test]
    fn board_round_trips_through_saved_form() {
        let mut board = TierBoard::new(&tier_ids());
        board.append("tier-A", Item::new(5, "Charmeleon", "c")).unwrap();
        board.append("tier-A", Item::new(4, "Charmander", "d")).unwrap();
        board.append("tier-B", Item::new(6, "Charizard", "e")).unwrap();

        let saved = board.to_saved();
        let json = serde_json::to_string(&saved).unwrap();
        let parsed: SavedTierList = serde_json::from_str(&json).unwrap();
        assert_eq!(TierBoard::from_saved(&tier_ids(), &parsed), board);
        assert_eq!(board.tier_of(4), Some("tier-A"));
    }
}

//! Power-up economy.
//!
//! State is split in two so undo can never hand back a spent power-up:
//!
//! - [`BoardEffects`] is replayable. It travels inside every history
//!   snapshot and is restored by undo (frozen tiles, slow motion, the set of
//!   ranks that already paid out).
//! - [`Economy`] only moves forward. Undo never touches it (inventory,
//!   extra-undo credits, lifetime grant counters, highest rank reached).

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::tile::TileId;

/// Identifier of a power-up instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerUpId(pub u64);

/// The five power-up types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    Freeze,
    Swap,
    Delete,
    Undo,
    SlowMo,
}

/// How a power-up takes effect once activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Applies at once and leaves the inventory.
    Immediate,
    /// Opens a selection that needs `required` tile picks.
    Select { required: usize },
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::Freeze,
        PowerUpKind::Swap,
        PowerUpKind::Delete,
        PowerUpKind::Undo,
        PowerUpKind::SlowMo,
    ];

    pub const fn activation(self) -> Activation {
        match self {
            PowerUpKind::Freeze | PowerUpKind::Delete => Activation::Select { required: 1 },
            PowerUpKind::Swap => Activation::Select { required: 2 },
            PowerUpKind::Undo | PowerUpKind::SlowMo => Activation::Immediate,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> PowerUpKind {
        PowerUpKind::ALL[rng.gen_range(0..PowerUpKind::ALL.len())]
    }
}

impl std::fmt::Display for PowerUpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PowerUpKind::Freeze => "Freeze",
            PowerUpKind::Swap => "Swap",
            PowerUpKind::Delete => "Delete",
            PowerUpKind::Undo => "Undo",
            PowerUpKind::SlowMo => "Slow-Mo",
        };
        f.write_str(name)
    }
}

/// A power-up held in the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: PowerUpId,
    pub kind: PowerUpKind,
    /// Successful-move count at the time of the grant.
    pub created_turn: u64,
}

/// Bounded list of held power-ups, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    cap: usize,
    slots: Vec<PowerUp>,
}

impl Inventory {
    pub fn new(cap: usize) -> Self {
        Inventory {
            cap,
            slots: Vec::with_capacity(cap),
        }
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.cap
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn slots(&self) -> &[PowerUp] {
        &self.slots
    }

    pub fn get(&self, id: PowerUpId) -> Option<&PowerUp> {
        self.slots.iter().find(|power_up| power_up.id == id)
    }

    /// Power-up in the given slot (0-based).
    pub fn slot(&self, index: usize) -> Option<&PowerUp> {
        self.slots.get(index)
    }

    /// Store a power-up, handing it back if there is no room.
    pub fn add(&mut self, power_up: PowerUp) -> Result<(), PowerUp> {
        if self.is_full() {
            return Err(power_up);
        }
        self.slots.push(power_up);
        Ok(())
    }

    pub fn remove(&mut self, id: PowerUpId) -> Option<PowerUp> {
        let index = self.slots.iter().position(|power_up| power_up.id == id)?;
        Some(self.slots.remove(index))
    }
}

/// Remaining freeze turns per tile. A tile with no entry is not frozen;
/// entries are removed when they reach zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrozenTiles(BTreeMap<TileId, u32>);

impl FrozenTiles {
    pub fn new() -> Self {
        FrozenTiles::default()
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn turns(&self, id: TileId) -> Option<u32> {
        self.0.get(&id).copied()
    }

    /// Add `turns` to the tile's countdown, on top of any remaining turns.
    pub fn freeze(&mut self, id: TileId, turns: u32) -> u32 {
        if turns == 0 {
            return self.turns(id).unwrap_or(0);
        }
        let remaining = self.0.entry(id).or_insert(0);
        *remaining += turns;
        *remaining
    }

    pub fn release(&mut self, id: TileId) -> bool {
        self.0.remove(&id).is_some()
    }

    /// Count every frozen tile down by one turn, returning the tiles that thawed.
    pub fn tick(&mut self) -> Vec<TileId> {
        let mut thawed = Vec::new();
        self.0.retain(|&id, remaining| {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                thawed.push(id);
                false
            } else {
                true
            }
        });
        thawed
    }

    pub fn ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Power-up state that undo replays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEffects {
    pub frozen: FrozenTiles,
    pub slow_motion_turns: u32,
    /// Ranks that already produced a power-up grant.
    pub generated_ranks: BTreeSet<u8>,
}

impl BoardEffects {
    pub fn slow_motion_active(&self) -> bool {
        self.slow_motion_turns > 0
    }
}

/// Power-up state that only moves forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Economy {
    pub inventory: Inventory,
    pub extra_undo_credits: u32,
    /// Undo power-ups ever granted this session, used or not.
    pub undo_power_ups_generated: u32,
    /// Highest rank ever reached. Never decreases, not even on undo.
    pub highest_rank: u8,
    next_power_up_id: PowerUpId,
}

/// Result of crossing into a new highest rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankReward {
    Granted(PowerUp),
    InventoryFull,
}

impl Economy {
    pub fn new(inventory_cap: usize, highest_rank: u8) -> Self {
        Economy {
            inventory: Inventory::new(inventory_cap),
            extra_undo_credits: 0,
            undo_power_ups_generated: 0,
            highest_rank,
            next_power_up_id: PowerUpId(1),
        }
    }

    /// Put a power-up of `kind` into the inventory.
    ///
    /// Granting an Undo power-up permanently raises the lifetime counter that
    /// sizes the history, whether or not it is ever used.
    pub fn grant(&mut self, kind: PowerUpKind, turn: u64) -> Option<PowerUp> {
        let power_up = PowerUp {
            id: self.next_power_up_id,
            kind,
            created_turn: turn,
        };
        self.inventory.add(power_up).ok()?;
        self.next_power_up_id = PowerUpId(self.next_power_up_id.0 + 1);
        if kind == PowerUpKind::Undo {
            self.undo_power_ups_generated += 1;
        }
        Some(power_up)
    }

    /// React to `rank` appearing on the board after a move.
    ///
    /// A grant happens only when the rank is strictly above every rank seen
    /// before, that rank has not paid out yet, and the inventory has room.
    pub fn on_rank_reached<R: Rng + ?Sized>(
        &mut self,
        effects: &mut BoardEffects,
        rank: u8,
        turn: u64,
        rng: &mut R,
    ) -> Option<RankReward> {
        if rank <= self.highest_rank {
            return None;
        }
        self.highest_rank = rank;
        if effects.generated_ranks.contains(&rank) {
            debug!(rank, "rank already paid out");
            return None;
        }
        if self.inventory.is_full() {
            info!(rank, "new highest rank but the inventory is full");
            return Some(RankReward::InventoryFull);
        }
        let kind = PowerUpKind::random(rng);
        let power_up = self.grant(kind, turn)?;
        effects.generated_ranks.insert(rank);
        info!(rank, %kind, "power-up granted");
        Some(RankReward::Granted(power_up))
    }
}

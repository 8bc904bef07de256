//! Classification of record changes between two snapshots of one file.

use crate::git_mining::CommitId;
use crate::snapshot::SourceSnapshot;
use recordscope_cache::{SlotCounts, SLOT_COUNT};
use std::fmt;
use std::ops::{AddAssign, Index};

/// Outcome slot, in report column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Records introduced with a new file.
    NewFile,
    /// Class converted to a record at the same path.
    ClassToRecord,
    /// Record added to an existing file.
    AddedToFile,
    /// Record additions not attributed to a path.
    ResidualAdded,
    /// Records removed with a deleted file.
    DeletedFile,
    /// Record converted to a class at the same path.
    RecordToClass,
    /// Record removed from a surviving file.
    RemovedFromFile,
    /// Record removals not attributed to a path.
    ResidualRemoved,
    /// Record whose content changed while staying a record.
    ContentChanged,
}

impl Slot {
    pub const ALL: [Slot; SLOT_COUNT] = [
        Slot::NewFile,
        Slot::ClassToRecord,
        Slot::AddedToFile,
        Slot::ResidualAdded,
        Slot::DeletedFile,
        Slot::RecordToClass,
        Slot::RemovedFromFile,
        Slot::ResidualRemoved,
        Slot::ContentChanged,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Report column name.
    pub fn column(self) -> &'static str {
        match self {
            Slot::NewFile => "new_file",
            Slot::ClassToRecord => "class_to_record",
            Slot::AddedToFile => "added_to_file",
            Slot::ResidualAdded => "residual_added",
            Slot::DeletedFile => "deleted_file",
            Slot::RecordToClass => "record_to_class",
            Slot::RemovedFromFile => "removed_from_file",
            Slot::ResidualRemoved => "residual_removed",
            Slot::ContentChanged => "content_changed",
        }
    }
}

/// Fixed 9-slot counter vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeSlots(SlotCounts);

impl OutcomeSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counts(counts: SlotCounts) -> Self {
        Self(counts)
    }

    pub fn counts(&self) -> SlotCounts {
        self.0
    }

    pub fn get(&self, slot: Slot) -> u64 {
        self.0[slot.index()]
    }

    pub fn add(&mut self, slot: Slot, n: u64) {
        self.0[slot.index()] += n;
    }

    pub fn increment(&mut self, slot: Slot) {
        self.add(slot, 1);
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }
}

impl Index<Slot> for OutcomeSlots {
    type Output = u64;

    fn index(&self, slot: Slot) -> &u64 {
        &self.0[slot.index()]
    }
}

impl AddAssign for OutcomeSlots {
    fn add_assign(&mut self, other: Self) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0) {
            *mine += theirs;
        }
    }
}

impl fmt::Display for OutcomeSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Classification of one changed file in one commit step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutcome {
    pub commit: CommitId,
    pub file_path: String,
    pub slots: OutcomeSlots,
}

/// Compare two snapshots of the same file across a commit boundary.
///
/// Pure: the result depends only on the two snapshots.
///
/// # Panics
///
/// Panics if the residual slots would go negative, which means the per-path
/// accounting and the aggregate totals disagree.
pub fn classify(before: &SourceSnapshot, after: &SourceSnapshot) -> OutcomeSlots {
    let mut slots = OutcomeSlots::new();

    match (before.exists(), after.exists()) {
        (false, false) => return slots,
        (false, true) => {
            slots.add(Slot::NewFile, after.aggregate_count() as u64);
            return slots;
        }
        (true, false) => {
            slots.add(Slot::DeletedFile, before.aggregate_count() as u64);
            return slots;
        }
        (true, true) => {}
    }

    let mut paired = 0u64;

    for (path, old) in before.declarations() {
        match after.get(path) {
            Some(new) => match (old.is_aggregate(), new.is_aggregate()) {
                (false, true) => slots.increment(Slot::ClassToRecord),
                (true, false) => slots.increment(Slot::RecordToClass),
                (true, true) => {
                    paired += 1;
                    if !old.structurally_equal(new) {
                        slots.increment(Slot::ContentChanged);
                    }
                }
                (false, false) => {}
            },
            None if old.is_aggregate() => slots.increment(Slot::RemovedFromFile),
            None => {}
        }
    }

    for (path, new) in after.declarations() {
        if new.is_aggregate() && !before.contains(path) {
            slots.increment(Slot::AddedToFile);
        }
    }

    let accounted_after = paired + slots[Slot::ClassToRecord] + slots[Slot::AddedToFile];
    slots.add(
        Slot::ResidualAdded,
        residual(after, accounted_after, Slot::ResidualAdded),
    );

    let accounted_before = paired + slots[Slot::RecordToClass] + slots[Slot::RemovedFromFile];
    slots.add(
        Slot::ResidualRemoved,
        residual(before, accounted_before, Slot::ResidualRemoved),
    );

    slots
}

fn residual(snapshot: &SourceSnapshot, accounted: u64, slot: Slot) -> u64 {
    let total = snapshot.aggregate_count() as u64;
    assert!(
        accounted <= total,
        "{} would be negative for {}: {} records accounted, {} present",
        slot.column(),
        snapshot.file_path(),
        accounted,
        total
    );
    total - accounted
}

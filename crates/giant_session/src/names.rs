//! The name table: the map's vanilla names followed by one name per giant.
//!
//! The table is never patched in place. Every refresh rebuilds the whole
//! promoted suffix after the fixed vanilla prefix, so a giant promoted or
//! killed between refreshes cannot leave another giant pointing at the wrong
//! slot.
//!
//! ```text
//! [0, vanilla_len)                      vanilla names, fixed per map
//! [vanilla_len, vanilla_len + giants)   one rebuilt name per named giant
//! ```

use tracing::debug;

use crate::binding::{CreatureInfo, NameSource};

/// Slot value meaning "no name-list entry".
pub const NO_SLOT: i32 = -1;

/// The vanilla prefix of the name table for one map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VanillaNames {
    names: Vec<String>,
}

impl VanillaNames {
    /// Wrap the map's vanilla names.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Number of vanilla names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the map has no vanilla names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The vanilla names in slot order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Looks up a vanilla slot.
    #[must_use]
    pub fn get(&self, slot: i32) -> Option<&str> {
        usize::try_from(slot)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// First slot of the promoted suffix.
    #[must_use]
    pub fn first_promoted_slot(&self) -> i32 {
        i32::try_from(self.names.len()).unwrap_or(i32::MAX)
    }

    /// Slot of the `position`-th promoted name.
    #[must_use]
    pub fn promoted_slot(&self, position: usize) -> i32 {
        i32::try_from(self.names.len() + position).unwrap_or(i32::MAX)
    }

    /// Maps a slot that points into the promoted suffix back to [`NO_SLOT`],
    /// so ordinary creatures never display a giant's name.
    #[must_use]
    pub fn sanitize_slot(&self, slot: i32) -> i32 {
        if slot >= self.first_promoted_slot() {
            NO_SLOT
        } else {
            slot
        }
    }
}

/// A creature's name before promotion is applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseName {
    /// The creature's own name; gets the prefix.
    Own(String),
    /// The parent's displayed name; shown verbatim.
    Parent(String),
}

/// Resolves a creature's vanilla display name the way the engine does:
/// vanilla slot, then parent, then transformation, then balance, then the
/// classification default.
#[must_use]
pub fn resolve_base_name(
    vanilla: &VanillaNames,
    vanilla_slot: i32,
    naming: &NameSource,
) -> Option<BaseName> {
    if let Some(name) = vanilla.get(vanilla_slot) {
        return Some(BaseName::Own(name.to_string()));
    }

    if naming.defers_to_parent
        && let Some(parent) = &naming.parent_name
    {
        return Some(BaseName::Parent(parent.clone()));
    }

    let own = if naming.transformed {
        naming.transformed_name.clone()
    } else {
        naming.balance_name.clone()
    };

    own.or_else(|| naming.class_default_name.clone())
        .map(BaseName::Own)
}

/// Computes a promoted creature's display name.
///
/// Returns `None` while the creature's balance is unresolved or no name can
/// be found; the caller retries on a later refresh.
#[must_use]
pub fn giant_name(
    vanilla: &VanillaNames,
    info: &CreatureInfo,
    vanilla_slot: i32,
    prefix: &str,
) -> Option<String> {
    if !info.balance_resolved {
        return None;
    }

    let own = match resolve_base_name(vanilla, vanilla_slot, &info.naming)? {
        BaseName::Parent(name) => return Some(name),
        BaseName::Own(name) => name,
    };

    let prefixed = format!("{prefix}{own}");
    match &info.naming.mastery {
        Some(mastery) if !mastery.owner_name.is_empty() => Some(
            mastery
                .template
                .replace("%s", &mastery.owner_name)
                .replace("%n", &prefixed),
        ),
        _ => Some(prefixed),
    }
}

/// A complete name table: vanilla prefix plus promoted suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    names: Vec<String>,
    vanilla_len: usize,
}

impl NameTable {
    /// A table holding only the vanilla names.
    #[must_use]
    pub fn vanilla_only(vanilla: &VanillaNames) -> Self {
        Self {
            names: vanilla.names().to_vec(),
            vanilla_len: vanilla.len(),
        }
    }

    /// A table whose suffix keeps one entry per position, with an empty
    /// placeholder for positions that could not be named yet.
    ///
    /// Trailing unnamed positions are dropped: nothing points at them.
    #[must_use]
    pub fn positional(
        vanilla: &VanillaNames,
        entries: impl IntoIterator<Item = Option<String>>,
    ) -> Self {
        let mut suffix: Vec<Option<String>> = entries.into_iter().collect();
        while matches!(suffix.last(), Some(None)) {
            suffix.pop();
        }

        let mut table = Self::vanilla_only(vanilla);
        table
            .names
            .extend(suffix.into_iter().map(Option::unwrap_or_default));
        table
    }

    /// All names in slot order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Length of the vanilla prefix.
    #[must_use]
    pub fn vanilla_len(&self) -> usize {
        self.vanilla_len
    }

    /// Number of entries in the promoted suffix.
    #[must_use]
    pub fn promoted_len(&self) -> usize {
        self.names.len() - self.vanilla_len
    }

    /// Looks up a slot.
    #[must_use]
    pub fn get(&self, slot: i32) -> Option<&str> {
        usize::try_from(slot)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }
}

/// Result of a compact refresh.
#[derive(Debug)]
pub struct Refresh<T> {
    /// The rebuilt table.
    pub table: NameTable,
    /// Entries that were named, with their assigned slot, in input order.
    pub placed: Vec<(T, i32)>,
    /// Entries that could not be named this time.
    pub skipped: Vec<T>,
}

/// Rebuilds the name table from the vanilla names and the promoted entries,
/// in order. `name_fn` names one entry or returns `None` to skip it.
///
/// Named entries are packed densely: the n-th named entry lands in slot
/// `vanilla_len + n`. Calling this twice with the same inputs yields the same
/// table and the same slots.
pub fn refresh<T, F>(
    vanilla: &VanillaNames,
    promoted: impl IntoIterator<Item = T>,
    mut name_fn: F,
) -> Refresh<T>
where
    F: FnMut(&T) -> Option<String>,
{
    let mut table = NameTable::vanilla_only(vanilla);
    let mut placed = Vec::new();
    let mut skipped = Vec::new();

    for entry in promoted {
        match name_fn(&entry) {
            Some(name) => {
                table.names.push(name);
                placed.push((entry, vanilla.promoted_slot(placed.len())));
            }
            None => skipped.push(entry),
        }
    }

    debug!(
        vanilla = table.vanilla_len,
        placed = placed.len(),
        skipped = skipped.len(),
        "name table rebuilt"
    );

    Refresh {
        table,
        placed,
        skipped,
    }
}

/// Owns the vanilla prefix for the current map and the installed table.
#[derive(Debug, Default)]
pub struct NameTableManager {
    vanilla: Option<VanillaNames>,
    table: NameTable,
    vanilla_pushed: bool,
}

impl NameTableManager {
    /// Creates a manager with no vanilla prefix yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the vanilla prefix for this map. Later calls are ignored.
    ///
    /// Returns `true` if the prefix was established by this call.
    pub fn establish(&mut self, names: Vec<String>) -> bool {
        if self.vanilla.is_some() {
            return false;
        }
        let vanilla = VanillaNames::new(names);
        self.table = NameTable::vanilla_only(&vanilla);
        self.vanilla = Some(vanilla);
        self.vanilla_pushed = false;
        true
    }

    /// Replaces the vanilla prefix verbatim with one received from the
    /// authority.
    pub fn replace_vanilla(&mut self, names: Vec<String>) {
        let vanilla = VanillaNames::new(names);
        self.table = NameTable::vanilla_only(&vanilla);
        self.vanilla = Some(vanilla);
    }

    /// The vanilla prefix, once known.
    #[must_use]
    pub fn vanilla(&self) -> Option<&VanillaNames> {
        self.vanilla.as_ref()
    }

    /// The installed table.
    #[must_use]
    pub fn table(&self) -> &NameTable {
        &self.table
    }

    /// Installs a rebuilt table. Returns `true` if it differs from the
    /// previous one.
    pub fn install(&mut self, table: NameTable) -> bool {
        if self.table == table {
            return false;
        }
        self.table = table;
        true
    }

    /// Returns the vanilla names if they have not been pushed yet, and marks
    /// them pushed.
    pub fn take_unpushed_vanilla(&mut self) -> Option<Vec<String>> {
        if self.vanilla_pushed {
            return None;
        }
        let names = self.vanilla.as_ref()?.names().to_vec();
        self.vanilla_pushed = true;
        Some(names)
    }
}

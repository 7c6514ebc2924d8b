/// Options of a filtered update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateOptions {
    insert_if_absent: bool,
    just_once: bool,
}

impl UpdateOptions {
    pub fn new(insert_if_absent: bool, just_once: bool) -> Self {
        Self {
            insert_if_absent,
            just_once,
        }
    }

    /// Insert the update document when nothing matches.
    pub fn is_insert_if_absent(&self) -> bool {
        self.insert_if_absent
    }

    /// Stop after the first matching document.
    pub fn is_just_once(&self) -> bool {
        self.just_once
    }
}

pub fn insert_if_absent() -> UpdateOptions {
    UpdateOptions::new(true, false)
}

pub fn just_once() -> UpdateOptions {
    UpdateOptions::new(false, true)
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unique stove identifier.

use std::fmt;

use uuid::Uuid;

/// Identifies one stove across events, logs and handles.
///
/// # Examples
///
/// ```
/// use aduro_lib::event::StoveId;
///
/// let id = StoveId::new();
/// assert_ne!(id, StoveId::new());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StoveId(Uuid);

impl StoveId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StoveId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for StoveId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(StoveId::new(), StoveId::new());
    }

    #[test]
    fn display_matches_uuid() {
        let uuid = Uuid::new_v4();
        let id = StoveId::from(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }
}

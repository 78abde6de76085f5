//! Routing rules for record identifiers.

use trowel_events::NavigationTarget;

use crate::record::is_uuid;

const SECTIONS: [(char, &str); 4] = [
    ('D', "Documentary"),
    ('L', "Literary"),
    ('A', "Archaeological"),
    ('V', "Visual"),
];

/// Where a record id leads.
///
/// UUIDs stay relative to the current list. Entry ids are routed to their
/// section by their first letter; anything else stays relative.
#[must_use]
pub fn go_to_record(id: &str) -> NavigationTarget {
    if !is_uuid(id) {
        if let Some((_, section)) = SECTIONS
            .iter()
            .find(|(prefix, _)| id.starts_with(*prefix))
        {
            return NavigationTarget::Section {
                section: (*section).to_string(),
                id: id.to_string(),
            };
        }
    }
    NavigationTarget::Record { id: id.to_string() }
}

use std::collections::BTreeMap;

/// Reviews sharing one normalized text
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DuplicateGroup {
    pub text: String,
    /// Positions of the members in the analysed record list
    pub members: Vec<usize>,
}

/// Group identical texts, keeping only groups of two or more
///
/// Texts that are empty after trimming never form a group. Groups are
/// ordered by text.
pub fn find_duplicate_groups<'a, I>(texts: I) -> Vec<DuplicateGroup>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut by_text: BTreeMap<&'a str, Vec<usize>> = BTreeMap::new();
    for (idx, text) in texts.into_iter().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        by_text.entry(text).or_default().push(idx);
    }

    by_text
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(text, members)| DuplicateGroup {
            text: text.to_string(),
            members,
        })
        .collect()
}

/// Per-position duplicate flags; every member of a group is flagged
pub fn duplicate_flags(groups: &[DuplicateGroup], len: usize) -> Vec<bool> {
    let mut flags = vec![false; len];
    for group in groups {
        for &idx in &group.members {
            if let Some(flag) = flags.get_mut(idx) {
                *flag = true;
            }
        }
    }
    flags
}

use crate::action::Action;
use crate::circle::SupportMember;
use crate::error::{Result, RhythmError};

/// Add `member_id` if absent, remove it if present. Returns `true` when the
/// member is watching afterwards.
pub fn toggle_watcher(watchers: &mut Vec<String>, member_id: &str) -> bool {
    if let Some(pos) = watchers.iter().position(|w| w == member_id) {
        watchers.remove(pos);
        false
    } else {
        watchers.push(member_id.to_string());
        true
    }
}

/// Every id must name an existing, active member.
pub fn validate_watchers(watchers: &[String], members: &[SupportMember]) -> Result<()> {
    for id in watchers {
        match members.iter().find(|m| &m.id == id) {
            None => return Err(RhythmError::MemberNotFound(id.clone())),
            Some(m) if !m.active => return Err(RhythmError::MemberInactive(id.clone())),
            Some(_) => {}
        }
    }
    Ok(())
}

/// Resolve an action's watcher ids, in watcher order. Ids with no member row
/// are skipped.
pub fn watching_members<'a>(action: &Action, members: &'a [SupportMember]) -> Vec<&'a SupportMember> {
    action
        .watchers
        .iter()
        .filter_map(|id| members.iter().find(|m| &m.id == id))
        .collect()
}

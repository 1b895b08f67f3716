use crate::error::{Result, RhythmError};
use crate::paths;
use crate::types::MemberRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Someone the user has let into their support circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: MemberRole,
    #[serde(default = "default_active")]
    pub active: bool,
    pub added_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl SupportMember {
    pub fn new(name: impl Into<String>, role: MemberRole) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            email: None,
            role,
            active: true,
            added_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Persist a new member. Fails if the id is malformed or already taken.
    pub fn create(root: &Path, member: SupportMember) -> Result<Self> {
        paths::validate_id(&member.id)?;
        if member.name.trim().is_empty() {
            return Err(RhythmError::InvalidField {
                field: "name".to_string(),
                reason: "member name cannot be empty".to_string(),
            });
        }
        if paths::member_path(root, &member.id).exists() {
            return Err(RhythmError::MemberExists(member.id));
        }
        member.save(root)?;
        tracing::debug!(member = %member.id, role = %member.role, "support member added");
        Ok(member)
    }

    pub fn load(root: &Path, id: &str) -> Result<Self> {
        if paths::validate_id(id).is_err() {
            return Err(RhythmError::MemberNotFound(id.to_string()));
        }
        crate::io::read_yaml(&paths::member_path(root, id))?
            .ok_or_else(|| RhythmError::MemberNotFound(id.to_string()))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::member_path(root, &self.id), self)
    }

    /// Every member, sorted by name.
    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let mut members = Vec::new();
        for id in crate::io::yaml_stems(&paths::members_dir(root))? {
            members.push(Self::load(root, &id)?);
        }
        members.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(members)
    }

    pub fn list_active(root: &Path) -> Result<Vec<Self>> {
        let mut members = Self::list(root)?;
        members.retain(|m| m.active);
        Ok(members)
    }

    /// Members are never removed, only switched off.
    pub fn deactivate(root: &Path, id: &str) -> Result<Self> {
        let mut member = Self::load(root, id)?;
        if member.active {
            member.active = false;
            member.save(root)?;
            tracing::info!(member = id, "support member deactivated");
        }
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_load_list() {
        let dir = TempDir::new().unwrap();
        SupportMember::create(
            dir.path(),
            SupportMember::new("Sam", MemberRole::Family).with_id("sam"),
        )
        .unwrap();
        SupportMember::create(
            dir.path(),
            SupportMember::new("Dr. Lee", MemberRole::Medical).with_email("lee@clinic.test"),
        )
        .unwrap();

        let sam = SupportMember::load(dir.path(), "sam").unwrap();
        assert!(sam.active);
        let names: Vec<String> = SupportMember::list(dir.path())
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Dr. Lee", "Sam"]);
    }

    #[test]
    fn duplicate_id_rejected() {
        let dir = TempDir::new().unwrap();
        let m = SupportMember::new("Sam", MemberRole::Friend).with_id("sam");
        SupportMember::create(dir.path(), m.clone()).unwrap();
        assert!(matches!(
            SupportMember::create(dir.path(), m),
            Err(RhythmError::MemberExists(_))
        ));
    }

    #[test]
    fn deactivate_hides_from_active_list() {
        let dir = TempDir::new().unwrap();
        SupportMember::create(
            dir.path(),
            SupportMember::new("Sam", MemberRole::Friend).with_id("sam"),
        )
        .unwrap();
        let m = SupportMember::deactivate(dir.path(), "sam").unwrap();
        assert!(!m.active);
        assert!(SupportMember::list_active(dir.path()).unwrap().is_empty());
        assert_eq!(SupportMember::list(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn missing_member_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            SupportMember::load(dir.path(), "nobody"),
            Err(RhythmError::MemberNotFound(_))
        ));
        assert!(matches!(
            SupportMember::load(dir.path(), "../etc"),
            Err(RhythmError::MemberNotFound(_))
        ));
    }
}

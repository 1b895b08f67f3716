use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use rhythm_core::{circle::SupportMember, types::MemberRole};
use std::path::Path;

#[derive(Subcommand)]
pub enum MemberSubcommand {
    /// Add someone to the support circle
    Add {
        name: String,
        /// family, friend, medical, caregiver, other
        #[arg(long, default_value = "other")]
        role: String,
        #[arg(long)]
        email: Option<String>,
        /// Use a readable slug instead of a generated id
        #[arg(long)]
        id: Option<String>,
    },
    /// List support-circle members
    List {
        /// Include deactivated members
        #[arg(long)]
        all: bool,
    },
    /// Deactivate a member. Existing watches and notes are kept.
    Deactivate { id: String },
}

pub fn run(root: &Path, subcmd: MemberSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        MemberSubcommand::Add {
            name,
            role,
            email,
            id,
        } => add(root, &name, &role, email, id, json),
        MemberSubcommand::List { all } => list(root, all, json),
        MemberSubcommand::Deactivate { id } => deactivate(root, &id, json),
    }
}

fn add(
    root: &Path,
    name: &str,
    role: &str,
    email: Option<String>,
    id: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let role: MemberRole = role.parse()?;
    let mut member = SupportMember::new(name, role);
    if let Some(id) = id {
        member = member.with_id(id);
    }
    if let Some(email) = email {
        member = member.with_email(email);
    }
    let member = SupportMember::create(root, member).context("failed to add member")?;

    if json {
        print_json(&member)?;
    } else {
        println!("Added {} ({}) [{}]", member.name, member.role, member.id);
    }
    Ok(())
}

fn list(root: &Path, all: bool, json: bool) -> anyhow::Result<()> {
    let members = if all {
        SupportMember::list(root)?
    } else {
        SupportMember::list_active(root)?
    };

    if json {
        return print_json(&members);
    }
    if members.is_empty() {
        println!("No members. Add one with: rhythm member add <name>");
        return Ok(());
    }

    let rows = members
        .iter()
        .map(|m| {
            vec![
                m.id.clone(),
                m.name.clone(),
                m.role.to_string(),
                m.email.clone().unwrap_or_else(|| "-".to_string()),
                if m.active { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "ROLE", "EMAIL", "ACTIVE"], rows);
    Ok(())
}

fn deactivate(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let member = SupportMember::deactivate(root, id)?;
    if json {
        print_json(&member)?;
    } else {
        println!("Deactivated {} [{}]", member.name, member.id);
    }
    Ok(())
}
